use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{LazyLock, Mutex},
};

///
/// EventState
/// Process-wide, in-memory counters for extraction and caching.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub types: BTreeMap<String, TypeCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Extraction
    pub extract_calls: u64,
    pub extract_ok: u64,
    pub extract_failed: u64,
    pub properties_extracted: u64,
    pub conflicts_reported: u64,
    pub invalid_reported: u64,
    pub unsupported_reported: u64,

    // Cache
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_stale_evictions: u64,

    // Generations
    pub generations_retired: u64,
    pub accessors_freed: u64,
}

///
/// TypeCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TypeCounters {
    pub extract_calls: u64,
    pub extract_failed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

///
/// EventReport
/// Point-in-time snapshot returned to callers.
///

pub type EventReport = EventState;

static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    let mut state = EVENT_STATE
        .lock()
        .expect("metrics Mutex poisoned while acquiring lock");

    f(&mut state)
}

/// Clone the current state.
pub(crate) fn report() -> EventReport {
    with_state_mut(|m| m.clone())
}

/// Reset all counters (useful in tests).
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Entry for one type, created on first use.
pub(crate) fn type_entry<'a>(m: &'a mut EventState, ty: &str) -> &'a mut TypeCounters {
    m.types.entry(ty.to_string()).or_default()
}
