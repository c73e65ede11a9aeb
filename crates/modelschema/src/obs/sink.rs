//! Metrics sink boundary.
//!
//! This module is the only bridge between extraction/caching logic and the
//! global metrics state. A scoped, thread-local override lets tests observe
//! events without touching the global counters.
use crate::{generation::GenerationId, obs::metrics, types::TypeRef};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// FailureKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    Conflict,
    InvalidDescriptor,
    Unsupported,
}

///
/// MetricsEvent
///

#[derive(Clone, Debug)]
pub enum MetricsEvent {
    ExtractStart {
        ty: TypeRef,
    },
    ExtractFinish {
        ty: TypeRef,
        properties: u64,
    },
    ExtractFailed {
        ty: TypeRef,
        kind: FailureKind,
        problems: u64,
    },
    CacheHit {
        ty: TypeRef,
    },
    CacheMiss {
        ty: TypeRef,
    },
    CacheStale {
        ty: TypeRef,
        generation: GenerationId,
    },
    GenerationRetired {
        generation: GenerationId,
        freed: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default process-wide sink that writes into global metrics state.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ExtractStart { ty } => {
                metrics::with_state_mut(|m| {
                    m.ops.extract_calls = m.ops.extract_calls.saturating_add(1);
                    let entry = metrics::type_entry(m, ty.path());
                    entry.extract_calls = entry.extract_calls.saturating_add(1);
                });
            }

            MetricsEvent::ExtractFinish { properties, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.extract_ok = m.ops.extract_ok.saturating_add(1);
                    m.ops.properties_extracted =
                        m.ops.properties_extracted.saturating_add(properties);
                });
            }

            MetricsEvent::ExtractFailed { ty, kind, problems } => {
                metrics::with_state_mut(|m| {
                    m.ops.extract_failed = m.ops.extract_failed.saturating_add(1);
                    match kind {
                        FailureKind::Conflict => {
                            m.ops.conflicts_reported =
                                m.ops.conflicts_reported.saturating_add(problems);
                        }
                        FailureKind::InvalidDescriptor => {
                            m.ops.invalid_reported =
                                m.ops.invalid_reported.saturating_add(problems);
                        }
                        FailureKind::Unsupported => {
                            m.ops.unsupported_reported =
                                m.ops.unsupported_reported.saturating_add(problems);
                        }
                    }

                    let entry = metrics::type_entry(m, ty.path());
                    entry.extract_failed = entry.extract_failed.saturating_add(1);
                });
            }

            MetricsEvent::CacheHit { ty } => {
                metrics::with_state_mut(|m| {
                    m.ops.cache_hits = m.ops.cache_hits.saturating_add(1);
                    let entry = metrics::type_entry(m, ty.path());
                    entry.cache_hits = entry.cache_hits.saturating_add(1);
                });
            }

            MetricsEvent::CacheMiss { ty } => {
                metrics::with_state_mut(|m| {
                    m.ops.cache_misses = m.ops.cache_misses.saturating_add(1);
                    let entry = metrics::type_entry(m, ty.path());
                    entry.cache_misses = entry.cache_misses.saturating_add(1);
                });
            }

            MetricsEvent::CacheStale { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.cache_stale_evictions = m.ops.cache_stale_evictions.saturating_add(1);
                });
            }

            MetricsEvent::GenerationRetired { freed, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.generations_retired = m.ops.generations_retired.saturating_add(1);
                    m.ops.accessors_freed = m.ops.accessors_freed.saturating_add(freed);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary, thread-local metrics sink override.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
