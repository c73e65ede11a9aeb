//! Route-keyed error aggregation shared by the modelschema crates.
//!
//! Validation passes collect every problem they find into an [`ErrorTree`]
//! and only fail once, at the end, via [`ErrorTree::result`].

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

///
/// err
/// Push a formatted message onto an `ErrorTree`.
///

#[macro_export]
macro_rules! err {
    ($errs:expr, $($arg:tt)*) => {{
        $errs.add(format!($($arg)*));
    }};
}

///
/// ErrorTree
///
/// Messages recorded at this level plus child trees keyed by route segment
/// (a property name, a type path). Children are ordered so rendering is
/// deterministic.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorTree {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, ErrorTree>,
}

impl ErrorTree {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    /// Build a tree holding a single top-level message.
    #[must_use]
    pub fn from_message(message: impl ToString) -> Self {
        let mut tree = Self::new();
        tree.add(message);

        tree
    }

    pub fn add(&mut self, message: impl ToString) {
        self.messages.push(message.to_string());
    }

    /// Record a message under a child route.
    pub fn add_for(&mut self, route: impl ToString, message: impl ToString) {
        self.children
            .entry(route.to_string())
            .or_default()
            .add(message);
    }

    /// Fold a failed result into this tree; `Ok` is a no-op.
    pub fn add_result(&mut self, result: Result<(), Self>) {
        if let Err(tree) = result {
            self.merge(tree);
        }
    }

    pub fn merge(&mut self, other: Self) {
        self.messages.extend(other.messages);
        for (route, child) in other.children {
            self.children.entry(route).or_default().merge(child);
        }
    }

    /// Merge `other` beneath a child route.
    pub fn merge_for(&mut self, route: impl ToString, other: Self) {
        if other.is_empty() {
            return;
        }

        self.children
            .entry(route.to_string())
            .or_default()
            .merge(other);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.children.values().all(Self::is_empty)
    }

    /// Total number of messages in this tree, children included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len() + self.children.values().map(Self::len).sum::<usize>()
    }

    /// Flatten to `(route, message)` pairs; routes are joined with `.`.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);

        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        for message in &self.messages {
            out.push((prefix.to_string(), message.clone()));
        }

        for (route, child) in &self.children {
            let path = if prefix.is_empty() {
                route.clone()
            } else {
                format!("{prefix}.{route}")
            };
            child.flatten_into(&path, out);
        }
    }

    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (route, message) in self.flatten() {
            if !first {
                writeln!(f)?;
            }
            first = false;

            if route.is_empty() {
                write!(f, "{message}")?;
            } else {
                write!(f, "{route}: {message}")?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for ErrorTree {}

impl From<String> for ErrorTree {
    fn from(message: String) -> Self {
        Self::from_message(message)
    }
}

impl From<&str> for ErrorTree {
    fn from(message: &str) -> Self {
        Self::from_message(message)
    }
}

///
/// TESTS
///
