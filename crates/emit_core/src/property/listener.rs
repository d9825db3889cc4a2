//! Change listener contract for property groups.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Observer notified when a property group publishes its changes.
///
/// Listeners are referenced weakly by every group they are registered with,
/// so dropping the last `Rc` of a listener is enough to stop notifications.
pub trait PropertyGroupChangeListener {
    /// Called synchronously from `PropertyGroup::apply`.
    ///
    /// `changed_ids` holds every property id set since the previous publish
    /// of `group_id`. It may be empty.
    fn apply_properties(
        &self,
        group_id: &str,
        changed_ids: &BTreeSet<String>,
    ) -> Result<(), ListenerError>;
}

/// Registration handle returned by `PropertyGroup::add_change_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for ListenerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Failure reported by a listener while reacting to a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ListenerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener failed: {}", self.message)
    }
}

impl Error for ListenerError {}
