//! Typed property store with change notification.
//!
//! # Responsibility
//! - Expose named, typed configuration values grouped by domain.
//! - Batch change notifications to observers on an explicit publish.
//!
//! # Invariants
//! - Typed reads and writes never bypass the stored type check.
//! - Groups never own their listeners.
//!
//! # Threading
//! - Single-threaded: value cells are `Rc<RefCell<_>>` and listeners are
//!   `Weak` references, so none of these types are `Send`.

pub mod group;
pub mod listener;
pub mod value;
