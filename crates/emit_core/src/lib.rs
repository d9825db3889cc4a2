//! Core property store for Emit plugins.
//! Plugins expose typed configuration through property groups and observe
//! published changes through change listeners.

pub mod logging;
pub mod property;

pub use logging::{default_log_level, init_logging, logging_status, LogConfig};
pub use property::group::{
    PropertyDescriptor, PropertyGroup, PropertyGroupError, PropertyGroupResult,
    DEFAULT_GROUP_DISPLAY_NAME,
};
pub use property::listener::{ListenerError, ListenerId, PropertyGroupChangeListener};
pub use property::value::{Property, PropertyBase};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
