//! Intensity zone registry and expression resolution.

pub mod pace;
pub mod registry;

pub use pace::{format_pace, parse_pace};
pub use registry::{Zone, ZoneError, ZoneKind, ZoneRegistry, ZoneValue};
