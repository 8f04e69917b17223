//! Logger setup shared by the radish binaries.
//!
//! Library crates log through the `log` facade; [`init`] installs a
//! `tracing-subscriber` registry that also collects those records.

mod error;
pub mod logger;

pub use error::TelemetryError;
pub use logger::init;
pub use logger::reload_log_level;
