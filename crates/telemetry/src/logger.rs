use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::reload;
use tracing_subscriber::util::SubscriberInitExt;

use crate::TelemetryError;

const VALID_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Timestamps as "[YYYY-MM-DD HH:MM:SS.micros]" in local time
struct LocalMicros;

impl FormatTime for LocalMicros {
	fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
		let now = chrono::Local::now();
		write!(w, "{}", now.format("[%Y-%m-%d %H:%M:%S%.6f]"))
	}
}

type ReloadHandle = reload::Handle<EnvFilter, Registry>;

static RELOAD_HANDLE: OnceLock<ReloadHandle> = OnceLock::new();

/// Lowercased `level` if it names a known level.
fn normalize_level(level: &str) -> Result<String, TelemetryError> {
	let lower = level.to_lowercase();
	if VALID_LEVELS.contains(&lower.as_str()) {
		Ok(lower)
	} else {
		Err(TelemetryError::InvalidLogLevel(level.to_string()))
	}
}

/// Install the global logger at `level`.
///
/// Output goes to stderr so that command replies on stdout stay clean.
/// Records from the `log` facade are collected as well.
///
/// # Example
///
/// ```no_run
/// telemetry::init("debug")?;
/// tracing::info!("connected");
/// # Ok::<(), telemetry::TelemetryError>(())
/// ```
pub fn init(level: &str) -> Result<(), TelemetryError> {
	let level = normalize_level(level)?;
	let (filter_layer, reload_handle) = reload::Layer::new(EnvFilter::new(&level));

	tracing_subscriber::registry()
		.with(filter_layer)
		.with(
			fmt::layer()
				.with_writer(std::io::stderr)
				.with_timer(LocalMicros)
				.with_target(false)
				.with_thread_ids(true)
				.with_line_number(false)
				.with_file(false),
		)
		.try_init()
		.map_err(|_| TelemetryError::AlreadyInitialized)?;

	let _ = RELOAD_HANDLE.set(reload_handle);
	tracing::debug!(level = %level, "logger initialized");
	Ok(())
}

/// Swap the active level filter.
///
/// # Errors
///
/// Fails on an unknown level, before [`init`], or when the subscriber has
/// gone away.
pub fn reload_log_level(level: &str) -> Result<(), TelemetryError> {
	let level = normalize_level(level)?;
	let handle = RELOAD_HANDLE.get().ok_or(TelemetryError::NotInitialized)?;
	handle
		.reload(EnvFilter::new(&level))
		.map_err(|e| TelemetryError::ReloadFailed(e.to_string()))
}
