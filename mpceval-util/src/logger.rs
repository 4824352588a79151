//! Logger

// Imports
use {
	std::{fs, io, path::Path, sync::Mutex},
	tracing::metadata::LevelFilter,
	tracing_subscriber::{fmt, prelude::*, EnvFilter},
};

/// Initializes the global logger.
///
/// Always logs to stderr, filtered by `RUST_LOG` (`info` by default).
/// If `log_file` is given, also logs to it, filtered by `RUST_LOG_FILE` (`debug` by default).
///
/// Any messages buffered with [`pre_init`] are emitted once the logger is ready.
pub fn init(log_file: Option<&Path>, log_file_append: bool) {
	let term_layer = fmt::layer()
		.with_writer(io::stderr)
		.with_filter(env_filter("RUST_LOG", LevelFilter::INFO));

	// Note: We can't log yet, so keep the error around until we can.
	let mut log_file_err = None;
	let file_layer = log_file.and_then(|log_file| {
		let file = fs::OpenOptions::new()
			.create(true)
			.write(true)
			.append(log_file_append)
			.truncate(!log_file_append)
			.open(log_file);

		match file {
			Ok(file) => Some(
				fmt::layer()
					.with_ansi(false)
					.with_writer(Mutex::new(file))
					.with_filter(env_filter("RUST_LOG_FILE", LevelFilter::DEBUG)),
			),
			Err(err) => {
				log_file_err = Some(err);
				None
			},
		}
	});

	if let Err(err) = tracing_subscriber::registry()
		.with(term_layer)
		.with(file_layer)
		.try_init()
	{
		eprintln!("Unable to initialize logger: {err}");
		return;
	}

	if let Some(err) = log_file_err {
		tracing::warn!(?log_file, ?err, "Unable to open log file");
	}

	pre_init::flush();
}

/// Creates an env filter from `var`, defaulting to `default`
fn env_filter(var: &str, default: LevelFilter) -> EnvFilter {
	EnvFilter::builder()
		.with_default_directive(default.into())
		.with_env_var(var)
		.from_env_lossy()
}

/// Logging before the logger is initialized
pub mod pre_init {
	// Imports
	use std::sync::{Mutex, PoisonError};

	/// Buffered messages
	static MESSAGES: Mutex<Vec<String>> = Mutex::new(Vec::new());

	/// Buffers a debug message until the logger is initialized
	pub fn debug(msg: impl Into<String>) {
		MESSAGES
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(msg.into());
	}

	/// Emits all buffered messages
	pub(super) fn flush() {
		let messages = std::mem::take(&mut *MESSAGES.lock().unwrap_or_else(PoisonError::into_inner));
		for msg in messages {
			tracing::debug!(target: "mpceval_util::logger::pre_init", "{msg}");
		}
	}
}
