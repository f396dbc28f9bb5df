//! Tracing for the executables and tests built on rcvec.
//!
//! Filtering is controlled with the RCVEC_LOG environment variable, which takes an
//! `EnvFilter` directive such as `RCVEC_LOG=rcvec=trace` (see [directive-syntax]).
//! Events go to stderr unless RCVEC_LOGTO=<filepath> is set, in which case that file is
//! truncated and written to instead.
//!
//! Library crates emit events through the macros re-exported here and never depend on
//! `tracing` directly. The workspace compiles events out of release builds, so counted
//! handles and vectors pay nothing for them there.
//!
//! [directive-syntax]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives

use std::path::PathBuf;

use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

pub use tracing::debug;
pub use tracing::info;
pub use tracing::trace;

const ENV_FILTER: &str = "RCVEC_LOG";
const LOGTO_VAR: &str = "RCVEC_LOGTO";

/// Installs the global subscriber for an rcvec executable. Bind the result to a variable
/// that lives until the program is done logging.
///
/// Only call this at an executable's entry point. Release builds get [TracingGuards::NONE].
#[macro_export]
macro_rules! setup_tracing {
    () => {
        if cfg!(debug_assertions) {
            $crate::setup_tracing($crate::LogTarget::from_env())
        } else {
            $crate::TracingGuards::NONE
        }
    };
}

/// Where log lines end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    pub fn from_env() -> Self {
        match std::env::var_os(LOGTO_VAR) {
            Some(path) if !path.is_empty() => LogTarget::File(PathBuf::from(path)),
            _ => LogTarget::Stderr,
        }
    }
}

/// Keeps the non-blocking file writer flushing. Dropping it early loses buffered lines.
pub struct TracingGuards {
    _file_appender_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl TracingGuards {
    pub const NONE: TracingGuards = TracingGuards {
        _file_appender_guard: None,
    };
}

fn env_filter() -> EnvFilter {
    EnvFilter::from_env(ENV_FILTER)
}

#[must_use]
pub fn setup_tracing(target: LogTarget) -> TracingGuards {
    match target {
        LogTarget::File(path) => {
            let _ = std::fs::remove_file(&path);

            let directory = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let file_name = path.file_name().map(PathBuf::from).unwrap_or(path.clone());

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
            let file_layer = fmt::Layer::default()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter());

            Registry::default().with(file_layer).init();

            TracingGuards {
                _file_appender_guard: Some(guard),
            }
        }
        LogTarget::Stderr => {
            let stderr_layer = fmt::Layer::default()
                .with_writer(std::io::stderr)
                .with_filter(env_filter());

            Registry::default().with(stderr_layer).init();

            TracingGuards::NONE
        }
    }
}

/// Routes events through the test harness's captured output. Safe to call from every test;
/// only the first call in a process installs anything.
pub fn setup_test_tracing() {
    let test_layer = fmt::Layer::default()
        .with_test_writer()
        .with_filter(env_filter());

    let _ = Registry::default().with(test_layer).try_init();
}
