// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "typeahead=info";

/// Initialize structured logging with `RUST_LOG` support.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logging() {
    init_logging_with(DEFAULT_FILTER);
}

/// Like [`init_logging`] with a different fallback directive.
pub fn init_logging_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
