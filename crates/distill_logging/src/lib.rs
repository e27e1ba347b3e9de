#![deny(missing_docs)]
//! Shared logging utilities for the distill workspace.
//!
//! Library crates log through the `distill_*` macros so every record carries
//! the [`TARGET`] target. The binary decides where those records end up; tests
//! call [`initialize_for_tests`].

#[doc(hidden)]
pub use log;

/// Log target used by every `distill_*` macro.
pub const TARGET: &str = "distill";

/// Logs a trace-level message under the `distill` target.
#[macro_export]
macro_rules! distill_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a debug-level message under the `distill` target.
#[macro_export]
macro_rules! distill_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an info-level message under the `distill` target.
#[macro_export]
macro_rules! distill_info {
    ($($arg:tt)*) => {{
        $crate::log::info!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a warn-level message under the `distill` target.
#[macro_export]
macro_rules! distill_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an error-level message under the `distill` target.
#[macro_export]
macro_rules! distill_error {
    ($($arg:tt)*) => {{
        $crate::log::error!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Maps a `-v` repetition count to a level filter.
///
/// `0` is warnings only, `1` info, `2` debug, anything above is trace.
pub fn level_for_verbosity(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Initializes a stderr logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may have installed the logger already.
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Never);
}

#[cfg(test)]
mod tests {
    use super::level_for_verbosity;
    use log::LevelFilter;

    #[test]
    fn verbosity_maps_to_increasing_levels() {
        assert_eq!(level_for_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_for_verbosity(1), LevelFilter::Info);
        assert_eq!(level_for_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_for_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn repeated_initialization_is_harmless() {
        super::initialize_for_tests();
        super::initialize_for_tests();
        distill_info!("logger initialized twice without panicking");
    }
}
