//! Conditional logging macros gated by a module-level `ENABLE_LOGS` const.
//!
//! High-frequency modules (sync delivery, hover recomputation) declare
//! `const ENABLE_LOGS: bool = ...;` and use these instead of the raw `log`
//! macros, so per-module chatter can be switched off without touching call
//! sites.

/// Info-level logging, active when the calling module sets `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level logging, active when the calling module sets `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error-level logging, active when the calling module sets `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
