//! Ambient logging.
//!
//! The core logs through the standard `log` facade rather than printing
//! directly, so an embedding debugger can route these messages into its own
//! sink (a REPL transcript, a log file, a GUI console pane) by installing
//! whatever `log::Log` implementation it likes. Tests and examples wire up
//! `env_logger`.
//!
//! `ed_assert!` is the one addition beyond the facade: an assertion that
//! names the offending thread before panicking, for invariants that indicate
//! a bug in the execution-control core itself (as opposed to a condition the
//! target legitimately produced, which is reported through [`crate::error::ExecError`]
//! instead).

pub use log::{debug, error, info, trace, warn};

/// Assert `$cond`, logging the owning thread's id first.
///
/// Use this instead of a bare `assert!` for invariants the arbitration
/// algorithm depends on (e.g. "the active stack is never empty"): a failure
/// here means the core has a bug, and the thread id in the log line is what
/// you want first when triaging a report.
#[macro_export]
macro_rules! ed_assert {
    ($thread:expr, $cond:expr) => {
        if !$cond {
            $crate::log::error!("[thread {}] assertion failed: {}", $thread.id(), stringify!($cond));
            panic!("assertion failed: {}", stringify!($cond));
        }
    };
    ($thread:expr, $cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::log::error!("[thread {}] {}", $thread.id(), format_args!($($arg)+));
            panic!($($arg)+);
        }
    };
}
