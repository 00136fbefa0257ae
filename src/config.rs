//! Ambient per-target configuration.
//!
//! A standalone debugger binary can get away with a process-global `Flags`
//! behind `lazy_static!`. This crate is embedded in a larger debugger and
//! may drive several targets at once, so the equivalent settings are an
//! ordinary value owned by whoever constructs a [`crate::thread::Thread`],
//! not a global singleton.

#[derive(Clone, Debug)]
pub struct ExecConfig {
    /// Default timeout for `run_thread_plan`'s blocking message pump, in
    /// microseconds. `None` means wait indefinitely.
    pub default_timeout_micros: Option<u64>,

    /// Whether `StepInRange` avoids frames with no debug info by default
    /// (`avoid-no-debug`).
    pub avoid_no_debug_by_default: bool,

    /// Whether a `CallFunction` plan discards on error (restoring the
    /// register checkpoint) unless the caller overrides it per call.
    pub discard_on_error_by_default: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        ExecConfig {
            default_timeout_micros: None,
            avoid_no_debug_by_default: true,
            discard_on_error_by_default: true,
        }
    }
}
