//! Execution-control core for a source-level debugger.
//!
//! This crate implements the part of a debugger that decides, after every
//! target stop: whether to report the stop to the user, what higher-level
//! reason caused it, and how to resume. It does not parse DWARF, look up
//! symbols, compile expressions, or talk to an OS process — those are
//! external collaborators consumed only through the traits in [`external`].
//!
//! The four core pieces map onto crate modules:
//! - the **Thread Plan Stack** — [`plan`] (the variant set) and
//!   [`plan_stack`] (the stack holding them),
//! - **Stop-Reason Arbitration** — [`thread::Thread::handle_stop`],
//! - the **Stack Unwinder contract** — [`unwind`],
//! - the **Thread Specification matcher** — [`thread_spec`].
//!
//! [`thread::Thread`] is the per-thread arbitrator that ties these
//! together across one stop/resume cycle; [`coordinator`] aggregates
//! per-thread decisions into a process-level vote.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod external;
pub mod frame;
pub mod log;
pub mod plan;
pub mod plan_stack;
pub mod registers;
pub mod stop_info;
pub mod thread;
pub mod thread_id;
pub mod thread_spec;
pub mod unwind;

pub use coordinator::{ProcessStopCoordinator, ProcessStopEvent, ThreadStopDecision};
pub use error::{ExecError, ExecResult, ResourceError};
pub use plan::Vote;
pub use thread::{Thread, ThreadExecState};
pub use thread_id::{StopId, ThreadId};
