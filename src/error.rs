//! Error kinds surfaced across the execution-control core's entry points.
//!
//! Each *kind* of failure gets its own variant with whatever context a
//! caller needs to report it to the user, following the same enum-of-reasons
//! style used elsewhere in this crate for things like `WaitStatus` rather
//! than reaching for string-typed errors.

use crate::thread_id::ThreadId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Operation not legal in the current state (e.g. resume while detached).
    #[error("invalid state for thread {thread}: {reason}")]
    InvalidState { thread: ThreadId, reason: String },

    /// A register, frame, or memory access failed.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(#[from] ResourceError),

    /// A plan failed its `validate()` check at queue time and was not pushed.
    #[error("plan validation failed for thread {thread}: {reason}")]
    PlanValidationFailed { thread: ThreadId, reason: String },

    /// `run_thread_plan`'s timeout elapsed before the plan completed.
    #[error("timed out waiting for thread {thread} to complete its plan")]
    Timeout { thread: ThreadId },

    /// The target process died mid-operation.
    #[error("target lost while operating on thread {thread}")]
    TargetLost { thread: ThreadId },

    /// The user interrupted an in-progress operation (e.g. a blocking call).
    #[error("user aborted operation on thread {thread}")]
    UserAborted { thread: ThreadId },
}

/// The more specific *what failed* behind [`ExecError::ResourceUnavailable`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    #[error("register access failed")]
    RegisterAccessFailed,
    #[error("frame {0} is past the end of the call stack")]
    FrameUnavailable(u32),
    #[error("register context unavailable for this frame")]
    RegisterContextUnavailable,
    #[error("memory fault")]
    MemoryFault,
}

pub type ExecResult<T> = Result<T, ExecError>;
