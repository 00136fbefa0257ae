//! Immutable description of why a thread stopped.
//!
//! A `StopInfo` is produced fresh from the native layer on every stop and is
//! never mutated in place: instead, callers keep `(StopInfo, StopId)` pairs
//! and compare the recorded id against the process's current one at read
//! time. A stale pair is ignored and the native layer is re-queried rather
//! than trusting an out-of-date value.

use crate::plan::PlanHandle;
use crate::thread_id::{StopId, ThreadId};
use std::rc::Weak;

/// A breakpoint site identifier, shared with the external breakpoint
/// registry.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct SiteId(pub u64);

/// A watchpoint identifier, shared with the external breakpoint registry.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct WatchId(pub u64);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum WatchKind {
    Read,
    Write,
    ReadWrite,
}

/// The tagged variant payloads a thread's stop can carry.
#[derive(Clone, Debug)]
pub enum StopReason {
    /// No reason yet determined / thread never stopped.
    None,
    /// A single-step completed.
    Trace,
    Breakpoint {
        site: SiteId,
        /// Which of the site's (possibly several) locations was hit, if the
        /// registry distinguishes them.
        location: Option<u64>,
        /// Overrides the plan-driven should-stop decision when `Some`.
        should_stop_override: Option<bool>,
    },
    Watchpoint {
        watch: WatchId,
        access: WatchKind,
    },
    Signal {
        signal_number: i32,
        /// True when this is the trap signal the native layer uses to
        /// deliver single-step completions, as opposed to a genuine
        /// target-raised signal sharing the same number.
        is_single_step_trap: bool,
    },
    Exception {
        kind_code: u64,
        description: String,
    },
    PlanComplete {
        plan: PlanHandle,
        return_value: Option<i64>,
    },
    /// Sentinel: forces recomputation from the native layer, also used for a
    /// plan that could not complete due to a resource failure.
    Invalid,
}

/// Immutable stop description: tag, payload, validity, and a weak
/// back-reference to the owning thread (weak because a `StopInfo` must
/// never keep a thread alive).
#[derive(Clone, Debug)]
pub struct StopInfo {
    reason: StopReason,
    snapshot_stop_id: StopId,
    owning_thread: Weak<ThreadIdCell>,
}

/// A trivial weak-referenceable cell holding just the id, so `StopInfo` can
/// weak-reference "which thread" without depending on the `Thread` type
/// itself (which owns the `StopInfo` in the first place, and would
/// otherwise create a dependency cycle between the two modules).
pub struct ThreadIdCell(pub ThreadId);

impl StopInfo {
    pub fn new(reason: StopReason, stop_id: StopId, owning_thread: Weak<ThreadIdCell>) -> StopInfo {
        StopInfo {
            reason,
            snapshot_stop_id: stop_id,
            owning_thread,
        }
    }

    pub fn none(stop_id: StopId) -> StopInfo {
        StopInfo {
            reason: StopReason::None,
            snapshot_stop_id: stop_id,
            owning_thread: Weak::new(),
        }
    }

    pub fn invalid() -> StopInfo {
        StopInfo {
            reason: StopReason::Invalid,
            snapshot_stop_id: StopId::zero(),
            owning_thread: Weak::new(),
        }
    }

    pub fn reason(&self) -> &StopReason {
        &self.reason
    }

    pub fn snapshot_stop_id(&self) -> StopId {
        self.snapshot_stop_id
    }

    /// A StopInfo is valid only while its snapshot stop-id equals the
    /// process's current one.
    pub fn is_valid(&self, current_stop_id: StopId) -> bool {
        !matches!(self.reason, StopReason::Invalid) && self.snapshot_stop_id == current_stop_id
    }

    /// Re-validate a checkpointed StopInfo against a new stop epoch. Used by
    /// checkpoint/restore: the payload is unchanged, only the snapshot id is
    /// refreshed so the StopInfo reads as valid again.
    pub fn revalidated(&self, stop_id: StopId) -> StopInfo {
        StopInfo {
            reason: self.reason.clone(),
            snapshot_stop_id: stop_id,
            owning_thread: self.owning_thread.clone(),
        }
    }

    pub fn is_breakpoint(&self) -> bool {
        matches!(self.reason, StopReason::Breakpoint { .. })
    }

    pub fn is_exception_like(&self) -> bool {
        matches!(
            self.reason,
            StopReason::Breakpoint { .. } | StopReason::Exception { .. }
        )
    }

    /// Base plan's default should-stop: stop unless the reason explicitly
    /// says otherwise (a breakpoint site's own override, or a plain trace
    /// stop which a plan should handle rather than surface to the user).
    pub fn should_stop(&self) -> bool {
        match &self.reason {
            StopReason::None | StopReason::Trace | StopReason::Invalid => false,
            StopReason::Breakpoint {
                should_stop_override,
                ..
            } => should_stop_override.unwrap_or(true),
            StopReason::Watchpoint { .. }
            | StopReason::Signal { .. }
            | StopReason::Exception { .. }
            | StopReason::PlanComplete { .. } => true,
        }
    }

    /// Resolve Open Question (b): a signal and a watchpoint observed as
    /// racing on the same stop. Signal wins unless it is the native
    /// single-step trap, in which case the watchpoint (a real target event)
    /// takes precedence.
    pub fn arbitrate_race(signal: StopInfo, watchpoint: StopInfo) -> StopInfo {
        if let StopReason::Signal {
            is_single_step_trap,
            ..
        } = &signal.reason
        {
            if *is_single_step_trap {
                return watchpoint;
            }
        }
        signal
    }
}
