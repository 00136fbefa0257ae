//! Install an artificial frame and execute a JIT'd or known function.
//!
//! Grounded on LLDB's `ThreadPlanCallFunction`: `will_resume` checkpoints
//! the registers, marshals the sentinel return address onto the stack (the
//! concrete marshalling is the expression compiler's job — out of scope for
//! this crate, so this plan only needs the *address* the native layer
//! reports back once it's pushed), and sets PC to the callee's entry point.
//! `should_stop` watches for a stop at that sentinel: if it arrives, the
//! call is done; anything else mid-call (a signal, a breakpoint inside the
//! callee) is either surfaced to the user or restores the checkpoint and
//! aborts, depending on `discard_on_error`.

use super::{PlanCommon, PlanContext, PlanHandle, PlanKind, ResumeState, RunState, StopEvent, ThreadPlanOps};
use crate::error::ExecResult;
use crate::external::Addr;
use crate::registers::{RegisterCheckpoint, StackId};
use crate::stop_info::StopReason;
use crate::thread_id::ThreadId;
use std::any::Any;
use std::fmt;

/// Per-call options.
#[derive(Clone, Debug)]
pub struct CallFunctionOptions {
    /// Restore the register checkpoint and abandon the call if it's
    /// interrupted before reaching the sentinel return address.
    pub discard_on_error: bool,
    /// Single-thread timeout for the call, in microseconds. `None`
    /// means no timeout is enforced by this plan itself (the caller's
    /// `run_thread_plan` message pump owns the wall-clock budget).
    pub timeout_micros: Option<u64>,
}

impl Default for CallFunctionOptions {
    fn default() -> CallFunctionOptions {
        CallFunctionOptions {
            discard_on_error: true,
            timeout_micros: None,
        }
    }
}

/// Outcome of a completed (or aborted) call, read off the plan after it
/// reports `mischief_managed`.
#[derive(Clone, Debug)]
pub enum CallOutcome {
    Returned { value: Option<i64> },
    /// Interrupted before completion; `description` is the StopInfo's
    /// textual cause.
    Interrupted { description: String },
}

pub struct CallFunctionPlan {
    common: PlanCommon,
    entry: Addr,
    sentinel_return_addr: Addr,
    options: CallFunctionOptions,
    checkpoint: Option<RegisterCheckpoint>,
    installed: bool,
    outcome: Option<CallOutcome>,
}

impl CallFunctionPlan {
    pub fn new(
        thread: ThreadId,
        entry: Addr,
        sentinel_return_addr: Addr,
        options: CallFunctionOptions,
    ) -> CallFunctionPlan {
        Self::with_kind(PlanKind::CallFunction, thread, entry, sentinel_return_addr, options)
    }

    /// Same call machinery, tagged `CallUserExpression` instead of
    /// `CallFunction`: the expression compiler (out of this crate's scope)
    /// has already resolved `entry` to a JIT'd function's address by the
    /// time this plan is queued, so nothing about the
    /// artificial-frame/sentinel/checkpoint dance below differs — only the
    /// reported kind does, which is what a caller uses to tell "the user
    /// typed an expression" apart from "I called a known function" in the
    /// event stream.
    pub fn new_user_expression(
        thread: ThreadId,
        entry: Addr,
        sentinel_return_addr: Addr,
        options: CallFunctionOptions,
    ) -> CallFunctionPlan {
        Self::with_kind(PlanKind::CallUserExpression, thread, entry, sentinel_return_addr, options)
    }

    fn with_kind(
        kind: PlanKind,
        thread: ThreadId,
        entry: Addr,
        sentinel_return_addr: Addr,
        options: CallFunctionOptions,
    ) -> CallFunctionPlan {
        let mut common = PlanCommon::new(kind, thread);
        // A call in progress must not be silently dropped by a cascading
        // discard; the caller has to ask for it explicitly.
        common.is_master_plan = true;
        common.ok_to_discard = false;
        CallFunctionPlan {
            common,
            entry,
            sentinel_return_addr,
            options,
            checkpoint: None,
            installed: false,
            outcome: None,
        }
    }

    /// Read off once the plan has reported `mischief_managed`.
    pub fn outcome(&self) -> Option<&CallOutcome> {
        self.outcome.as_ref()
    }

    fn is_at_sentinel(&self, ctx: &PlanContext) -> bool {
        ctx.pc == self.sentinel_return_addr
    }

    fn restore(&mut self, ctx: &mut PlanContext) -> ExecResult<()> {
        if let Some(checkpoint) = self.checkpoint.take() {
            checkpoint.restore(ctx.process, ctx.thread)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CallFunctionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallFunctionPlan(entry=0x{:x})", self.entry)
    }
}

impl ThreadPlanOps for CallFunctionPlan {
    fn common(&self) -> &PlanCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PlanCommon {
        &mut self.common
    }

    fn validate(&mut self, _ctx: &mut PlanContext) -> bool {
        true
    }

    fn explains_stop(&mut self, ctx: &mut PlanContext, stop: &StopEvent) -> bool {
        if self.is_at_sentinel(ctx) {
            return true;
        }
        // Anything else while the artificial frame is live is this call's
        // business until it says otherwise, e.g. a signal delivered mid-call.
        self.checkpoint.is_some() && !matches!(stop.stop_info.reason(), StopReason::None)
    }

    fn should_stop(&mut self, ctx: &mut PlanContext, stop: &StopEvent) -> bool {
        if self.is_at_sentinel(ctx) {
            let _ = self.restore(ctx);
            self.common.mischief_managed = true;
            self.outcome = Some(CallOutcome::Returned { value: None });
            return false;
        }

        // Interrupted mid-call.
        if self.options.discard_on_error {
            let description = describe(stop.stop_info.reason());
            let _ = self.restore(ctx);
            self.common.mischief_managed = true;
            self.outcome = Some(CallOutcome::Interrupted { description });
            true
        } else {
            // Leave the artificial frame in place; let the user decide
            // whether to continue the call or abandon it explicitly.
            true
        }
    }

    fn will_resume(&mut self, ctx: &mut PlanContext, _state: &ResumeState, _is_current: bool) -> Vec<PlanHandle> {
        if !self.installed {
            self.installed = true;
            if let Ok(registers) = ctx.process.read_registers(ctx.thread) {
                let stack_id = ctx.frames.frame_cfa(0).map(StackId).unwrap_or(StackId(0));
                self.checkpoint = Some(RegisterCheckpoint {
                    stack_id,
                    registers,
                });
            }
        }
        Vec::new()
    }

    fn will_stop(&mut self, _ctx: &mut PlanContext) {}

    fn will_pop(&mut self, ctx: &mut PlanContext) {
        // Discarded (e.g. user-aborted) before reaching the sentinel: the
        // checkpoint must still be restored so the thread isn't left
        // mid-call.
        if self.checkpoint.is_some() {
            let _ = self.restore(ctx);
        }
    }

    fn run_state(&self) -> RunState {
        RunState::Running
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn describe(reason: &StopReason) -> String {
    match reason {
        StopReason::Signal { signal_number, .. } => format!("signal {}", signal_number),
        StopReason::Exception { description, .. } => description.clone(),
        StopReason::Breakpoint { .. } => "breakpoint".to_string(),
        StopReason::Watchpoint { .. } => "watchpoint".to_string(),
        other => format!("{:?}", other),
    }
}
