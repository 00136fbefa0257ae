//! Traverse a dynamic-dispatch / trampoline sequence.
//!
//! Resolving the hop addresses themselves is language-runtime-specific and
//! lives entirely outside this crate; `StepThroughPlan` is handed the
//! already-resolved list of trampoline addresses to visit in order and
//! drives a private `RunToAddress` child through each one in turn.

use super::{run_to_address::RunToAddressPlan, PlanCommon, PlanContext, PlanHandle, PlanKind, ResumeState, RunState, StopEvent, ThreadPlanOps};
use crate::external::Addr;
use crate::stop_info::StopReason;
use crate::thread_id::ThreadId;
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
pub struct StepThroughPlan {
    common: PlanCommon,
    remaining: VecDeque<Addr>,
}

impl StepThroughPlan {
    pub fn new(thread: ThreadId, hops: Vec<Addr>) -> StepThroughPlan {
        let mut common = PlanCommon::new(PlanKind::StepThrough, thread);
        if hops.is_empty() {
            common.mischief_managed = true;
        }
        StepThroughPlan {
            common,
            remaining: hops.into(),
        }
    }
}

impl fmt::Debug for StepThroughPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepThroughPlan(remaining={})", self.remaining.len())
    }
}

impl ThreadPlanOps for StepThroughPlan {
    fn common(&self) -> &PlanCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PlanCommon {
        &mut self.common
    }

    fn validate(&mut self, _ctx: &mut PlanContext) -> bool {
        true
    }

    fn explains_stop(&mut self, _ctx: &mut PlanContext, stop: &StopEvent) -> bool {
        matches!(
            stop.stop_info.reason(),
            StopReason::Trace | StopReason::Breakpoint { .. }
        )
    }

    fn should_stop(&mut self, _ctx: &mut PlanContext, _stop: &StopEvent) -> bool {
        self.remaining.pop_front();
        if self.remaining.is_empty() {
            self.common.mischief_managed = true;
            true
        } else {
            false
        }
    }

    fn will_resume(&mut self, ctx: &mut PlanContext, _state: &ResumeState, _is_current: bool) -> Vec<PlanHandle> {
        match self.remaining.front() {
            Some(&addr) => vec![Rc::new(RefCell::new(RunToAddressPlan::new(ctx.thread, addr, true))) as PlanHandle],
            None => Vec::new(),
        }
    }

    fn will_stop(&mut self, _ctx: &mut PlanContext) {}
    fn will_pop(&mut self, _ctx: &mut PlanContext) {}

    fn run_state(&self) -> RunState {
        RunState::Running
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
