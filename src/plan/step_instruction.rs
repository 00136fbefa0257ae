//! Execute exactly one machine instruction.
//!
//! If PC sits on an enabled breakpoint site when the plan is about to
//! resume, a direct single-step would trip the trap instruction rather
//! than executing the real one underneath it, so the step is delegated
//! to a private child `StepOverBreakpointPlan` instead. Either way,
//! exactly one instruction has executed by the time the plan is asked
//! again, so the plan reports done on its very first look.

use super::{
    step_over_breakpoint::StepOverBreakpointPlan, PlanCommon, PlanContext, PlanHandle, PlanKind,
    ResumeState, RunState, StopEvent, ThreadPlanOps,
};
use crate::stop_info::StopReason;
use crate::thread_id::ThreadId;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub struct StepInstructionPlan {
    common: PlanCommon,
    over: bool,
    delegated: bool,
}

impl StepInstructionPlan {
    pub fn new(thread: ThreadId, over: bool) -> StepInstructionPlan {
        StepInstructionPlan {
            common: PlanCommon::new(PlanKind::StepInstruction, thread),
            over,
            delegated: false,
        }
    }
}

impl fmt::Debug for StepInstructionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepInstructionPlan(over={})", self.over)
    }
}

impl ThreadPlanOps for StepInstructionPlan {
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
        matches!(stop.stop_info.reason(), StopReason::Trace)
    }

    fn should_stop(&mut self, _ctx: &mut PlanContext, _stop: &StopEvent) -> bool {
        self.common.mischief_managed = true;
        true
    }

    fn will_resume(
        &mut self,
        ctx: &mut PlanContext,
        _state: &ResumeState,
        _is_current: bool,
    ) -> Vec<PlanHandle> {
        if self.over && !self.delegated {
            if let Some(site) = ctx.breakpoints.find_site(ctx.pc) {
                if site.enabled {
                    self.delegated = true;
                    let child = StepOverBreakpointPlan::new(ctx.thread, true, false);
                    return vec![Rc::new(RefCell::new(child)) as PlanHandle];
                }
            }
        }
        Vec::new()
    }

    fn will_stop(&mut self, _ctx: &mut PlanContext) {}
    fn will_pop(&mut self, _ctx: &mut PlanContext) {}

    fn run_state(&self) -> RunState {
        RunState::Stepping
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
