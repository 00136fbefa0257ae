//! Bottom-of-stack sentinel.

use super::{PlanCommon, PlanContext, PlanHandle, PlanKind, ResumeState, RunState, StopEvent, ThreadPlanOps};
use crate::thread_id::ThreadId;
use std::any::Any;
use std::fmt;

pub struct BasePlan {
    common: PlanCommon,
}

impl BasePlan {
    pub fn new(thread: ThreadId) -> BasePlan {
        let mut common = PlanCommon::new(PlanKind::Base, thread);
        // The base plan is never discarded and never yields to a master
        // plan above it — it's the floor, not a candidate for cascading.
        common.ok_to_discard = false;
        common.is_master_plan = true;
        BasePlan { common }
    }
}

impl fmt::Debug for BasePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasePlan(thread={})", self.common.thread)
    }
}

impl ThreadPlanOps for BasePlan {
    fn common(&self) -> &PlanCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PlanCommon {
        &mut self.common
    }

    fn validate(&mut self, _ctx: &mut PlanContext) -> bool {
        true
    }

    /// Explains every stop that no other plan explains — arbitration's
    /// fallback always terminates here.
    fn explains_stop(&mut self, _ctx: &mut PlanContext, _stop: &StopEvent) -> bool {
        true
    }

    fn should_stop(&mut self, _ctx: &mut PlanContext, stop: &StopEvent) -> bool {
        stop.stop_info.should_stop()
    }

    fn will_resume(&mut self, _ctx: &mut PlanContext, _state: &ResumeState, _is_current: bool) -> Vec<PlanHandle> {
        Vec::new()
    }

    fn will_stop(&mut self, _ctx: &mut PlanContext) {}

    fn will_pop(&mut self, _ctx: &mut PlanContext) {
        unreachable!("the base plan is never popped");
    }

    fn run_state(&self) -> RunState {
        RunState::Running
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_never_reports_mischief_managed() {
        let plan = BasePlan::new(ThreadId::new(1));
        assert!(!plan.mischief_managed());
        assert!(!plan.ok_to_discard());
        assert!(plan.is_master_plan());
    }

    // should_stop()'s delegation to StopInfo::should_stop is exercised in
    // tests/scenarios.rs, where a fake NativeProcessController is available
    // to build a full PlanContext.
}
