//! Run until a target address is reached.
//!
//! The simplest of the one-shot-breakpoint plans; `StepOut` and
//! `StepThrough` are both built out of one of these per hop.

use super::{PlanCommon, PlanContext, PlanHandle, PlanKind, ResumeState, RunState, StopEvent, ThreadPlanOps};
use crate::external::Addr;
use crate::stop_info::{SiteId, StopReason};
use crate::thread_id::ThreadId;
use crate::thread_spec::ThreadSpec;
use std::any::Any;
use std::fmt;

#[derive(Debug)]
pub struct RunToAddressPlan {
    common: PlanCommon,
    target: Addr,
    site: Option<SiteId>,
}

impl RunToAddressPlan {
    pub fn new(thread: ThreadId, target: Addr, private: bool) -> RunToAddressPlan {
        let mut common = PlanCommon::new(PlanKind::RunToAddress, thread);
        common.is_private = private;
        RunToAddressPlan {
            common,
            target,
            site: None,
        }
    }
}

impl fmt::Debug for RunToAddressPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunToAddressPlan(target=0x{:x})", self.target)
    }
}

impl ThreadPlanOps for RunToAddressPlan {
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
        matches!(stop.stop_info.reason(), StopReason::Breakpoint { site, .. } if Some(*site) == self.site)
    }

    fn should_stop(&mut self, _ctx: &mut PlanContext, _stop: &StopEvent) -> bool {
        self.common.mischief_managed = true;
        true
    }

    fn will_resume(&mut self, ctx: &mut PlanContext, _state: &ResumeState, _is_current: bool) -> Vec<PlanHandle> {
        if self.site.is_none() {
            if let Ok(id) = ctx
                .breakpoints
                .install(self.target, Some(ThreadSpec::new().with_id(ctx.thread)))
            {
                self.site = Some(id);
            }
        }
        Vec::new()
    }

    fn will_stop(&mut self, _ctx: &mut PlanContext) {}

    fn will_pop(&mut self, ctx: &mut PlanContext) {
        if let Some(site) = self.site.take() {
            let _ = ctx.breakpoints.remove(site);
        }
    }

    fn run_state(&self) -> RunState {
        RunState::Running
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
