//! Run until the return address of a designated frame is reached.
//!
//! Pushed either directly (user "step out") or as a private child of
//! `StepInRange`/`StepOverRange` to skip over an uninteresting callee. The
//! boundary case of stepping out of the bottom frame reports completion
//! immediately, without waiting for a native stop.

use super::{PlanCommon, PlanContext, PlanHandle, PlanKind, ResumeState, RunState, StopEvent, ThreadPlanOps};
use crate::external::Addr;
use crate::stop_info::{SiteId, StopReason};
use crate::thread_id::ThreadId;
use crate::thread_spec::ThreadSpec;
use std::any::Any;
use std::fmt;

#[derive(Debug)]
pub struct StepOutPlan {
    common: PlanCommon,
    return_addr: Option<Addr>,
    site: Option<SiteId>,
    immediate: bool,
}

impl StepOutPlan {
    pub fn new(thread: ThreadId, _caller_entry_cfa: Addr, private: bool) -> StepOutPlan {
        let mut common = PlanCommon::new(PlanKind::StepOut, thread);
        common.is_private = private;
        StepOutPlan {
            common,
            return_addr: None,
            site: None,
            immediate: false,
        }
    }
}

impl fmt::Debug for StepOutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepOutPlan(return_addr={:?})", self.return_addr)
    }
}

impl ThreadPlanOps for StepOutPlan {
    fn common(&self) -> &PlanCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PlanCommon {
        &mut self.common
    }

    fn validate(&mut self, ctx: &mut PlanContext) -> bool {
        if ctx.frames.frame_count() < 2 {
            self.immediate = true;
            self.common.mischief_managed = true;
            return true;
        }
        self.return_addr = ctx.frames.frame_pc(1);
        self.return_addr.is_some()
    }

    fn explains_stop(&mut self, _ctx: &mut PlanContext, stop: &StopEvent) -> bool {
        if self.immediate {
            return true;
        }
        matches!(stop.stop_info.reason(), StopReason::Breakpoint { site, .. } if Some(*site) == self.site)
    }

    fn should_stop(&mut self, _ctx: &mut PlanContext, _stop: &StopEvent) -> bool {
        self.common.mischief_managed = true;
        true
    }

    fn will_resume(&mut self, ctx: &mut PlanContext, _state: &ResumeState, _is_current: bool) -> Vec<PlanHandle> {
        if !self.immediate && self.site.is_none() {
            if let Some(addr) = self.return_addr {
                if let Ok(id) = ctx
                    .breakpoints
                    .install(addr, Some(ThreadSpec::new().with_id(ctx.thread)))
                {
                    self.site = Some(id);
                }
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
