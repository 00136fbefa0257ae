//! Single-step over an enabled breakpoint site at PC.
//!
//! Pushed either explicitly (by `StepInstruction`'s step-over flavour) or
//! implicitly by the resume protocol whenever the thread's PC sits on an
//! enabled site and the current plan isn't already one of these. The
//! implicit form is private and auto-continuing so it never surfaces to the
//! user by itself.

use super::{PlanCommon, PlanContext, PlanHandle, PlanKind, ResumeState, RunState, StopEvent, ThreadPlanOps};
use crate::stop_info::{SiteId, StopReason};
use crate::thread_id::ThreadId;
use std::any::Any;
use std::fmt;

#[derive(Debug)]
pub struct StepOverBreakpointPlan {
    common: PlanCommon,
    site: Option<SiteId>,
    disabled: bool,
}

impl StepOverBreakpointPlan {
    pub fn new(thread: ThreadId, private: bool, auto_continue: bool) -> StepOverBreakpointPlan {
        let mut common = PlanCommon::new(PlanKind::StepOverBreakpoint, thread);
        common.is_private = private;
        common.auto_continue = auto_continue;
        StepOverBreakpointPlan {
            common,
            site: None,
            disabled: false,
        }
    }
}

impl fmt::Debug for StepOverBreakpointPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepOverBreakpointPlan(site={:?})", self.site)
    }
}

impl ThreadPlanOps for StepOverBreakpointPlan {
    fn common(&self) -> &PlanCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PlanCommon {
        &mut self.common
    }

    fn validate(&mut self, ctx: &mut PlanContext) -> bool {
        match ctx.breakpoints.find_site(ctx.pc) {
            Some(site) if site.enabled => {
                self.site = Some(site.id);
                true
            }
            _ => false,
        }
    }

    fn explains_stop(&mut self, _ctx: &mut PlanContext, stop: &StopEvent) -> bool {
        matches!(stop.stop_info.reason(), StopReason::Trace)
    }

    fn should_stop(&mut self, ctx: &mut PlanContext, _stop: &StopEvent) -> bool {
        if let Some(site) = self.site {
            let _ = ctx.breakpoints.enable(site);
            self.disabled = false;
        }
        self.common.mischief_managed = true;
        false
    }

    fn will_resume(&mut self, ctx: &mut PlanContext, _state: &ResumeState, _is_current: bool) -> Vec<PlanHandle> {
        if let Some(site) = self.site {
            if !self.disabled {
                let _ = ctx.breakpoints.disable(site);
                self.disabled = true;
            }
        }
        Vec::new()
    }

    fn will_stop(&mut self, _ctx: &mut PlanContext) {}

    fn will_pop(&mut self, ctx: &mut PlanContext) {
        // Defensive: guarantee the site is re-enabled even if should_stop
        // never ran (e.g. the plan was discarded instead of completing
        // normally).
        if self.disabled {
            if let Some(site) = self.site {
                let _ = ctx.breakpoints.enable(site);
            }
            self.disabled = false;
        }
    }

    fn run_state(&self) -> RunState {
        RunState::Stepping
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
