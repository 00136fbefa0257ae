//! Run until one of a set of addresses is hit, bailing out early if the
//! current frame returns first.
//!
//! A one-shot breakpoint per target address, plus a return-address guard
//! on the frame the plan was started in: whichever fires first manages
//! the plan. The guard exists because "until" is meant to stay within
//! the current invocation — if the function returns before any target
//! address is reached, continuing to wait for one could run forever.

use super::{PlanCommon, PlanContext, PlanHandle, PlanKind, ResumeState, RunState, StopEvent, ThreadPlanOps};
use crate::external::Addr;
use crate::stop_info::{SiteId, StopReason};
use crate::thread_id::ThreadId;
use crate::thread_spec::ThreadSpec;
use std::any::Any;
use std::fmt;

pub struct StepUntilPlan {
    common: PlanCommon,
    targets: Vec<Addr>,
    return_addr: Option<Addr>,
    sites: Vec<SiteId>,
    return_site: Option<SiteId>,
}

impl StepUntilPlan {
    pub fn new(thread: ThreadId, targets: Vec<Addr>) -> StepUntilPlan {
        let mut common = PlanCommon::new(PlanKind::StepUntil, thread);
        if targets.is_empty() {
            common.mischief_managed = true;
        }
        StepUntilPlan {
            common,
            targets,
            return_addr: None,
            sites: Vec::new(),
            return_site: None,
        }
    }
}

impl fmt::Debug for StepUntilPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepUntilPlan(targets={})", self.targets.len())
    }
}

impl ThreadPlanOps for StepUntilPlan {
    fn common(&self) -> &PlanCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PlanCommon {
        &mut self.common
    }

    fn validate(&mut self, ctx: &mut PlanContext) -> bool {
        if ctx.frames.frame_count() >= 2 {
            self.return_addr = ctx.frames.frame_pc(1);
        }
        true
    }

    fn explains_stop(&mut self, _ctx: &mut PlanContext, stop: &StopEvent) -> bool {
        match stop.stop_info.reason() {
            StopReason::Breakpoint { site, .. } => {
                self.sites.contains(site) || self.return_site == Some(*site)
            }
            _ => false,
        }
    }

    fn should_stop(&mut self, _ctx: &mut PlanContext, stop: &StopEvent) -> bool {
        self.common.mischief_managed = true;
        if let StopReason::Breakpoint { site, .. } = stop.stop_info.reason() {
            if self.return_site == Some(*site) {
                // Left via return before any target address was hit: still
                // done, just not the way the caller was hoping for.
                return true;
            }
        }
        true
    }

    fn will_resume(&mut self, ctx: &mut PlanContext, _state: &ResumeState, _is_current: bool) -> Vec<PlanHandle> {
        if self.sites.is_empty() {
            for &addr in &self.targets {
                if let Ok(id) = ctx
                    .breakpoints
                    .install(addr, Some(ThreadSpec::new().with_id(ctx.thread)))
                {
                    self.sites.push(id);
                }
            }
        }
        if self.return_site.is_none() {
            if let Some(addr) = self.return_addr {
                if let Ok(id) = ctx
                    .breakpoints
                    .install(addr, Some(ThreadSpec::new().with_id(ctx.thread)))
                {
                    self.return_site = Some(id);
                }
            }
        }
        Vec::new()
    }

    fn will_stop(&mut self, _ctx: &mut PlanContext) {}

    fn will_pop(&mut self, ctx: &mut PlanContext) {
        for site in self.sites.drain(..) {
            let _ = ctx.breakpoints.remove(site);
        }
        if let Some(site) = self.return_site.take() {
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
