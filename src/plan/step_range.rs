//! Step while PC stays in a contiguous address range. The two variants
//! share the same range-vs-call-stack bookkeeping and differ only in what
//! happens when PC leaves the range into a callee: `StepInRangePlan`
//! follows in (optionally skipping frames with no debug info),
//! `StepOverRangePlan` always steps over the call.

use super::{
    step_out::StepOutPlan, PlanCommon, PlanContext, PlanHandle, PlanKind, ResumeState, RunState,
    StopEvent, ThreadPlanOps,
};
use crate::external::Addr;
use crate::stop_info::StopReason;
use crate::thread_id::ThreadId;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AddressRange {
    pub start: Addr,
    pub end: Addr,
}

impl AddressRange {
    pub fn new(start: Addr, end: Addr) -> AddressRange {
        AddressRange { start, end }
    }

    pub fn contains(&self, pc: Addr) -> bool {
        pc >= self.start && pc < self.end
    }

    /// A zero-length range completes as soon as it's first evaluated.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// What happened to PC relative to the range and the call stack depth
/// recorded when the plan started stepping. Frame addresses are assumed to
/// grow toward higher addresses as the stack unwinds outward (the usual
/// convention across architectures), so a larger CFA than the one recorded
/// at entry means a frame was popped (return); a smaller one means a new
/// frame was pushed (call).
enum Outcome {
    StillInRange,
    LeftViaReturn,
    LeftViaCall,
}

fn classify(range: AddressRange, entry_cfa: Addr, pc: Addr, current_cfa: Addr) -> Outcome {
    if range.contains(pc) {
        Outcome::StillInRange
    } else if current_cfa > entry_cfa {
        Outcome::LeftViaReturn
    } else {
        Outcome::LeftViaCall
    }
}

fn current_cfa(ctx: &PlanContext, entry_cfa: Addr) -> Addr {
    ctx.frames.frame_cfa(0).unwrap_or(entry_cfa)
}

pub struct StepInRangePlan {
    common: PlanCommon,
    range: AddressRange,
    entry_cfa: Addr,
    avoid_no_debug: bool,
    pending_step_out: bool,
}

impl StepInRangePlan {
    pub fn new(
        thread: ThreadId,
        range: AddressRange,
        entry_cfa: Addr,
        avoid_no_debug: bool,
    ) -> StepInRangePlan {
        StepInRangePlan {
            common: PlanCommon::new(PlanKind::StepInRange, thread),
            range,
            entry_cfa,
            avoid_no_debug,
            pending_step_out: false,
        }
    }
}

impl fmt::Debug for StepInRangePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepInRangePlan({:?})", self.range)
    }
}

impl ThreadPlanOps for StepInRangePlan {
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

    fn should_stop(&mut self, ctx: &mut PlanContext, _stop: &StopEvent) -> bool {
        if self.range.is_empty() {
            self.common.mischief_managed = true;
            return true;
        }
        let cfa = current_cfa(ctx, self.entry_cfa);
        match classify(self.range, self.entry_cfa, ctx.pc, cfa) {
            Outcome::StillInRange => false,
            Outcome::LeftViaReturn => {
                self.common.mischief_managed = true;
                true
            }
            Outcome::LeftViaCall => {
                if self.avoid_no_debug && ctx.symbols.has_no_debug_info(ctx.pc) {
                    self.pending_step_out = true;
                    false
                } else {
                    self.common.mischief_managed = true;
                    true
                }
            }
        }
    }

    fn will_resume(
        &mut self,
        ctx: &mut PlanContext,
        _state: &ResumeState,
        _is_current: bool,
    ) -> Vec<PlanHandle> {
        if self.pending_step_out {
            self.pending_step_out = false;
            let child = StepOutPlan::new(ctx.thread, self.entry_cfa, true);
            return vec![Rc::new(RefCell::new(child)) as PlanHandle];
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

pub struct StepOverRangePlan {
    common: PlanCommon,
    range: AddressRange,
    entry_cfa: Addr,
    pending_step_over_call: bool,
}

impl StepOverRangePlan {
    pub fn new(thread: ThreadId, range: AddressRange, entry_cfa: Addr) -> StepOverRangePlan {
        StepOverRangePlan {
            common: PlanCommon::new(PlanKind::StepOverRange, thread),
            range,
            entry_cfa,
            pending_step_over_call: false,
        }
    }
}

impl fmt::Debug for StepOverRangePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepOverRangePlan({:?})", self.range)
    }
}

impl ThreadPlanOps for StepOverRangePlan {
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

    fn should_stop(&mut self, ctx: &mut PlanContext, _stop: &StopEvent) -> bool {
        if self.range.is_empty() {
            self.common.mischief_managed = true;
            return true;
        }
        let cfa = current_cfa(ctx, self.entry_cfa);
        match classify(self.range, self.entry_cfa, ctx.pc, cfa) {
            Outcome::StillInRange => false,
            Outcome::LeftViaReturn => {
                self.common.mischief_managed = true;
                true
            }
            // StepOverRange never follows a call, regardless of debug info.
            Outcome::LeftViaCall => {
                self.pending_step_over_call = true;
                false
            }
        }
    }

    fn will_resume(
        &mut self,
        ctx: &mut PlanContext,
        _state: &ResumeState,
        _is_current: bool,
    ) -> Vec<PlanHandle> {
        if self.pending_step_over_call {
            self.pending_step_over_call = false;
            let child = StepOutPlan::new(ctx.thread, self.entry_cfa, true);
            return vec![Rc::new(RefCell::new(child)) as PlanHandle];
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_range_is_empty() {
        let r = AddressRange::new(0x100, 0x100);
        assert!(r.is_empty());
        assert!(!r.contains(0x100));
    }

    #[test]
    fn classify_return_vs_call() {
        let range = AddressRange::new(0x100, 0x110);
        assert!(matches!(
            classify(range, 0x1000, 0x105, 0x1000),
            Outcome::StillInRange
        ));
        assert!(matches!(
            classify(range, 0x1000, 0x200, 0x1100),
            Outcome::LeftViaReturn
        ));
        assert!(matches!(
            classify(range, 0x1000, 0x200, 0x900),
            Outcome::LeftViaCall
        ));
    }
}
