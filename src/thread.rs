//! The per-thread arbitrator: orchestrates the register checkpoint, unwinder,
//! stop-reason, and plan stack across one stop/resume cycle.
//!
//! `Thread` is the one type in this crate that is only ever touched by the
//! monitor thread during a stop, or by an API caller holding the
//! target-level mutex otherwise — it does no locking of its own beyond what
//! `Unwind`'s internal mutex already provides, pushing synchronisation to
//! the narrowest owner rather than sprinkling locks through every layer.

use crate::config::ExecConfig;
use crate::error::{ExecError, ExecResult};
use crate::external::{
    Addr, BreakpointRegistry, NativeProcessController, SymbolResolver, Tracer,
};
use crate::frame::{Frame, FrameList};
use crate::plan::{
    plan_applies_to, AddressRange, BasePlan, CallFunctionOptions, CallFunctionPlan, PlanContext,
    PlanHandle, PlanKind, ResumeState, RunState, RunToAddressPlan, StepInRangePlan,
    StepInstructionPlan, StepOutPlan, StepOverBreakpointPlan, StepOverRangePlan, StepUntilPlan,
    StopEvent, Vote,
};
use crate::plan_stack::ThreadPlanStack;
use crate::registers::{RegisterCheckpoint, StackId, ThreadStateCheckpoint};
use crate::stop_info::{StopInfo, StopReason};
use crate::thread_id::{StopId, ThreadId};
use crate::thread_spec::MatchableThread;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// The target-lost / detach transition a thread goes through when the
/// native process disappears out from under it.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ThreadExecState {
    Running,
    Stopped,
    Exited,
    Detached,
}

/// Weak-referenceable cell a [`StopInfo`] points back to, so ownership stays
/// acyclic — StopInfos reference the thread weakly.
use crate::stop_info::ThreadIdCell;

pub struct Thread {
    id: ThreadId,
    index: u32,
    name: String,
    queue_name: String,
    state: ThreadExecState,
    config: ExecConfig,

    id_cell: Rc<ThreadIdCell>,
    stop_id: StopId,

    plans: ThreadPlanStack,
    unwind: Box<dyn crate::unwind::UnwindHandle>,

    current_frames: FrameList,
    previous_frames: Option<FrameList>,

    last_stop_info: StopInfo,
    resume_signal: Option<i32>,

    tracer: Option<Box<dyn Tracer>>,
}

impl Thread {
    pub fn new(
        id: ThreadId,
        index: u32,
        name: impl Into<String>,
        unwind: Box<dyn crate::unwind::UnwindHandle>,
        config: ExecConfig,
    ) -> Thread {
        let id_cell = Rc::new(ThreadIdCell(id));
        let base: PlanHandle = Rc::new(RefCell::new(BasePlan::new(id)));
        Thread {
            id,
            index,
            name: name.into(),
            queue_name: String::new(),
            state: ThreadExecState::Stopped,
            config,
            id_cell,
            stop_id: StopId::zero(),
            plans: ThreadPlanStack::new(base),
            unwind,
            current_frames: FrameList::new(),
            previous_frames: None,
            last_stop_info: StopInfo::none(StopId::zero()),
            resume_signal: None,
            tracer: None,
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn state(&self) -> ThreadExecState {
        self.state
    }

    pub fn set_queue_name(&mut self, queue_name: impl Into<String>) {
        self.queue_name = queue_name.into();
    }

    pub fn attach_tracer(&mut self, tracer: Box<dyn Tracer>) {
        self.tracer = Some(tracer);
    }

    pub fn weak_id_cell(&self) -> Weak<ThreadIdCell> {
        Rc::downgrade(&self.id_cell)
    }

    pub fn stop_id(&self) -> StopId {
        self.stop_id
    }

    pub fn plans(&self) -> &ThreadPlanStack {
        &self.plans
    }

    // ----- StopInfo ----------------------------------------------------------

    /// Install a freshly-observed StopInfo for the current stop epoch,
    /// marking it valid: valid iff snapshot matches the current stop-id,
    /// which this call just set it to.
    pub fn set_stop_info(&mut self, reason: crate::stop_info::StopReason) {
        self.last_stop_info = StopInfo::new(reason, self.stop_id, self.weak_id_cell());
        self.state = ThreadExecState::Stopped;
    }

    /// Returns the current StopInfo if it's still valid for this stop epoch;
    /// `None` means the native layer must be re-queried and
    /// [`Thread::set_stop_info`] called again.
    pub fn stop_info(&self) -> Option<&StopInfo> {
        if self.last_stop_info.is_valid(self.stop_id) {
            Some(&self.last_stop_info)
        } else {
            None
        }
    }

    // ----- Frames --------------------------------------------------------

    pub fn get_frame(&mut self, idx: u32) -> ExecResult<Rc<Frame>> {
        self.current_frames
            .ensure_via_handle(idx, self.unwind.as_ref())
    }

    /// A frame from the list in effect *before* the most recent resume; may
    /// be retained across one resume.
    pub fn get_previous_frame(&self, idx: u32) -> Option<Rc<Frame>> {
        self.previous_frames.as_ref().and_then(|f| f.get(idx as usize))
    }

    pub fn frame_count(&self) -> u32 {
        self.unwind.frame_count()
    }

    // ----- Checkpoint / restore ----------------------------------------------

    pub fn save_checkpoint(
        &self,
        process: &mut dyn NativeProcessController,
    ) -> ExecResult<ThreadStateCheckpoint> {
        let stack_id = StackId(self.unwind.frame_cfa(0).unwrap_or(0));
        let registers = RegisterCheckpoint::save(process, self.id, stack_id)?;
        Ok(ThreadStateCheckpoint {
            registers,
            stop_info: self.last_stop_info.clone(),
            stop_id: self.stop_id,
        })
    }

    /// Restores registers, invalidates the unwinder and frame list, and
    /// reinstates the checkpointed StopInfo, revalidated against the
    /// *current* stop-id so it reads as valid again.
    pub fn restore_checkpoint(
        &mut self,
        process: &mut dyn NativeProcessController,
        checkpoint: &ThreadStateCheckpoint,
    ) -> ExecResult<()> {
        checkpoint.registers.restore(process, self.id)?;
        self.unwind.clear();
        self.previous_frames = Some(std::mem::replace(&mut self.current_frames, FrameList::new()));
        self.last_stop_info = checkpoint.stop_info.revalidated(self.stop_id);
        Ok(())
    }

    // ----- Queueing plans ----------------------------------------------------

    /// `queue_plan` — validates before pushing; a validation failure is
    /// returned synchronously and the plan is not pushed.
    pub fn queue_plan(&mut self, ctx: &mut PlanContext, plan: PlanHandle) -> ExecResult<()> {
        let ok = plan.borrow_mut().validate(ctx);
        if !ok {
            return Err(ExecError::PlanValidationFailed {
                thread: self.id,
                reason: format!("{:?} failed validate()", plan.borrow().kind()),
            });
        }
        self.plans.push(plan);
        Ok(())
    }

    pub fn step_instruction(&mut self, ctx: &mut PlanContext, over: bool) -> ExecResult<()> {
        let plan = Rc::new(RefCell::new(StepInstructionPlan::new(self.id, over)));
        self.queue_plan(ctx, plan)
    }

    pub fn step_in_range(
        &mut self,
        ctx: &mut PlanContext,
        range: AddressRange,
        avoid_no_debug: bool,
    ) -> ExecResult<()> {
        let entry_cfa = ctx.frames.frame_cfa(0).unwrap_or(0);
        let plan = Rc::new(RefCell::new(StepInRangePlan::new(
            self.id,
            range,
            entry_cfa,
            avoid_no_debug,
        )));
        self.queue_plan(ctx, plan)
    }

    pub fn step_over_range(&mut self, ctx: &mut PlanContext, range: AddressRange) -> ExecResult<()> {
        let entry_cfa = ctx.frames.frame_cfa(0).unwrap_or(0);
        let plan = Rc::new(RefCell::new(StepOverRangePlan::new(self.id, range, entry_cfa)));
        self.queue_plan(ctx, plan)
    }

    pub fn step_out(&mut self, ctx: &mut PlanContext) -> ExecResult<()> {
        let entry_cfa = ctx.frames.frame_cfa(0).unwrap_or(0);
        let plan = Rc::new(RefCell::new(StepOutPlan::new(self.id, entry_cfa, false)));
        self.queue_plan(ctx, plan)
    }

    pub fn run_to_address(&mut self, ctx: &mut PlanContext, addr: Addr) -> ExecResult<()> {
        let plan = Rc::new(RefCell::new(RunToAddressPlan::new(self.id, addr, false)));
        self.queue_plan(ctx, plan)
    }

    pub fn step_until(&mut self, ctx: &mut PlanContext, targets: Vec<Addr>) -> ExecResult<()> {
        let plan = Rc::new(RefCell::new(StepUntilPlan::new(self.id, targets)));
        self.queue_plan(ctx, plan)
    }

    pub fn call_function(
        &mut self,
        ctx: &mut PlanContext,
        entry: Addr,
        sentinel_return_addr: Addr,
        options: CallFunctionOptions,
    ) -> ExecResult<()> {
        let plan = Rc::new(RefCell::new(CallFunctionPlan::new(
            self.id,
            entry,
            sentinel_return_addr,
            options,
        )));
        self.queue_plan(ctx, plan)
    }

    /// As [`Thread::call_function`], but for a JIT'd user expression rather
    /// than a known function address — the expression compiler (outside
    /// this crate) has already resolved `entry` by the time this is called;
    /// only the reported `PlanKind` differs.
    pub fn call_user_expression(
        &mut self,
        ctx: &mut PlanContext,
        entry: Addr,
        sentinel_return_addr: Addr,
        options: CallFunctionOptions,
    ) -> ExecResult<()> {
        let plan = Rc::new(RefCell::new(CallFunctionPlan::new_user_expression(
            self.id,
            entry,
            sentinel_return_addr,
            options,
        )));
        self.queue_plan(ctx, plan)
    }

    // ----- Discarding ----------------------------------------------------

    pub fn discard_plans(&mut self, ctx: &mut PlanContext, up_to: Option<&PlanHandle>) {
        match up_to {
            Some(plan) => self.plans.discard_up_to(ctx, plan),
            None => self.plans.discard_all(ctx, false),
        }
    }

    /// Target-lost discards every plan without calling `will_stop`
    /// (`pop_to_discarded` never does).
    pub fn mark_target_lost(&mut self, ctx: &mut PlanContext) {
        self.plans.discard_all(ctx, true);
        self.state = ThreadExecState::Exited;
    }

    // ----- Resume protocol ---------------------------------------------------

    /// Drains the resume buffers, notifies the tracer, runs every active
    /// plan's `will_resume` top-down (pushing any children it spawns), then
    /// installs an implicit step-over-breakpoint if PC sits on a live site.
    /// Notifying the current StopInfo of the imminent resume has no
    /// native-side state to prepare in this crate's abstraction — the
    /// StopInfo is immutable data, not a live handle — so is folded into
    /// clearing it at the end.
    pub fn prepare_resume(&mut self, ctx: &mut PlanContext, state: &ResumeState) {
        self.plans.drain_resume_buffers();

        if let Some(tracer) = &mut self.tracer {
            tracer.on_resume(self.id);
        }

        // Top-down pass over the stack as it stood at the start of this
        // resume, `is_current` recomputed at call time rather than fixed
        // up front: a plan pushing a child (e.g. StepInstruction spawning a
        // StepOverBreakpoint) hands that child the actual top slot, and the
        // child needs its own `will_resume` turn in this same cycle so a
        // side effect like disabling a breakpoint site lands before the
        // native resume is issued, not one stop later.
        let mut worklist: Vec<PlanHandle> = self.plans.iter_top_down().cloned().collect();
        let mut i = 0;
        while i < worklist.len() {
            let plan = worklist[i].clone();
            let is_current = same_plan(&plan, self.plans.top());
            let children = plan.borrow_mut().will_resume(ctx, state, is_current);
            for (offset, child) in children.into_iter().enumerate() {
                // A child is validated once, the same as a user-queued plan
                // would be by `queue_plan`, before its own first
                // `will_resume` turn below picks it up — this is where
                // e.g. `StepOverBreakpointPlan` records which site it's
                // covering.
                child.borrow_mut().validate(ctx);
                self.plans.push(child.clone());
                worklist.insert(i + 1 + offset, child);
            }
            i += 1;
        }

        if let Some(site) = ctx.breakpoints.find_site(ctx.pc) {
            if site.enabled && self.plans.top().borrow().kind() != PlanKind::StepOverBreakpoint {
                let stepping = self.plans.top().borrow().run_state() == RunState::Stepping;
                let implicit = StepOverBreakpointPlan::new(self.id, true, !stepping);
                self.plans.push(Rc::new(RefCell::new(implicit)));
            }
        }

        self.last_stop_info = StopInfo::invalid();
        self.resume_signal = None;
    }

    /// Called by the native monitor immediately after issuing the resume:
    /// the unwinder and frame lists are now stale.
    pub fn note_resumed(&mut self) {
        self.unwind.clear();
        self.previous_frames = Some(std::mem::replace(&mut self.current_frames, FrameList::new()));
        self.stop_id = self.stop_id.next();
        self.state = ThreadExecState::Running;
    }

    pub fn resume_signal(&self) -> Option<i32> {
        self.resume_signal
    }

    pub fn set_resume_signal(&mut self, signal: Option<i32>) {
        self.resume_signal = signal;
    }

    // ----- Stop-reason arbitration, the central algorithm ---------------------

    /// Returns `(stop_here, report_vote)`: resolve the explainer, let it
    /// decide, cascade the pop through any plans that also complete as a
    /// result, and aggregate the report vote over everything that got
    /// popped this cycle.
    pub fn handle_stop(&mut self, ctx: &mut PlanContext) -> (bool, Vote) {
        let stop_info = self.gate_breakpoint_by_thread_spec(ctx, self.last_stop_info.clone());
        let stop = StopEvent {
            stop_info: &stop_info,
        };

        let explainer = match self.resolve_explainer(ctx, &stop) {
            Some(plan) => plan,
            // The tracer consumed the stop: no user-visible stop, no
            // popping, and — because no plan was popped this cycle — no
            // cascade vote either.
            None => return (false, Vote::NoOpinion),
        };

        let stop_here_initial = explainer.borrow_mut().should_stop(ctx, &stop);
        let explainer_managed = explainer.borrow().mischief_managed();

        let mut popped_explainer = false;
        if explainer_managed {
            loop {
                let is_explainer = same_plan(self.plans.top(), &explainer);
                if stop_here_initial {
                    self.plans.top().borrow_mut().will_stop(ctx);
                }
                self.plans.pop_to_completed(ctx);
                if is_explainer {
                    break;
                }
            }
            popped_explainer = true;
        }

        let mut stop_here = stop_here_initial;
        if popped_explainer {
            // Everything below the popped explainer reacts to its
            // completion, not to the raw native event that triggered it —
            // this is exactly what the `PlanComplete` StopInfo variant is
            // for, and is why `StopInfo::should_stop` treats `PlanComplete`
            // as always stop-worthy: it's how a plan a user queued directly
            // (e.g. `StepInstruction`) ends up reported as
            // `reason=PlanComplete` once its own completion reaches the
            // base plan.
            let plan_complete = StopInfo::new(
                StopReason::PlanComplete {
                    plan: explainer.clone(),
                    return_value: None,
                },
                self.stop_id,
                self.weak_id_cell(),
            );
            let completion = StopEvent {
                stop_info: &plan_complete,
            };

            loop {
                let top = self.plans.top().clone();
                let sh = top.borrow_mut().should_stop(ctx, &completion);
                stop_here = sh;
                if !sh {
                    break;
                }
                let (is_master, ok_discard, managed) = {
                    let b = top.borrow();
                    (b.is_master_plan(), b.ok_to_discard(), b.mischief_managed())
                };
                if is_master && !ok_discard {
                    break;
                }
                if managed {
                    if stop_here {
                        top.borrow_mut().will_stop(ctx);
                    }
                    self.plans.pop_to_completed(ctx);
                    continue;
                } else {
                    break;
                }
            }

            if stop_here {
                self.last_stop_info = StopInfo::new(
                    StopReason::PlanComplete {
                        plan: explainer.clone(),
                        return_value: None,
                    },
                    self.stop_id,
                    self.weak_id_cell(),
                );
            }
        }

        if explainer.borrow().auto_continue() {
            stop_here = false;
        }

        let report_vote = self.aggregate_report_vote(ctx, &stop);
        (stop_here, report_vote)
    }

    /// If this stop is a breakpoint hit at a site scoped to a different
    /// thread, force its should-stop decision to `false` so the base plan
    /// passes straight through it instead of surfacing it here.
    fn gate_breakpoint_by_thread_spec(&self, ctx: &PlanContext, stop_info: StopInfo) -> StopInfo {
        let (site_id, location) = match stop_info.reason() {
            StopReason::Breakpoint {
                site,
                location,
                should_stop_override: None,
            } => (*site, *location),
            _ => return stop_info,
        };
        let site = match ctx.breakpoints.find_site(ctx.pc) {
            Some(site) if site.id == site_id => site,
            _ => return stop_info,
        };
        if plan_applies_to(site.thread_spec.as_ref(), self) {
            return stop_info;
        }
        StopInfo::new(
            StopReason::Breakpoint {
                site: site_id,
                location,
                should_stop_override: Some(false),
            },
            stop_info.snapshot_stop_id(),
            self.weak_id_cell(),
        )
    }

    /// A plan scoped to another thread never gets to claim a stop on this
    /// one; the base plan stays the fallback explainer in that case, exactly
    /// as if nothing else had matched.
    fn resolve_explainer(&mut self, ctx: &mut PlanContext, stop: &StopEvent) -> Option<PlanHandle> {
        let top = self.plans.top().clone();
        let top_applies = plan_applies_to(top.borrow().thread_spec(), self);
        if top_applies && top.borrow_mut().explains_stop(ctx, stop) {
            return Some(top);
        }
        if top.borrow_mut().tracer_explains_stop(ctx) {
            return None;
        }
        if let Some(tracer) = &mut self.tracer {
            if tracer.on_stop(self.id) {
                return None;
            }
        }
        for plan in self.plans.iter_top_down().skip(1) {
            if !plan_applies_to(plan.borrow().thread_spec(), self) {
                continue;
            }
            if plan.borrow_mut().explains_stop(ctx, stop) {
                return Some(plan.clone());
            }
        }
        // The base plan explains everything it's asked about; reaching here
        // without a match would mean the "exactly one explainer" invariant
        // was violated by some plan's `explains_stop`.
        unreachable!("base plan always explains the stop")
    }

    /// Combine the report vote of every plan popped this cycle with the
    /// current top plan's own vote, falling back to "yes" for an
    /// exception-like stop nobody voted on and "no" otherwise.
    fn aggregate_report_vote(&self, ctx: &PlanContext, stop: &StopEvent) -> Vote {
        let mut completed_vote = Vote::NoOpinion;
        for plan in self.plans.completed() {
            completed_vote = completed_vote.combine(plan.borrow().should_report_stop(ctx, stop));
        }
        let vote = if completed_vote != Vote::NoOpinion {
            completed_vote
        } else {
            self.plans.top().borrow().should_report_stop(ctx, stop)
        };
        if vote != Vote::NoOpinion {
            vote
        } else if stop.stop_info.is_exception_like() {
            Vote::Yes
        } else {
            Vote::No
        }
    }
}

fn same_plan(a: &PlanHandle, b: &PlanHandle) -> bool {
    Rc::ptr_eq(a, b)
}

impl MatchableThread for Thread {
    fn id(&self) -> ThreadId {
        self.id
    }

    fn index(&self) -> u32 {
        self.index
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn queue_name(&self) -> &str {
        &self.queue_name
    }
}
