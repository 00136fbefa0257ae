//! Hand-written in-memory fakes driving the crate only through
//! `external.rs`'s consumed-trait contracts, the way the teacher's own
//! `gdbstub_tests` crate drives `gdbstub` against an in-memory CPU emulator
//! rather than real hardware.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use threadplan::external::{
    Addr, BreakpointRegistry, BreakpointSite, FunctionInfo, NativeProcessController,
    NativeStopEvent, SymbolResolver, ThreadResumeAction,
};
use threadplan::registers::Registers;
use threadplan::stop_info::SiteId;
use threadplan::thread_id::ThreadId;
use threadplan::thread_spec::ThreadSpec;
use threadplan::unwind::FrameInfo;
use threadplan::unwind::UnwindStrategy;
use threadplan::ExecResult;

/// An in-memory stand-in for the ptrace/Mach layer: registers keyed by
/// thread, no real memory backing since nothing under test reads target
/// memory directly.
pub struct FakeProcess {
    registers: HashMap<u64, Registers>,
    pub resume_calls: Vec<Vec<ThreadResumeAction>>,
}

impl FakeProcess {
    pub fn new() -> FakeProcess {
        FakeProcess {
            registers: HashMap::new(),
            resume_calls: Vec::new(),
        }
    }

    pub fn set_registers(&mut self, thread: ThreadId, registers: Registers) {
        self.registers.insert(thread.raw(), registers);
    }
}

impl NativeProcessController for FakeProcess {
    fn launch(&mut self, _path: &str, _args: &[String]) -> ExecResult<()> {
        Ok(())
    }

    fn attach(&mut self, _pid: u32) -> ExecResult<()> {
        Ok(())
    }

    fn resume(&mut self, actions: &[ThreadResumeAction]) -> ExecResult<()> {
        self.resume_calls.push(actions.to_vec());
        Ok(())
    }

    fn halt(&mut self) -> ExecResult<()> {
        Ok(())
    }

    fn read_memory(&mut self, _thread: ThreadId, _addr: Addr, _buf: &mut [u8]) -> ExecResult<()> {
        Ok(())
    }

    fn write_memory(&mut self, _thread: ThreadId, _addr: Addr, _buf: &[u8]) -> ExecResult<()> {
        Ok(())
    }

    fn read_registers(&mut self, thread: ThreadId) -> ExecResult<Registers> {
        Ok(self
            .registers
            .get(&thread.raw())
            .cloned()
            .unwrap_or_else(|| Registers::new(0, Vec::new())))
    }

    fn write_registers(&mut self, thread: ThreadId, registers: &Registers) -> ExecResult<()> {
        self.registers.insert(thread.raw(), registers.clone());
        Ok(())
    }

    fn wait_for_stop(&mut self) -> ExecResult<NativeStopEvent> {
        unimplemented!("scenarios drive stops directly via Thread::set_stop_info")
    }
}

/// A breakpoint registry backed by a plain map, supporting the one piece of
/// filtering the scenarios need: a site's optional `ThreadSpec`.
pub struct FakeBreakpoints {
    sites: HashMap<u64, BreakpointSite>,
    next_id: u64,
}

impl FakeBreakpoints {
    pub fn new() -> FakeBreakpoints {
        FakeBreakpoints {
            sites: HashMap::new(),
            next_id: 1,
        }
    }

    /// Install a site directly (bypassing `install`'s auto-assigned id),
    /// returning the id so test code can reference it later.
    pub fn install_at(&mut self, addr: Addr, thread_spec: Option<ThreadSpec>) -> SiteId {
        let id = SiteId(self.next_id);
        self.next_id += 1;
        self.sites.insert(
            id.0,
            BreakpointSite {
                id,
                addr,
                enabled: true,
                thread_spec,
            },
        );
        id
    }

    pub fn site(&self, id: SiteId) -> Option<&BreakpointSite> {
        self.sites.get(&id.0)
    }
}

impl BreakpointRegistry for FakeBreakpoints {
    fn find_site(&self, addr: Addr) -> Option<BreakpointSite> {
        self.sites.values().find(|s| s.addr == addr).cloned()
    }

    fn install(&mut self, addr: Addr, thread_spec: Option<ThreadSpec>) -> ExecResult<SiteId> {
        Ok(self.install_at(addr, thread_spec))
    }

    fn enable(&mut self, site: SiteId) -> ExecResult<()> {
        if let Some(s) = self.sites.get_mut(&site.0) {
            s.enabled = true;
        }
        Ok(())
    }

    fn disable(&mut self, site: SiteId) -> ExecResult<()> {
        if let Some(s) = self.sites.get_mut(&site.0) {
            s.enabled = false;
        }
        Ok(())
    }

    fn remove(&mut self, site: SiteId) -> ExecResult<()> {
        self.sites.remove(&site.0);
        Ok(())
    }
}

/// A symbol resolver with a configurable set of "no debug info" ranges, the
/// one property `StepInRange`'s `avoid_no_debug` reacts to.
pub struct FakeSymbols {
    no_debug_ranges: Vec<(Addr, Addr)>,
}

impl FakeSymbols {
    pub fn new() -> FakeSymbols {
        FakeSymbols {
            no_debug_ranges: Vec::new(),
        }
    }

    pub fn mark_no_debug_info(&mut self, start: Addr, end: Addr) {
        self.no_debug_ranges.push((start, end));
    }
}

impl SymbolResolver for FakeSymbols {
    fn function_for_address(&self, _addr: Addr) -> Option<FunctionInfo> {
        None
    }

    fn line_for_address(&self, addr: Addr) -> Option<(String, u32)> {
        if self.has_no_debug_info(addr) {
            None
        } else {
            Some(("fake.rs".to_string(), 1))
        }
    }

    fn return_type_of(&self, _function: &FunctionInfo) -> Option<String> {
        None
    }

    fn has_no_debug_info(&self, addr: Addr) -> bool {
        self.no_debug_ranges
            .iter()
            .any(|(start, end)| addr >= *start && addr < *end)
    }
}

/// A call-stack unwinder whose frames are set by the test driver between
/// stops (`Rc<RefCell<_>>` so the test keeps a handle to mutate it while the
/// `Unwind` owns a clone for frame discovery). Frames are cleared by
/// `Thread::note_resumed`'s call to `Unwind::clear`, so updating the script
/// and then resuming always reflects the new stack on the next query.
#[derive(Clone)]
pub struct ScriptedFrames {
    frames: Rc<RefCell<Vec<FrameInfo>>>,
}

impl ScriptedFrames {
    pub fn new() -> (ScriptedFrames, Rc<RefCell<Vec<FrameInfo>>>) {
        let frames = Rc::new(RefCell::new(Vec::new()));
        (
            ScriptedFrames {
                frames: frames.clone(),
            },
            frames,
        )
    }

    /// Build another view onto an already-existing frame script, so a test
    /// can keep the `Thread`'s own unwinder and its `PlanContext::frames`
    /// view reading the same data (the caller is responsible for clearing
    /// whichever `Unwind` wraps this after updating the shared script).
    pub fn from_handle(frames: Rc<RefCell<Vec<FrameInfo>>>) -> ScriptedFrames {
        ScriptedFrames { frames }
    }
}

/// A strategy with no frames at all, for scenarios where plan logic never
/// reads `PlanContext::frames`.
pub struct NoFrames;

impl UnwindStrategy for NoFrames {
    fn unwind_frame(&mut self, _idx: u32, _known: &[FrameInfo]) -> Option<FrameInfo> {
        None
    }

    fn register_context_for_frame(&mut self, frame: FrameInfo) -> ExecResult<Registers> {
        Ok(Registers::new(frame.pc, Vec::new()))
    }
}

impl UnwindStrategy for ScriptedFrames {
    fn unwind_frame(&mut self, idx: u32, _known: &[FrameInfo]) -> Option<FrameInfo> {
        self.frames.borrow().get(idx as usize).copied()
    }

    fn register_context_for_frame(&mut self, frame: FrameInfo) -> ExecResult<Registers> {
        Ok(Registers::new(frame.pc, Vec::new()))
    }
}

pub fn set_frames(handle: &Rc<RefCell<Vec<FrameInfo>>>, frames: Vec<FrameInfo>) {
    *handle.borrow_mut() = frames;
}
