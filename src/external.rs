//! Trait contracts consumed from external collaborators.
//!
//! Everything in this module is a seam, not an implementation: DWARF
//! parsing, symbol lookup, the expression compiler, and OS-specific process
//! monitors live outside this crate entirely. The execution-control core
//! only ever talks to them through these traits, which keeps the core
//! testable against hand-written fakes (see `tests/support/fake_process.rs`)
//! rather than needing real hardware to drive it against.

use crate::error::ExecResult;
use crate::registers::Registers;
use crate::thread_id::ThreadId;

/// An address in the target's address space.
pub type Addr = u64;

/// What the native layer reported at the most recent `wait_for_stop`.
#[derive(Clone, Debug)]
pub struct NativeStopEvent {
    pub thread: ThreadId,
    pub pc: Addr,
    pub signal_number: Option<i32>,
    pub is_single_step_trap: bool,
    pub exited: bool,
}

/// How a thread should be resumed, per-thread, in one `resume` call.
#[derive(Clone, Debug)]
pub struct ThreadResumeAction {
    pub thread: ThreadId,
    pub step: bool,
    pub deliver_signal: Option<i32>,
}

/// The OS-specific process monitor (ptrace/Mach, depending on platform);
/// out of scope for this crate beyond this contract.
pub trait NativeProcessController {
    fn launch(&mut self, path: &str, args: &[String]) -> ExecResult<()>;
    fn attach(&mut self, pid: u32) -> ExecResult<()>;
    fn resume(&mut self, actions: &[ThreadResumeAction]) -> ExecResult<()>;
    fn halt(&mut self) -> ExecResult<()>;
    fn read_memory(&mut self, thread: ThreadId, addr: Addr, buf: &mut [u8]) -> ExecResult<()>;
    fn write_memory(&mut self, thread: ThreadId, addr: Addr, buf: &[u8]) -> ExecResult<()>;
    fn read_registers(&mut self, thread: ThreadId) -> ExecResult<Registers>;
    fn write_registers(&mut self, thread: ThreadId, registers: &Registers) -> ExecResult<()>;
    fn wait_for_stop(&mut self) -> ExecResult<NativeStopEvent>;
}

/// A breakpoint site, shared between plans and the target.
#[derive(Clone, Debug)]
pub struct BreakpointSite {
    pub id: crate::stop_info::SiteId,
    pub addr: Addr,
    pub enabled: bool,
    pub thread_spec: Option<crate::thread_spec::ThreadSpec>,
}

pub trait BreakpointRegistry {
    fn find_site(&self, addr: Addr) -> Option<BreakpointSite>;
    fn install(
        &mut self,
        addr: Addr,
        thread_spec: Option<crate::thread_spec::ThreadSpec>,
    ) -> ExecResult<crate::stop_info::SiteId>;
    fn enable(&mut self, site: crate::stop_info::SiteId) -> ExecResult<()>;
    fn disable(&mut self, site: crate::stop_info::SiteId) -> ExecResult<()>;
    fn remove(&mut self, site: crate::stop_info::SiteId) -> ExecResult<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    pub frame_low: Addr,
    pub frame_high: Addr,
}

/// Purely read-only symbol/debug-info lookups.
pub trait SymbolResolver {
    fn function_for_address(&self, addr: Addr) -> Option<FunctionInfo>;
    fn line_for_address(&self, addr: Addr) -> Option<(String, u32)>;
    fn return_type_of(&self, function: &FunctionInfo) -> Option<String>;

    /// True when `addr` falls inside a function with no line table, the
    /// condition `StepInRange`'s `avoid-no-debug` flag reacts to.
    fn has_no_debug_info(&self, addr: Addr) -> bool {
        self.line_for_address(addr).is_none()
    }
}

/// An optional per-plan tracer, e.g. for single-step logging.
pub trait Tracer {
    fn on_resume(&mut self, thread: ThreadId);
    /// Returns true if the tracer itself explains (consumes) the stop.
    fn on_stop(&mut self, thread: ThreadId) -> bool;
    fn log(&mut self, thread: ThreadId, frame_pc: Addr);
}
