//! Thread-scoped, mutex-protected call-frame enumerator.
//!
//! Grounded on LLDB's `Unwind` (`include/lldb/Target/Unwind.h`): a small,
//! pluggable operation set (`DoClear`/`DoGetFrameCount`/
//! `DoGetFrameInfoAtIndex`/`DoCreateRegisterContextForFrame`) each entered
//! through one mutex. The pluggable walker itself (DWARF CFI, frame-pointer
//! chain, ...) is out of this crate's scope; `UnwindStrategy` is the seam a
//! caller plugs a real walker into.

use crate::error::{ExecResult, ResourceError};
use crate::external::Addr;
use crate::registers::Registers;
use parking_lot::Mutex;

/// One materialised frame's identifying data. Frames beyond this are
/// unwound lazily, on demand, as `frame_info` is asked for higher indices.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    pub cfa: Addr,
    pub pc: Addr,
}

/// The pluggable part of unwinding: given what's already been discovered,
/// produce the next frame (or report there isn't one). Implementations are
/// DWARF-CFI walkers, frame-pointer-chain walkers, and the like — all
/// external to this crate.
pub trait UnwindStrategy {
    /// Attempt to discover the frame at `idx`, given the frames already
    /// known (`known` is monotonically growing across a stop, per the
    /// monotonicity invariant below). Returns `None` once there is no frame
    /// at that index (stack exhausted).
    fn unwind_frame(&mut self, idx: u32, known: &[FrameInfo]) -> Option<FrameInfo>;

    fn register_context_for_frame(&mut self, frame: FrameInfo) -> ExecResult<Registers>;
}

struct UnwindState {
    frames: Vec<FrameInfo>,
    exhausted: bool,
}

impl UnwindState {
    fn new() -> UnwindState {
        UnwindState {
            frames: Vec::new(),
            exhausted: false,
        }
    }
}

/// Thread-scoped unwinder. All four operations serialise through a single
/// mutex; the core's own invariants are:
/// - idempotence of `clear`,
/// - monotonicity of `frame_count`/`frame_info` within one stop,
/// - mandatory `clear()` after any register write or resume.
pub struct Unwind<S: UnwindStrategy> {
    strategy: Mutex<(S, UnwindState)>,
}

impl<S: UnwindStrategy> Unwind<S> {
    pub fn new(strategy: S) -> Unwind<S> {
        Unwind {
            strategy: Mutex::new((strategy, UnwindState::new())),
        }
    }

    pub fn clear(&self) {
        let mut guard = self.strategy.lock();
        guard.1 = UnwindState::new();
    }

    /// Ensures frames up to `idx` (inclusive) are discovered, growing the
    /// cache monotonically, and returns how many are now known.
    fn ensure_discovered(guard: &mut (S, UnwindState), idx: u32) {
        let (strategy, state) = guard;
        while !state.exhausted && (state.frames.len() as u32) <= idx {
            match strategy.unwind_frame(state.frames.len() as u32, &state.frames) {
                Some(frame) => state.frames.push(frame),
                None => state.exhausted = true,
            }
        }
    }

    pub fn frame_count(&self) -> u32 {
        let mut guard = self.strategy.lock();
        // Frame count as known so far never decreases within a stop; a
        // caller that wants the *total* count should walk until exhausted.
        if !guard.1.exhausted {
            let mut idx = guard.1.frames.len() as u32;
            loop {
                Self::ensure_discovered(&mut *guard, idx);
                if guard.1.exhausted {
                    break;
                }
                idx += 1;
            }
        }
        guard.1.frames.len() as u32
    }

    pub fn frame_info(&self, idx: u32) -> ExecResult<FrameInfo> {
        let mut guard = self.strategy.lock();
        Self::ensure_discovered(&mut *guard, idx);
        guard
            .1
            .frames
            .get(idx as usize)
            .copied()
            .ok_or_else(|| ResourceError::FrameUnavailable(idx).into())
    }

    pub fn create_register_context(&self, frame: FrameInfo) -> ExecResult<Registers> {
        let mut guard = self.strategy.lock();
        guard
            .0
            .register_context_for_frame(frame)
            .map_err(|_| ResourceError::RegisterContextUnavailable.into())
    }
}

/// Object-safe view onto an [`Unwind`], so plan code (which must stay
/// generic-free for flat runtime dispatch across plan variants) can ask
/// "what's the call stack doing" without depending on the unwinder's
/// strategy type parameter.
pub trait FrameAccess {
    fn frame_count(&self) -> u32;
    fn frame_cfa(&self, idx: u32) -> Option<Addr>;
    fn frame_pc(&self, idx: u32) -> Option<Addr>;
}

/// Object-safe view that additionally exposes the two operations a `Thread`
/// needs to own an unwinder without naming its strategy type parameter:
/// invalidating it on resume, and building a register context for a
/// materialised frame.
pub trait UnwindHandle: FrameAccess {
    fn clear(&self);
    fn create_register_context(&self, frame: FrameInfo) -> ExecResult<Registers>;
}

impl<S: UnwindStrategy> UnwindHandle for Unwind<S> {
    fn clear(&self) {
        Unwind::clear(self)
    }

    fn create_register_context(&self, frame: FrameInfo) -> ExecResult<Registers> {
        Unwind::create_register_context(self, frame)
    }
}

impl<S: UnwindStrategy> FrameAccess for Unwind<S> {
    fn frame_count(&self) -> u32 {
        Unwind::frame_count(self)
    }

    fn frame_cfa(&self, idx: u32) -> Option<Addr> {
        self.frame_info(idx).ok().map(|f| f.cfa)
    }

    fn frame_pc(&self, idx: u32) -> Option<Addr> {
        self.frame_info(idx).ok().map(|f| f.pc)
    }
}
