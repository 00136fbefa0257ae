//! Materialised call frames.
//!
//! Frames are produced lazily by the [`crate::unwind::Unwind`] contract and
//! are immutable once created; a `FrameList` is invalidated wholesale when
//! the owning thread's registers are overwritten (checkpoint restore, or any
//! resume). The previous frame list is kept around for one resume so stale
//! queries ("what was frame 0 before I stepped") still answer.

use crate::error::{ExecResult, ResourceError};
use crate::external::Addr;
use crate::unwind::{FrameInfo, UnwindHandle};
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub index: u32,
    pub cfa: Addr,
    pub pc: Addr,
}

/// Snapshot of however many frames have been materialised for one stop.
/// Frames already returned never change identity-by-content within the
/// snapshot, matching the unwinder's monotonicity guarantee.
#[derive(Clone, Default)]
pub struct FrameList {
    frames: Vec<Rc<Frame>>,
}

impl FrameList {
    pub fn new() -> FrameList {
        FrameList { frames: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<Rc<Frame>> {
        self.frames.get(idx).cloned()
    }

    /// Materialise frame `idx` from the unwinder if it isn't cached yet,
    /// returning it either way.
    pub fn ensure(
        &mut self,
        idx: u32,
        unwind: &crate::unwind::Unwind<impl crate::unwind::UnwindStrategy>,
    ) -> ExecResult<Rc<Frame>> {
        while (self.frames.len() as u32) <= idx {
            let next_idx = self.frames.len() as u32;
            let FrameInfo { cfa, pc } = unwind.frame_info(next_idx)?;
            self.frames.push(Rc::new(Frame {
                index: next_idx,
                cfa,
                pc,
            }));
        }
        Ok(self.frames[idx as usize].clone())
    }

    /// As [`FrameList::ensure`], but through the object-safe [`UnwindHandle`]
    /// view so a `Thread` (which owns its unwinder behind a trait object, not
    /// a concrete `Unwind<S>`) can materialise frames without naming `S`.
    pub fn ensure_via_handle(&mut self, idx: u32, unwind: &dyn UnwindHandle) -> ExecResult<Rc<Frame>> {
        while (self.frames.len() as u32) <= idx {
            let next_idx = self.frames.len() as u32;
            let cfa = unwind
                .frame_cfa(next_idx)
                .ok_or(ResourceError::FrameUnavailable(next_idx))?;
            let pc = unwind
                .frame_pc(next_idx)
                .ok_or(ResourceError::FrameUnavailable(next_idx))?;
            self.frames.push(Rc::new(Frame {
                index: next_idx,
                cfa,
                pc,
            }));
        }
        Ok(self.frames[idx as usize].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unwind::{Unwind, UnwindStrategy};

    struct Fixed(Vec<FrameInfo>);
    impl UnwindStrategy for Fixed {
        fn unwind_frame(&mut self, idx: u32, _known: &[FrameInfo]) -> Option<FrameInfo> {
            self.0.get(idx as usize).copied()
        }
        fn register_context_for_frame(
            &mut self,
            _frame: FrameInfo,
        ) -> ExecResult<crate::registers::Registers> {
            unimplemented!()
        }
    }

    #[test]
    fn lazily_materialises_on_demand() {
        let unwind = Unwind::new(Fixed(vec![
            FrameInfo { cfa: 1, pc: 0x10 },
            FrameInfo { cfa: 2, pc: 0x20 },
        ]));
        let mut list = FrameList::new();
        assert!(list.is_empty());
        let f1 = list.ensure(1, &unwind).unwrap();
        assert_eq!(f1.pc, 0x20);
        assert_eq!(list.len(), 2);
    }
}
