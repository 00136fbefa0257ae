//! Register snapshots and the checkpoint/restore mechanism.
//!
//! The concrete layout of a register file belongs to `NativeProcessController`
//! (it differs per architecture, and interpreting it is explicitly out of
//! this crate's scope). `Registers` therefore carries the raw bytes opaquely
//! — an architecture-specific `union` of kernel `user_regs_struct`s, say —
//! down to a byte buffer plus the one field the core's own stepping plans
//! legitimately need to read: the program counter.

use crate::error::{ExecResult, ResourceError};
use crate::external::{Addr, NativeProcessController};
use crate::stop_info::StopInfo;
use crate::thread_id::{StopId, ThreadId};

/// Opaque snapshot of a thread's register file, plus the program counter
/// extracted for convenience by whoever implements `NativeProcessController`.
#[derive(Clone, Debug)]
pub struct Registers {
    pub pc: Addr,
    bytes: Box<[u8]>,
}

impl Registers {
    pub fn new(pc: Addr, bytes: Vec<u8>) -> Registers {
        Registers {
            pc,
            bytes: bytes.into_boxed_slice(),
        }
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Opaque handle to "the call stack in effect at save time", used only for
/// equality/identity checks by callers (e.g. "did the stack change under
/// us") — never interpreted by this crate.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct StackId(pub u64);

/// `(stack-id, opaque register bytes)`.
#[derive(Clone, Debug)]
pub struct RegisterCheckpoint {
    pub stack_id: StackId,
    pub registers: Registers,
}

/// `(RegisterCheckpoint, StopInfo at snapshot time, stop-id at snapshot
/// time)`.
#[derive(Clone, Debug)]
pub struct ThreadStateCheckpoint {
    pub registers: RegisterCheckpoint,
    pub stop_info: StopInfo,
    pub stop_id: StopId,
}

impl RegisterCheckpoint {
    /// Captures all register values plus the thread's current top-frame
    /// stack id. Fails with `RegisterAccessFailed` on a partial read; the
    /// thread's state is unaffected by a failed save.
    pub fn save(
        process: &mut dyn NativeProcessController,
        thread: ThreadId,
        top_frame_stack_id: StackId,
    ) -> ExecResult<RegisterCheckpoint> {
        let registers = process
            .read_registers(thread)
            .map_err(|_| ResourceError::RegisterAccessFailed)?;
        Ok(RegisterCheckpoint {
            stack_id: top_frame_stack_id,
            registers,
        })
    }

    /// Writes registers back to the thread. The caller is responsible for
    /// invalidating the unwinder and frame list afterwards: that crosses
    /// into `Thread`'s territory and is done by `Thread::restore_checkpoint`,
    /// not here.
    pub fn restore(
        &self,
        process: &mut dyn NativeProcessController,
        thread: ThreadId,
    ) -> ExecResult<()> {
        process
            .write_registers(thread, &self.registers)
            .map_err(|_| ResourceError::RegisterAccessFailed.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecError;
    use crate::external::{NativeStopEvent, ThreadResumeAction};
    use std::collections::HashMap;

    struct FakeProcess {
        regs: HashMap<u64, Registers>,
        fail_reads: bool,
    }

    impl NativeProcessController for FakeProcess {
        fn launch(&mut self, _path: &str, _args: &[String]) -> ExecResult<()> {
            Ok(())
        }
        fn attach(&mut self, _pid: u32) -> ExecResult<()> {
            Ok(())
        }
        fn resume(&mut self, _actions: &[ThreadResumeAction]) -> ExecResult<()> {
            Ok(())
        }
        fn halt(&mut self) -> ExecResult<()> {
            Ok(())
        }
        fn read_memory(&mut self, _t: ThreadId, _a: u64, _b: &mut [u8]) -> ExecResult<()> {
            Ok(())
        }
        fn write_memory(&mut self, _t: ThreadId, _a: u64, _b: &[u8]) -> ExecResult<()> {
            Ok(())
        }
        fn read_registers(&mut self, thread: ThreadId) -> ExecResult<Registers> {
            if self.fail_reads {
                return Err(ExecError::ResourceUnavailable(
                    ResourceError::RegisterAccessFailed,
                ));
            }
            Ok(self.regs.get(&thread.raw()).cloned().unwrap())
        }
        fn write_registers(&mut self, thread: ThreadId, registers: &Registers) -> ExecResult<()> {
            self.regs.insert(thread.raw(), registers.clone());
            Ok(())
        }
        fn wait_for_stop(&mut self) -> ExecResult<NativeStopEvent> {
            unimplemented!()
        }
    }

    #[test]
    fn save_then_restore_round_trips() {
        let tid = ThreadId::new(1);
        let mut proc = FakeProcess {
            regs: HashMap::new(),
            fail_reads: false,
        };
        proc.regs.insert(1, Registers::new(0x1000, vec![1, 2, 3]));

        let checkpoint = RegisterCheckpoint::save(&mut proc, tid, StackId(0xABCD)).unwrap();
        assert_eq!(checkpoint.stack_id, StackId(0xABCD));

        proc.write_registers(tid, &Registers::new(0x2000, vec![9, 9, 9]))
            .unwrap();

        checkpoint.restore(&mut proc, tid).unwrap();
        let restored = proc.read_registers(tid).unwrap();
        assert_eq!(restored.pc, 0x1000);
        assert_eq!(restored.raw_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn save_failure_leaves_no_checkpoint() {
        let tid = ThreadId::new(1);
        let mut proc = FakeProcess {
            regs: HashMap::new(),
            fail_reads: true,
        };
        let result = RegisterCheckpoint::save(&mut proc, tid, StackId(0));
        assert!(result.is_err());
    }
}
