//! Aggregates per-thread stop/report decisions into a process-level vote.
//!
//! `ProcessStopCoordinator` itself holds no per-thread state — each
//! `Thread` already owns everything it needs (`ThreadPlanStack`, `Unwind`,
//! its own StopInfo) — it is purely the OR-reduction: the process halts iff
//! at least one thread votes stop.

use crate::plan::Vote;
use crate::thread_id::ThreadId;

/// One thread's arbitration result for the current stop: the `(stop_here,
/// report_vote)` pair, with the owning thread attached so the coordinator
/// can build the stop event's `per_thread` map.
#[derive(Clone, Debug)]
pub struct ThreadStopDecision {
    pub thread: ThreadId,
    pub stop_here: bool,
    pub report_vote: Vote,
}

/// A stop event carries `(process_state, per_thread(stop_info,
/// report_vote))`. `process_state` here is reduced to the boolean the core
/// actually decides (whether the process halts); a richer state enum
/// (running/stopped/exited) belongs to whatever owns the
/// `NativeProcessController` on the other side.
#[derive(Clone, Debug)]
pub struct ProcessStopEvent {
    pub should_halt: bool,
    pub report_vote: Vote,
    pub per_thread: Vec<ThreadStopDecision>,
}

pub struct ProcessStopCoordinator;

impl ProcessStopCoordinator {
    /// OR-reduce `stop_here` across threads and combine report votes the
    /// same way a single thread combines them across its own plan stack
    /// (`Vote::combine`, applied at the process scope instead of the
    /// plan-stack scope).
    pub fn aggregate(decisions: Vec<ThreadStopDecision>) -> ProcessStopEvent {
        let should_halt = decisions.iter().any(|d| d.stop_here);
        let report_vote = decisions
            .iter()
            .fold(Vote::NoOpinion, |acc, d| acc.combine(d.report_vote));
        ProcessStopEvent {
            should_halt,
            report_vote,
            per_thread: decisions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(id: u64, stop: bool, vote: Vote) -> ThreadStopDecision {
        ThreadStopDecision {
            thread: ThreadId::new(id),
            stop_here: stop,
            report_vote: vote,
        }
    }

    #[test]
    fn process_stops_if_any_thread_votes_stop() {
        let event = ProcessStopCoordinator::aggregate(vec![
            decision(1, false, Vote::NoOpinion),
            decision(2, true, Vote::Yes),
        ]);
        assert!(event.should_halt);
        assert_eq!(event.report_vote, Vote::Yes);
    }

    #[test]
    fn process_continues_if_no_thread_votes_stop() {
        let event = ProcessStopCoordinator::aggregate(vec![
            decision(1, false, Vote::NoOpinion),
            decision(2, false, Vote::No),
        ]);
        assert!(!event.should_halt);
    }

    #[test]
    fn thread_spec_filtered_breakpoint_still_halts_process() {
        // Thread 2's spec-matched breakpoint stops, thread 1's
        // spec-mismatched one doesn't; the process halts anyway.
        let event = ProcessStopCoordinator::aggregate(vec![
            decision(1, false, Vote::No),
            decision(2, true, Vote::Yes),
        ]);
        assert!(event.should_halt);
    }
}
