//! Predicate matching a thread by id, index, name, or queue name.
//!
//! Grounded on LLDB's `ThreadSpec` (`include/lldb/Target/ThreadSpec.h`):
//! a thread spec has only these four fixed fields. Any field left unset
//! matches every thread for that field; a spec with every field unset
//! matches every thread outright.

use crate::thread_id::ThreadId;

/// A thread this spec can be matched against.
///
/// The core never needs more than these four observable properties to filter
/// threads for a breakpoint or a plan; anything else (backtrace, registers)
/// belongs to richer lookups the caller does itself.
pub trait MatchableThread {
    fn id(&self) -> ThreadId;
    fn index(&self) -> u32;
    fn name(&self) -> &str;
    fn queue_name(&self) -> &str;
}

/// Sentinel meaning "index unset": indices are assigned densely starting at
/// 0, so `u32::MAX` can never collide with a real one.
const UNSET_INDEX: u32 = u32::MAX;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThreadSpec {
    id: Option<ThreadId>,
    index: u32,
    name: String,
    queue_name: String,
}

impl ThreadSpec {
    pub fn new() -> ThreadSpec {
        ThreadSpec {
            id: None,
            index: UNSET_INDEX,
            name: String::new(),
            queue_name: String::new(),
        }
    }

    pub fn with_id(mut self, id: ThreadId) -> ThreadSpec {
        self.id = Some(id);
        self
    }

    pub fn with_index(mut self, index: u32) -> ThreadSpec {
        self.index = index;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> ThreadSpec {
        self.name = name.into();
        self
    }

    pub fn with_queue_name(mut self, queue_name: impl Into<String>) -> ThreadSpec {
        self.queue_name = queue_name.into();
        self
    }

    pub fn id(&self) -> Option<ThreadId> {
        self.id
    }

    pub fn index(&self) -> Option<u32> {
        if self.index == UNSET_INDEX {
            None
        } else {
            Some(self.index)
        }
    }

    /// True if at least one field narrows the match (mirrors LLDB's
    /// `HasSpecification`).
    pub fn has_specification(&self) -> bool {
        self.id.is_some()
            || self.index != UNSET_INDEX
            || !self.name.is_empty()
            || !self.queue_name.is_empty()
    }

    fn id_matches(&self, id: ThreadId) -> bool {
        match self.id {
            None => true,
            Some(want) => !id.is_valid() || !want.is_valid() || want == id,
        }
    }

    fn index_matches(&self, index: u32) -> bool {
        self.index == UNSET_INDEX || index == UNSET_INDEX || self.index == index
    }

    fn name_matches(&self, name: &str) -> bool {
        self.name.is_empty() || self.name == name
    }

    fn queue_name_matches(&self, queue_name: &str) -> bool {
        self.queue_name.is_empty() || self.queue_name == queue_name
    }

    /// `(id ∈ {unset, thread.id}) ∧ (index ∈ {unset, thread.index}) ∧
    /// (name ∈ {unset, thread.name}) ∧ (queue ∈ {unset, thread.queue})`
    pub fn matches(&self, thread: &dyn MatchableThread) -> bool {
        self.id_matches(thread.id())
            && self.index_matches(thread.index())
            && self.name_matches(thread.name())
            && self.queue_name_matches(thread.queue_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        id: ThreadId,
        index: u32,
        name: String,
        queue_name: String,
    }

    impl MatchableThread for Fake {
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

    fn fake(id: u64, index: u32, name: &str, queue: &str) -> Fake {
        Fake {
            id: ThreadId::new(id),
            index,
            name: name.to_string(),
            queue_name: queue.to_string(),
        }
    }

    #[test]
    fn empty_spec_matches_everything() {
        let spec = ThreadSpec::new();
        assert!(!spec.has_specification());
        assert!(spec.matches(&fake(1, 0, "main", "")));
        assert!(spec.matches(&fake(99, 7, "worker", "com.example.queue")));
    }

    #[test]
    fn id_filters_exactly() {
        let spec = ThreadSpec::new().with_id(ThreadId::new(42));
        assert!(spec.matches(&fake(42, 0, "", "")));
        assert!(!spec.matches(&fake(43, 0, "", "")));
    }

    #[test]
    fn index_filters_exactly() {
        let spec = ThreadSpec::new().with_index(2);
        assert!(spec.matches(&fake(1, 2, "", "")));
        assert!(!spec.matches(&fake(1, 3, "", "")));
        assert_eq!(spec.index(), Some(2));
        assert_eq!(ThreadSpec::new().index(), None);
    }

    #[test]
    fn name_and_queue_filter_exactly() {
        let spec = ThreadSpec::new()
            .with_name("dispatcher")
            .with_queue_name("com.example.io");
        assert!(spec.matches(&fake(1, 0, "dispatcher", "com.example.io")));
        assert!(!spec.matches(&fake(1, 0, "other", "com.example.io")));
        assert!(!spec.matches(&fake(1, 0, "dispatcher", "com.example.net")));
    }
}
