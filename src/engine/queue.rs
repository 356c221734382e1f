// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::types::{TaskName, TriggerWhileRunningBehaviour};

/// Triggers that arrived while their task was still running.
///
/// Semantics:
/// - `Queue`: a task has at most one pending rerun. Any number of triggers
///   during one run coalesce into that single rerun.
/// - `Skip`: triggers for a running task are dropped.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    pending: BTreeSet<TaskName>,
}

impl TriggerQueue {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            behaviour,
            pending: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_pending(&self, task: TaskName) -> bool {
        self.pending.contains(&task)
    }

    /// Record a trigger for a running task. Returns whether a rerun is now
    /// pending for it.
    pub fn record_trigger(&mut self, task: TaskName) -> bool {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                let fresh = self.pending.insert(task);
                debug!(%task, coalesced = !fresh, "queued rerun");
                true
            }
            TriggerWhileRunningBehaviour::Skip => {
                debug!(%task, "task is running, trigger skipped");
                false
            }
        }
    }

    /// Remove and return whether `task` had a pending rerun.
    pub fn take(&mut self, task: TaskName) -> bool {
        self.pending.remove(&task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_coalesces_into_one_rerun() {
        let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue);
        assert!(queue.record_trigger(TaskName::Styles));
        assert!(queue.record_trigger(TaskName::Styles));
        assert!(queue.take(TaskName::Styles));
        assert!(!queue.take(TaskName::Styles));
        assert!(queue.is_empty());
    }

    #[test]
    fn skip_drops_triggers() {
        let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Skip);
        assert!(!queue.record_trigger(TaskName::Scripts));
        assert!(!queue.is_pending(TaskName::Scripts));
        assert!(queue.is_empty());
    }
}
