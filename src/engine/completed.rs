use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use super::registry::InstanceId;

#[derive(Debug, Default)]
struct Inner {
    order: VecDeque<InstanceId>,
    members: HashSet<InstanceId>,
}

/// Recently resolved instances, kept only to recognise late duplicate
/// signals. Once it grows past `capacity` the oldest entries are dropped
/// until half of `capacity` remain.
#[derive(Debug)]
pub struct CompletedInstances {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl CompletedInstances {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn insert(&self, instance_id: InstanceId) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if !inner.members.insert(instance_id) {
            return;
        }
        inner.order.push_back(instance_id);

        if inner.order.len() > self.capacity {
            let keep = self.capacity / 2;
            while inner.order.len() > keep {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.members.remove(&oldest);
                }
            }
            tracing::debug!(kept = keep, "completed instance set truncated");
        }
    }

    pub fn contains(&self, instance_id: &InstanceId) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .members
            .contains(instance_id)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.order.clear();
        inner.members.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_keeps_newest_half() {
        let set = CompletedInstances::new(4);
        let ids: Vec<_> = (0..5).map(|_| InstanceId::new()).collect();
        for id in &ids {
            set.insert(*id);
        }

        assert_eq!(set.len(), 2);
        assert!(!set.contains(&ids[0]));
        assert!(!set.contains(&ids[2]));
        assert!(set.contains(&ids[3]));
        assert!(set.contains(&ids[4]));
    }

    #[test]
    fn reinserting_does_not_grow() {
        let set = CompletedInstances::new(4);
        let id = InstanceId::new();
        set.insert(id);
        set.insert(id);
        assert_eq!(set.len(), 1);
    }
}
