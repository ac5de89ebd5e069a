use parking_lot::Mutex;

use crate::common::LOWEST_PRIORITY;

/// One run of equal-priority registrations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Bucket {
    priority: u32,
    count: u32,
}

/// Ordered multiset of the priorities currently waiting for admission.
///
/// Registrations are kept as `(priority, count)` buckets sorted strictly by
/// descending priority. There is never more than one bucket per priority and
/// a bucket is dropped the moment its count reaches zero, so walking from
/// the head always yields strictly decreasing priorities.
///
/// The number of distinct priorities in flight is typically one or two, so
/// every operation is a short walk over a small sorted `Vec` behind a single
/// lock.
#[derive(Debug)]
pub(crate) struct PriorityRegistry {
    buckets: Mutex<Vec<Bucket>>,
}

impl PriorityRegistry {
    pub(crate) fn new() -> Self {
        Self {
            buckets: Mutex::new(Vec::new()),
        }
    }

    /// Record one occurrence of `priority`, keeping buckets ordered by
    /// descending priority.
    pub(crate) fn register(&self, priority: u32) {
        let mut buckets = self.buckets.lock();
        let at = buckets
            .iter()
            .position(|bucket| bucket.priority <= priority)
            .unwrap_or(buckets.len());

        if let Some(bucket) = buckets.get_mut(at)
            && bucket.priority == priority
        {
            bucket.count += 1;
        } else {
            buckets.insert(at, Bucket { priority, count: 1 });
        }
    }

    /// Whether at least one occurrence of `priority` lies within the first
    /// `first` occurrences, walking buckets head-forward.
    ///
    /// `first` is the number of admissions still permitted in the current
    /// cycle; a caller outside that budget has no claim on this cycle.
    pub(crate) fn among_first(&self, priority: u32, first: u32) -> bool {
        let buckets = self.buckets.lock();
        let mut budget = first;
        for bucket in buckets.iter() {
            if bucket.priority == priority {
                return budget > 0;
            }
            budget = budget.saturating_sub(bucket.count);
            if budget == 0 {
                return false;
            }
        }
        false
    }

    /// Remove one occurrence of `priority`, dropping its bucket when the
    /// count reaches zero. Returns whether a removal occurred.
    pub(crate) fn remove_one(&self, priority: u32) -> bool {
        let mut buckets = self.buckets.lock();
        let Some(at) = buckets.iter().position(|bucket| bucket.priority == priority) else {
            return false;
        };

        buckets[at].count -= 1;
        if buckets[at].count == 0 {
            buckets.remove(at);
        }
        true
    }

    /// Whether the highest pending priority is [`LOWEST_PRIORITY`], i.e.
    /// there are no high-priority contenders. Vacuously true when empty.
    pub(crate) fn only_lowest_pending(&self) -> bool {
        self.buckets
            .lock()
            .first()
            .is_none_or(|bucket| bucket.priority == LOWEST_PRIORITY)
    }

    /// Total outstanding registrations.
    pub(crate) fn pending(&self) -> usize {
        self.buckets
            .lock()
            .iter()
            .map(|bucket| bucket.count as usize)
            .sum()
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Vec<(u32, u32)> {
        self.buckets
            .lock()
            .iter()
            .map(|bucket| (bucket.priority, bucket.count))
            .collect()
    }
}
