//! Cancellable one-shot timers driven by an external millisecond clock.
//!
//! Nothing here sleeps. The owner advances its own clock and asks for the
//! entries that have come due, so the queue works the same under a tokio
//! interval on the host and under plain loops in tests.

use serde::{Deserialize, Serialize};

/// Identifies one scheduled entry. Handles are never reused by a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Entry<K> {
    handle: TimerHandle,
    key: K,
    due_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DeferredQueue<K> {
    entries: Vec<Entry<K>>,
    next_handle: u64,
}

impl<K> Default for DeferredQueue<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_handle: 1,
        }
    }
}

impl<K: PartialEq + Clone> DeferredQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `key` to come due at `now_ms + delay_ms`.
    ///
    /// Any entry already pending for the same key is replaced.
    pub fn schedule(&mut self, key: K, now_ms: u64, delay_ms: u64) -> TimerHandle {
        self.cancel(&key);

        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push(Entry {
            handle,
            key,
            due_ms: now_ms.saturating_add(delay_ms),
        });
        handle
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.key != key);
        self.entries.len() != before
    }

    pub fn cancel_handle(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes and returns every entry due at or before `now_ms`, earliest first.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<(TimerHandle, K)> {
        let mut due: Vec<Entry<K>> = Vec::new();
        let mut pending = Vec::with_capacity(self.entries.len());

        for entry in self.entries.drain(..) {
            if entry.due_ms <= now_ms {
                due.push(entry);
            } else {
                pending.push(entry);
            }
        }
        self.entries = pending;

        due.sort_by_key(|entry| (entry.due_ms, entry.handle.0));
        due.into_iter()
            .map(|entry| (entry.handle, entry.key))
            .collect()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.entries.iter().any(|entry| &entry.key == key)
    }

    pub fn next_due(&self) -> Option<u64> {
        self.entries.iter().map(|entry| entry.due_ms).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
