//! Transaction identifier allocation and outstanding-request tracking
//!
//! Identifiers are allocated monotonically and wrap from 0xFFFF to 1; the
//! value 0 is unrepresentable. A request's identifier is outstanding from the
//! moment the request is sent until a response carrying it is processed.
//! When the caller gives up waiting, the identifier is *abandoned*: it stays
//! outstanding, so a late response still counts as correlated, but the
//! number of abandoned identifiers is bounded and the oldest is evicted
//! first.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::num::NonZeroU16;
use tokio::sync::oneshot;
use tracing::debug;

/// A transaction identifier as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(NonZeroU16);

impl TransactionId {
    /// `None` for 0, which is never allocated
    pub fn new(raw: u16) -> Option<Self> {
        NonZeroU16::new(raw).map(Self)
    }

    pub fn get(self) -> u16 {
        self.0.get()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0.get())
    }
}

/// Lifecycle of an outstanding identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Request sent, caller waiting
    Sent,
    /// Caller stopped waiting; a late response is still accepted
    Abandoned,
}

enum Entry {
    Sent(oneshot::Sender<()>),
    Abandoned,
}

/// Allocates identifiers and tracks which ones await a response
pub struct TransactionRegistry {
    last: Option<NonZeroU16>,
    outstanding: HashMap<u16, Entry>,
    abandoned: VecDeque<u16>,
    max_abandoned: usize,
}

impl TransactionRegistry {
    pub fn new(max_abandoned: usize) -> Self {
        Self {
            last: None,
            outstanding: HashMap::new(),
            abandoned: VecDeque::new(),
            max_abandoned,
        }
    }

    /// Continue allocation after `last`
    pub fn resume_after(mut self, last: TransactionId) -> Self {
        self.last = Some(last.0);
        self
    }

    /// Allocate the next identifier, wrapping to 1 after 0xFFFF
    pub fn allocate(&mut self) -> TransactionId {
        let next = match self.last {
            Some(last) => last.checked_add(1).unwrap_or(NonZeroU16::MIN),
            None => NonZeroU16::MIN,
        };
        self.last = Some(next);
        TransactionId(next)
    }

    /// Mark `id` outstanding; the receiver resolves when it is cleared
    pub fn mark_outstanding(&mut self, id: TransactionId) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if let Some(Entry::Abandoned) = self.outstanding.insert(id.get(), Entry::Sent(tx)) {
            self.abandoned.retain(|raw| *raw != id.get());
        }
        rx
    }

    pub fn is_outstanding(&self, raw: u16) -> bool {
        self.outstanding.contains_key(&raw)
    }

    pub fn state(&self, raw: u16) -> Option<TransactionState> {
        self.outstanding.get(&raw).map(|entry| match entry {
            Entry::Sent(_) => TransactionState::Sent,
            Entry::Abandoned => TransactionState::Abandoned,
        })
    }

    /// Remove `raw` from the outstanding set and wake its waiter
    ///
    /// Returns false if it was not outstanding.
    pub fn clear(&mut self, raw: u16) -> bool {
        match self.outstanding.remove(&raw) {
            Some(Entry::Sent(waiter)) => {
                let _ = waiter.send(());
                true
            }
            Some(Entry::Abandoned) => {
                self.abandoned.retain(|id| *id != raw);
                true
            }
            None => false,
        }
    }

    /// Stop waiting for `id` without forgetting it
    ///
    /// Returns false if the identifier was cleared in the meantime.
    pub fn abandon(&mut self, id: TransactionId) -> bool {
        let raw = id.get();
        match self.outstanding.get_mut(&raw) {
            Some(Entry::Abandoned) => return true,
            Some(entry) => {
                *entry = Entry::Abandoned;
                self.abandoned.push_back(raw);
            }
            None => return false,
        }

        while self.abandoned.len() > self.max_abandoned {
            if let Some(oldest) = self.abandoned.pop_front() {
                self.outstanding.remove(&oldest);
                debug!("Evicted abandoned transaction {:#06x}", oldest);
            }
        }
        true
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }

    pub fn abandoned_count(&self) -> usize {
        self.abandoned.len()
    }
}

impl Default for TransactionRegistry {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_starts_at_one() {
        let mut registry = TransactionRegistry::default();
        assert_eq!(registry.allocate().get(), 1);
        assert_eq!(registry.allocate().get(), 2);
        assert_eq!(registry.allocate().get(), 3);
    }

    #[test]
    fn test_allocation_wraps_to_one() {
        let last = TransactionId::new(0xFFFE).unwrap();
        let mut registry = TransactionRegistry::default().resume_after(last);
        assert_eq!(registry.allocate().get(), 0xFFFF);
        assert_eq!(registry.allocate().get(), 1);
        assert_eq!(registry.allocate().get(), 2);
    }

    #[test]
    fn test_allocation_never_zero() {
        let mut registry = TransactionRegistry::default();
        for _ in 0..(u16::MAX as u32 * 2 + 10) {
            assert_ne!(registry.allocate().get(), 0);
        }
        assert!(TransactionId::new(0).is_none());
    }

    #[test]
    fn test_outstanding_lifecycle() {
        let mut registry = TransactionRegistry::default();
        let id = registry.allocate();
        let mut waiter = registry.mark_outstanding(id);

        assert!(registry.is_outstanding(id.get()));
        assert_eq!(registry.state(id.get()), Some(TransactionState::Sent));
        assert!(waiter.try_recv().is_err());

        assert!(registry.clear(id.get()));
        assert!(!registry.is_outstanding(id.get()));
        assert!(waiter.try_recv().is_ok());

        // Duplicate response
        assert!(!registry.clear(id.get()));
    }

    #[test]
    fn test_abandoned_stays_outstanding() {
        let mut registry = TransactionRegistry::default();
        let id = registry.allocate();
        let _waiter = registry.mark_outstanding(id);

        assert!(registry.abandon(id));
        assert!(registry.is_outstanding(id.get()));
        assert_eq!(registry.state(id.get()), Some(TransactionState::Abandoned));
        assert_eq!(registry.abandoned_count(), 1);

        // A late response still clears it
        assert!(registry.clear(id.get()));
        assert_eq!(registry.abandoned_count(), 0);
        assert_eq!(registry.outstanding_count(), 0);
    }

    #[test]
    fn test_abandon_after_clear() {
        let mut registry = TransactionRegistry::default();
        let id = registry.allocate();
        let _waiter = registry.mark_outstanding(id);
        registry.clear(id.get());

        assert!(!registry.abandon(id));
        assert_eq!(registry.abandoned_count(), 0);
    }

    #[test]
    fn test_abandoned_bound_evicts_oldest() {
        let mut registry = TransactionRegistry::new(2);
        let ids: Vec<TransactionId> = (0..3).map(|_| registry.allocate()).collect();
        let _waiters: Vec<_> = ids.iter().map(|id| registry.mark_outstanding(*id)).collect();

        for id in &ids {
            registry.abandon(*id);
        }

        assert!(!registry.is_outstanding(ids[0].get()));
        assert!(registry.is_outstanding(ids[1].get()));
        assert!(registry.is_outstanding(ids[2].get()));
        assert_eq!(registry.abandoned_count(), 2);
    }

    #[test]
    fn test_reuse_replaces_abandoned_entry() {
        let mut registry = TransactionRegistry::new(1);
        let id = registry.allocate();
        let _old = registry.mark_outstanding(id);
        registry.abandon(id);

        // Same identifier handed out again after wrap-around
        let _new = registry.mark_outstanding(id);
        assert_eq!(registry.state(id.get()), Some(TransactionState::Sent));
        assert_eq!(registry.abandoned_count(), 0);

        let other = registry.allocate();
        let _other_waiter = registry.mark_outstanding(other);
        registry.abandon(other);

        // The fresh request is not a victim of eviction
        assert_eq!(registry.state(id.get()), Some(TransactionState::Sent));
    }
}
