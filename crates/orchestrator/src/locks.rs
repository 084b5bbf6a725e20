//! Per-contact serialization of inbound messages.
//!
//! Two loops for the same contact could both see a slot as free and race
//! to book it, so messages for one contact are handled one at a time.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use tokio::sync::Mutex as AsyncMutex;

/// Default maximum number of contacts tracked before LRU eviction.
const DEFAULT_MAX_CONTACTS: usize = 10000;

type ContactKey = (i64, String);

/// Async locks keyed by (tenant, phone) with LRU eviction.
///
/// Only idle locks are evicted, so a contact with a message in flight keeps
/// its lock even when the map is over capacity.
#[derive(Debug)]
pub struct ContactLocks {
    /// Uses IndexMap insertion order as recency order.
    locks: Mutex<IndexMap<ContactKey, Arc<AsyncMutex<()>>>>,
    max_contacts: usize,
}

impl Default for ContactLocks {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_CONTACTS)
    }
}

impl ContactLocks {
    pub fn with_capacity(max_contacts: usize) -> Self {
        Self {
            locks: Mutex::new(IndexMap::new()),
            max_contacts: max_contacts.max(1),
        }
    }

    /// The lock for a contact, marking it most recently used.
    pub fn lock_for(&self, tenant_id: i64, phone: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let key = (tenant_id, phone.to_string());
        let lock = locks
            .shift_remove(&key)
            .unwrap_or_else(|| Arc::new(AsyncMutex::new(())));
        locks.insert(key, lock.clone());

        while locks.len() > self.max_contacts {
            // Oldest idle entry; the map is the only other holder.
            let idle = locks
                .values()
                .position(|candidate| Arc::strong_count(candidate) == 1);
            match idle {
                Some(index) => {
                    locks.shift_remove_index(index);
                }
                None => break,
            }
        }

        lock
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
