//! Per-phone serialization of message handling

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// One async lock per phone number. Entries are dropped once nobody holds
/// or waits on them, so the map only grows with concurrent senders.
#[derive(Default)]
pub struct PhoneLocks {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl PhoneLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other message for `phone` is being handled.
    pub async fn acquire(&self, phone: &str) -> PhoneGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(phone.to_string()).or_default())
        };
        let guard = Arc::clone(&slot).lock_owned().await;
        PhoneGuard {
            phone: phone.to_string(),
            slot,
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Phones with a live lock entry
    #[cfg(test)]
    pub fn live_entries(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub struct PhoneGuard {
    phone: String,
    slot: Slot,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PhoneGuard {
    fn drop(&mut self) {
        // Release first so the strong count reflects only waiters
        drop(self.guard.take());
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Map entry plus our own handle
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.phone);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_phone_is_serialized() {
        let locks = Arc::new(PhoneLocks::new());
        let inside = Arc::new(AtomicU32::new(0));
        let max_inside = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("+491").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.live_entries(), 0);
    }

    #[tokio::test]
    async fn different_phones_do_not_block() {
        let locks = PhoneLocks::new();
        let _a = locks.acquire("+491").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("+492")).await;
        assert!(b.is_ok());
        assert_eq!(locks.live_entries(), 2);
    }

    #[tokio::test]
    async fn entry_is_removed_after_release() {
        let locks = PhoneLocks::new();
        {
            let _guard = locks.acquire("+491").await;
            assert_eq!(locks.live_entries(), 1);
        }
        assert_eq!(locks.live_entries(), 0);
    }
}
