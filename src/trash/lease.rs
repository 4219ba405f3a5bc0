use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;


struct Lease {
    token: Uuid,
    taken_at: Instant,
}


/// One holder per trash record id. Expired leases may be taken over.
#[derive(Clone)]
pub struct LeaseTable {
    leases: Arc<Mutex<HashMap<String, Lease>>>,
    ttl: Duration,
}

impl LeaseTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            leases: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn try_acquire(&self, record_id: &str) -> Option<LeaseGuard> {
        let mut leases = self.leases.lock();

        if let Some(existing) = leases.get(record_id) {
            if existing.taken_at.elapsed() < self.ttl {
                debug!("Lease for {} is held", record_id);
                return None;
            }
            warn!(
                "Taking over stale lease for {} (held {:?})",
                record_id,
                existing.taken_at.elapsed()
            );
        }

        let token = Uuid::new_v4();
        leases.insert(
            record_id.to_string(),
            Lease {
                token,
                taken_at: Instant::now(),
            },
        );

        Some(LeaseGuard {
            leases: Arc::clone(&self.leases),
            record_id: record_id.to_string(),
            token,
        })
    }

    pub fn is_held(&self, record_id: &str) -> bool {
        self.leases
            .lock()
            .get(record_id)
            .map(|l| l.taken_at.elapsed() < self.ttl)
            .unwrap_or(false)
    }
}


pub struct LeaseGuard {
    leases: Arc<Mutex<HashMap<String, Lease>>>,
    record_id: String,
    token: Uuid,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        let mut leases = self.leases.lock();
        // a stale lease may have been taken over; only release our own
        if leases.get(&self.record_id).map(|l| l.token) == Some(self.token) {
            leases.remove(&self.record_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_until_dropped() {
        let table = LeaseTable::new(Duration::from_secs(60));
        let guard = table.try_acquire("r1").unwrap();
        assert!(table.try_acquire("r1").is_none());
        assert!(table.try_acquire("r2").is_some());
        drop(guard);
        assert!(!table.is_held("r1"));
        assert!(table.try_acquire("r1").is_some());
    }

    #[test]
    fn test_stale_lease_taken_over() {
        let table = LeaseTable::new(Duration::from_millis(0));
        let stale = table.try_acquire("r1").unwrap();
        let fresh = table.try_acquire("r1");
        assert!(fresh.is_some());
        drop(stale);
        // the stale guard must not release the new holder's lease
        let leases = table.leases.lock();
        assert!(leases.contains_key("r1"));
    }
}
