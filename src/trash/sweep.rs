use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use crate::core::{Result, TrashError};

use super::manager::TrashManager;


#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub cleared: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Past the attempt budget; needs an operator.
    pub exhausted: Vec<String>,
    /// Held by another worker.
    pub busy: Vec<String>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.exhausted.is_empty()
    }
}


/// Drains `clearing` records through a bounded pool of workers. Records
/// spawned by a cascade are queued behind the current ones and handled in
/// the same pass.
pub struct Sweeper {
    manager: Arc<TrashManager>,
    semaphore: Arc<Semaphore>,
}

impl Sweeper {
    pub fn new(manager: Arc<TrashManager>, workers: usize) -> Self {
        info!("Sweeper initialized: workers={}", workers.max(1));
        Self {
            manager,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        for record in self.manager.list_clearing().await? {
            seen.insert(record.id.clone());
            if record.attempts > self.manager.max_attempts() {
                report.exhausted.push(record.id);
            } else {
                queue.push_back(record.id);
            }
        }
        debug!(
            "Sweep started: {} queued, {} exhausted",
            queue.len(),
            report.exhausted.len()
        );

        while !queue.is_empty() {
            let mut handles = Vec::with_capacity(queue.len());

            for record_id in queue.drain(..) {
                let manager = Arc::clone(&self.manager);
                let semaphore = Arc::clone(&self.semaphore);

                handles.push((
                    record_id.clone(),
                    tokio::spawn(async move {
                        let _permit = semaphore
                            .acquire_owned()
                            .await
                            .map_err(|e| TrashError::WorkerPool(e.to_string()))?;
                        manager.clear(&record_id).await
                    }),
                ));
            }

            for (record_id, handle) in handles {
                match handle.await {
                    Ok(Ok(outcome)) => {
                        report.cleared.push(record_id);
                        for child in outcome.spawned {
                            if seen.insert(child.clone()) {
                                queue.push_back(child);
                            }
                        }
                    }
                    Ok(Err(TrashError::AttemptsExceeded)) => report.exhausted.push(record_id),
                    Ok(Err(TrashError::Leased(_))) => report.busy.push(record_id),
                    Ok(Err(e)) if e.is_fatal() => {
                        warn!("Record {} needs an operator: {}", record_id, e);
                        report.failed.push((record_id, e.to_string()));
                    }
                    Ok(Err(e)) => report.failed.push((record_id, e.to_string())),
                    Err(e) => {
                        error!("Clear task for {} panicked: {}", record_id, e);
                        report.failed.push((record_id, format!("Task panic: {}", e)));
                    }
                }
            }
        }

        if report.is_clean() {
            info!("Sweep complete: {} cleared", report.cleared.len());
        } else {
            warn!(
                "Sweep complete: {} cleared, {} failed, {} exhausted",
                report.cleared.len(),
                report.failed.len(),
                report.exhausted.len()
            );
        }
        Ok(report)
    }

    /// Sweeps every `interval` until `shutdown` flips to true.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!("Sweep failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Sweeper stopping");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TrashConfig;
    use crate::db::InMemoryStore;
    use crate::trash::{TrashRecord, TrashStage, TrashTarget};

    #[tokio::test]
    async fn test_closed_pool_reports_worker_failure() {
        let manager = TrashManager::new(Arc::new(InMemoryStore::new()), &TrashConfig::default());
        let mut record = TrashRecord::new(TrashTarget::Question("q1".into()), "c1", "t1");
        record.stage = TrashStage::Clearing;
        manager.repository().save(&record).await.unwrap();

        let sweeper = Sweeper::new(Arc::new(manager), 2);
        sweeper.semaphore.close();
        let report = sweeper.sweep_once().await.unwrap();

        assert!(report.cleared.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, record.id);
        assert!(report.failed[0].1.starts_with("Worker pool error"));
    }
}
