use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::core::{Event, EventBus, Result, TrashConfig, TrashError, TrashEventKind};
use crate::db::{DocumentStore, Filter, Repository};

use super::cascade::CascadeExecutor;
use super::lease::{LeaseGuard, LeaseTable};
use super::models::{ClearOutcome, ClearingRequestReport, RestoreOutcome, TrashRecord, TrashStage, Trashable};
use super::planner::CascadePlanner;
use super::restore::RestoreResolver;


pub struct TrashManager {
    repo: Repository,
    planner: CascadePlanner,
    executor: CascadeExecutor,
    resolver: RestoreResolver,
    leases: LeaseTable,
    events: Option<Arc<EventBus>>,
    max_attempts: u32,
}

impl TrashManager {
    pub fn new(store: Arc<dyn DocumentStore>, config: &TrashConfig) -> Self {
        let repo = Repository::new(store);
        info!(
            "Initializing TrashManager (max_attempts={}, lease_ttl={:?})",
            config.max_attempts,
            config.lease_ttl()
        );
        Self {
            planner: CascadePlanner::new(repo.clone()),
            executor: CascadeExecutor::new(repo.clone()),
            resolver: RestoreResolver::new(repo.clone()),
            leases: LeaseTable::new(config.lease_ttl()),
            events: None,
            max_attempts: config.max_attempts,
            repo,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }


    /// Marks the entity as trashed and opens a record for it at `initial`.
    pub async fn soft_delete<T: Trashable>(&self, entity: &mut T, company_id: &str, team_id: &str) -> Result<TrashRecord> {
        if entity.in_trash() {
            warn!("{} is already in trash", entity.trash_target());
            return Err(TrashError::Stage);
        }

        entity.set_in_trash(true);
        self.repo.update(&*entity).await?;

        let record = TrashRecord::new(entity.trash_target(), company_id, team_id);
        self.repo.save(&record).await?;

        info!("Soft deleted {} into record {}", record.target, record.id);
        self.notify(TrashEventKind::Created, &record).await;
        Ok(record)
    }


    pub async fn request_clearing(&self, record_ids: &[String]) -> Result<ClearingRequestReport> {
        let mut report = ClearingRequestReport::default();

        for id in record_ids {
            let Some(_lease) = self.leases.try_acquire(id) else {
                debug!("Record {} is being processed, not rescheduling", id);
                report.busy.push(id.clone());
                continue;
            };
            let Some(mut record) = self.repo.get::<TrashRecord>(id).await? else {
                warn!("Clearing requested for unknown record {}", id);
                report.missing.push(id.clone());
                continue;
            };

            match record.stage {
                TrashStage::Initial => {
                    record.stage = TrashStage::Clearing;
                    record.attempts = 0;
                    record.touch();
                    self.repo.update(&record).await?;
                    self.notify(TrashEventKind::ClearingRequested, &record).await;
                    report.scheduled.push(record.id);
                }
                TrashStage::Clearing => {
                    debug!("Record {} is already clearing", id);
                    report.already_clearing.push(record.id);
                }
            }
        }

        info!(
            "Clearing requested: {} scheduled, {} already clearing, {} missing, {} busy",
            report.scheduled.len(),
            report.already_clearing.len(),
            report.missing.len(),
            report.busy.len()
        );
        Ok(report)
    }


    /// Runs the cascade for a record in `clearing` and removes the record.
    /// A failure inside the cascade bumps `attempts` and is returned as is.
    pub async fn clear(&self, record_id: &str) -> Result<ClearOutcome> {
        // stage and budget are only trusted when read under the lease
        let _lease = self.lease(record_id)?;
        let record = self.load(record_id).await?;
        ensure_stage(&record, TrashStage::Clearing)?;
        if record.attempts > self.max_attempts {
            warn!("Record {} exhausted {} attempts", record.id, record.attempts);
            return Err(TrashError::AttemptsExceeded);
        }

        match self.run_cascade(&record).await {
            Ok(outcome) => {
                self.repo.delete::<TrashRecord>(&record.id).await?;
                info!(
                    "Cleared {} (record {}, {} spawned, {} rewritten, {} rows removed)",
                    record.target,
                    record.id,
                    outcome.spawned.len(),
                    outcome.rewritten_items,
                    outcome.hard_deleted
                );
                self.notify(TrashEventKind::Cleared, &record).await;
                Ok(outcome)
            }
            Err(e) => {
                error!("Clearing {} failed (attempt {}): {}", record.target, record.attempts + 1, e);
                self.record_failure(record).await;
                Err(e)
            }
        }
    }

    async fn run_cascade(&self, record: &TrashRecord) -> Result<ClearOutcome> {
        let plan = self.planner.plan(record).await?;
        let summary = self.executor.execute(&plan, record).await?;
        Ok(ClearOutcome {
            record_id: record.id.clone(),
            target: record.target.to_string(),
            spawned: summary.spawned,
            rewritten_items: summary.rewritten_items,
            hard_deleted: summary.hard_deleted,
        })
    }

    async fn record_failure(&self, mut record: TrashRecord) {
        // re-read in case the cascade touched it
        if let Ok(Some(current)) = self.repo.get::<TrashRecord>(&record.id).await {
            record = current;
        }
        record.attempts += 1;
        record.touch();
        if let Err(e) = self.repo.update(&record).await {
            error!("Could not record failed attempt on {}: {}", record.id, e);
        }
        self.notify(TrashEventKind::ClearFailed, &record).await;
    }


    /// Reverses a soft delete for a record still at `initial`.
    pub async fn restore(&self, record_id: &str) -> Result<RestoreOutcome> {
        let _lease = self.lease(record_id)?;
        let record = self.load(record_id).await?;
        ensure_stage(&record, TrashStage::Initial)?;

        let reassigned_section = self.resolver.restore(&record.target).await?;
        self.repo.delete::<TrashRecord>(&record.id).await?;

        info!("Restored {} (record {})", record.target, record.id);
        self.notify(TrashEventKind::Restored, &record).await;
        Ok(RestoreOutcome {
            record_id: record.id,
            target: record.target.to_string(),
            reassigned_section,
        })
    }


    pub async fn list_clearing(&self) -> Result<Vec<TrashRecord>> {
        Ok(self.repo.find(&Filter::by("stage", "clearing")).await?)
    }

    pub async fn children(&self, parent_id: &str) -> Result<Vec<TrashRecord>> {
        Ok(self.repo.find_by("parentRecord", parent_id).await?)
    }

    async fn load(&self, record_id: &str) -> Result<TrashRecord> {
        self.repo
            .get::<TrashRecord>(record_id)
            .await?
            .ok_or_else(|| TrashError::NotFound(format!("trash record {}", record_id)))
    }

    fn lease(&self, record_id: &str) -> Result<LeaseGuard> {
        self.leases
            .try_acquire(record_id)
            .ok_or_else(|| TrashError::Leased(record_id.to_string()))
    }

    async fn notify(&self, kind: TrashEventKind, record: &TrashRecord) {
        if let Some(events) = &self.events {
            let payload = json!({
                "type": record.kind().as_str(),
                "target": record.target.id(),
                "stage": record.stage,
                "attempts": record.attempts,
                "parentRecord": record.parent_record,
            });
            events.emit(Event::new(kind, record.id.clone(), payload)).await;
        }
    }
}

fn ensure_stage(record: &TrashRecord, expected: TrashStage) -> Result<()> {
    if record.stage != expected {
        warn!(
            "Record {} is {:?}, expected {:?}",
            record.id, record.stage, expected
        );
        return Err(TrashError::Stage);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::db::{Collection, InMemoryStore, StoreError};
    use crate::survey::{Question, QuestionKind};
    use crate::trash::TrashTarget;

    /// Trash record reads return what was stored at call time, after a delay.
    struct SlowRecordReads {
        inner: InMemoryStore,
        delay: Duration,
    }

    #[async_trait]
    impl DocumentStore for SlowRecordReads {
        async fn get(&self, c: Collection, id: &str) -> std::result::Result<Option<Value>, StoreError> {
            let doc = self.inner.get(c, id).await?;
            if c == Collection::TrashRecords {
                tokio::time::sleep(self.delay).await;
            }
            Ok(doc)
        }
        async fn find(&self, c: Collection, f: &Filter) -> std::result::Result<Vec<Value>, StoreError> {
            self.inner.find(c, f).await
        }
        async fn insert(&self, c: Collection, d: Value) -> std::result::Result<(), StoreError> {
            self.inner.insert(c, d).await
        }
        async fn update(&self, c: Collection, d: Value) -> std::result::Result<(), StoreError> {
            self.inner.update(c, d).await
        }
        async fn delete(&self, c: Collection, id: &str) -> std::result::Result<bool, StoreError> {
            self.inner.delete(c, id).await
        }
        async fn delete_where(&self, c: Collection, f: &Filter) -> std::result::Result<usize, StoreError> {
            self.inner.delete_where(c, f).await
        }
    }

    async fn slow_manager_with_question() -> (TrashManager, TrashRecord) {
        let store = SlowRecordReads {
            inner: InMemoryStore::new(),
            delay: Duration::from_millis(50),
        };
        let manager = TrashManager::new(Arc::new(store), &TrashConfig::default());
        let mut question = Question {
            id: "q1".into(),
            company: "c1".into(),
            team: "t1".into(),
            kind: QuestionKind::Text,
            text: "Why?".into(),
            trend: false,
            in_trash: false,
        };
        manager.repository().save(&question).await.unwrap();
        let record = manager.soft_delete(&mut question, "c1", "t1").await.unwrap();
        (manager, record)
    }

    #[tokio::test]
    async fn test_restore_in_flight_blocks_clearing() {
        let (manager, record) = slow_manager_with_question().await;
        let ids = vec![record.id.clone()];

        let (restored, requested, cleared) = tokio::join!(
            manager.restore(&record.id),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                manager.request_clearing(&ids).await
            },
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                manager.clear(&record.id).await
            },
        );

        assert!(restored.is_ok());
        let requested = requested.unwrap();
        assert!(requested.scheduled.is_empty());
        assert_eq!(requested.busy, ids);
        assert!(matches!(cleared, Err(TrashError::Leased(_))));

        let question: Question = manager.repository().require("q1").await.unwrap();
        assert!(!question.in_trash);
        assert!(manager.repository().get::<TrashRecord>(&record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_clears_run_once() {
        let (manager, record) = slow_manager_with_question().await;
        manager.request_clearing(&[record.id.clone()]).await.unwrap();

        let (a, b) = tokio::join!(manager.clear(&record.id), manager.clear(&record.id));

        assert!(a.is_ok());
        assert!(matches!(b, Err(TrashError::Leased(_))));
        assert!(manager.repository().get::<Question>("q1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_after_restore_finds_no_record() {
        let (manager, record) = slow_manager_with_question().await;
        manager.restore(&record.id).await.unwrap();

        let err = manager.clear(&record.id).await.unwrap_err();
        assert!(matches!(err, TrashError::NotFound(_)));
        assert!(manager.repository().get::<Question>("q1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_refuses_leased_record() {
        let manager = TrashManager::new(Arc::new(InMemoryStore::new()), &TrashConfig::default());
        let mut record = TrashRecord::new(TrashTarget::Question("q1".into()), "c1", "t1");
        record.stage = TrashStage::Clearing;
        manager.repository().save(&record).await.unwrap();

        let held = manager.leases.try_acquire(&record.id).unwrap();
        let err = manager.clear(&record.id).await.unwrap_err();
        assert!(matches!(err, TrashError::Leased(_)));

        drop(held);
        assert!(manager.clear(&record.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_record() {
        let manager = TrashManager::new(Arc::new(InMemoryStore::new()), &TrashConfig::default());
        let err = manager.restore("nope").await.unwrap_err();
        assert!(matches!(err, TrashError::NotFound(_)));
    }
}
