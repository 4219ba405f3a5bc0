use std::collections::HashSet;

use tracing::debug;

use crate::core::Result;
use crate::db::{Filter, Repository, StoreError};
use crate::survey::{
    ContentItem, GridColumn, GridRow, Question, QuestionItem, QuestionStatistic, Survey, SurveyItem,
    SurveyResult, SurveySection, Team,
};

use super::models::{TrashRecord, TrashStage, TrashTarget, Trashable};
use super::planner::{CascadePlan, CascadeStep};
use super::rewriter::ReferenceRewriter;
use super::team::TeamCascade;


#[derive(Debug, Clone, Default)]
pub struct ExecutionSummary {
    pub spawned: Vec<String>,
    pub rewritten_items: usize,
    pub hard_deleted: usize,
}


/// Runs a [`CascadePlan`] step by step. Every step tolerates rows that are
/// already gone, so a failed run can simply be repeated.
#[derive(Clone)]
pub struct CascadeExecutor {
    repo: Repository,
    rewriter: ReferenceRewriter,
    teams: TeamCascade,
}

impl CascadeExecutor {
    pub fn new(repo: Repository) -> Self {
        Self {
            rewriter: ReferenceRewriter::new(repo.clone()),
            teams: TeamCascade::new(repo.clone()),
            repo,
        }
    }

    pub async fn execute(&self, plan: &CascadePlan, record: &TrashRecord) -> Result<ExecutionSummary> {
        let mut summary = ExecutionSummary::default();

        for step in &plan.steps {
            match step {
                CascadeStep::Spawn(target) => {
                    if let Some(child) = self.spawn(target, record).await? {
                        summary.spawned.push(child);
                    }
                }
                CascadeStep::TrashContent(id) => {
                    if let Some(mut content) = self.repo.get::<ContentItem>(id).await? {
                        content.in_trash = true;
                        self.repo.update(&content).await?;
                    }
                }
                CascadeStep::ReplaceTrendQuestion { question, survey_item } => {
                    let outcome = self.rewriter.replace(question, survey_item).await?;
                    if outcome.clone_id.is_some() {
                        summary.rewritten_items += 1;
                    }
                }
                CascadeStep::RemoveOption { question, option } => {
                    self.remove_option(question, option).await?;
                }
                CascadeStep::RepointUsers { team } => {
                    self.teams.repoint_users(team).await?;
                }
                CascadeStep::HardDelete { collection, filter } => {
                    let removed = self.repo.delete_where(*collection, filter).await?;
                    if removed > 0 {
                        debug!("Removed {} from {} for {}", removed, collection.name(), plan.target);
                    }
                    summary.hard_deleted += removed;
                }
            }
        }

        Ok(summary)
    }

    /// Soft-deletes a child and makes sure it has a record at `clearing`.
    /// A child already in trash keeps its record, which is moved forward.
    async fn spawn(&self, target: &TrashTarget, parent: &TrashRecord) -> Result<Option<String>> {
        if !self.mark_in_trash(target).await? {
            debug!("Child {} of {} is already gone", target, parent.id);
            return Ok(None);
        }

        let kind = target.kind();
        let existing: Vec<TrashRecord> = self
            .repo
            .find(&Filter::by("type", kind.as_str()).and(kind.ref_field(), target.id()))
            .await?;

        if let Some(mut record) = existing.into_iter().next() {
            if record.stage == TrashStage::Initial {
                record.stage = TrashStage::Clearing;
                record.attempts = 0;
                record.parent_record.get_or_insert_with(|| parent.id.clone());
                record.touch();
                self.repo.update(&record).await?;
            }
            return Ok(Some(record.id));
        }

        let child = TrashRecord::spawned(target.clone(), parent);
        self.repo.save(&child).await?;
        debug!("Spawned {} for {} under {}", child.id, target, parent.id);
        Ok(Some(child.id))
    }

    /// Returns false when the target entity does not exist.
    async fn mark_in_trash(&self, target: &TrashTarget) -> Result<bool> {
        match target {
            TrashTarget::Survey(id) | TrashTarget::Template(id) => self.flag::<Survey>(id).await,
            TrashTarget::SurveyItem(id) => self.flag::<SurveyItem>(id).await,
            TrashTarget::SurveySection(id) => self.flag::<SurveySection>(id).await,
            TrashTarget::Question(id) => self.flag::<Question>(id).await,
            TrashTarget::QuestionItem(id) => self.flag::<QuestionItem>(id).await,
            TrashTarget::GridRow(id) => self.flag::<GridRow>(id).await,
            TrashTarget::GridColumn(id) => self.flag::<GridColumn>(id).await,
            TrashTarget::Team(id) => self.flag::<Team>(id).await,
        }
    }

    async fn flag<T: Trashable>(&self, id: &str) -> Result<bool> {
        match self.repo.get::<T>(id).await? {
            Some(mut entity) => {
                if !entity.in_trash() {
                    entity.set_in_trash(true);
                    match self.repo.update(&entity).await {
                        Ok(()) => {}
                        // removed concurrently by another cascade
                        Err(StoreError::NotFound(..)) => return Ok(false),
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops an option from stored answers and statistics of its question.
    async fn remove_option(&self, question: &str, option: &str) -> Result<()> {
        let items: Vec<SurveyItem> = self.repo.find_by("question", question).await?;
        let item_ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
        let surveys: HashSet<&str> = items.iter().map(|i| i.survey.as_str()).collect();

        for survey in surveys {
            let results: Vec<SurveyResult> = self.repo.find_by("survey", survey).await?;
            for mut result in results {
                let mut changed = false;
                for answer in result
                    .answers
                    .iter_mut()
                    .filter(|a| item_ids.contains(a.survey_item.as_str()))
                {
                    changed |= answer.value.remove_option(option);
                }
                if changed {
                    self.repo.update(&result).await?;
                }
            }
        }

        let statistics: Vec<QuestionStatistic> = self.repo.find_by("question", question).await?;
        for mut statistic in statistics {
            if statistic.data.remove_option(option) {
                statistic.sync_db = false;
                self.repo.update(&statistic).await?;
            }
        }

        if items.is_empty() {
            debug!("Option {} belongs to question {} which no survey uses", option, question);
        }
        Ok(())
    }
}
