use tracing::debug;

use crate::core::Result;
use crate::db::{Collection, Filter, Repository};
use crate::survey::{GridColumn, GridRow, Question, QuestionItem, QuestionOption, SurveyItem, SurveyItemType};

use super::models::{TrashRecord, TrashTarget};
use super::team::plan_team;


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    SoftDelete,
    Rewire,
    HardDelete,
}


#[derive(Debug, Clone, PartialEq)]
pub enum CascadeStep {
    /// Soft-delete a child into its own trash record, already at `clearing`.
    Spawn(TrashTarget),
    /// Content items have no trash record of their own.
    TrashContent(String),
    ReplaceTrendQuestion { question: String, survey_item: String },
    RemoveOption { question: String, option: String },
    RepointUsers { team: String },
    HardDelete { collection: Collection, filter: Filter },
}

impl CascadeStep {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Spawn(_) | Self::TrashContent(_) => Phase::SoftDelete,
            Self::ReplaceTrendQuestion { .. } | Self::RemoveOption { .. } | Self::RepointUsers { .. } => {
                Phase::Rewire
            }
            Self::HardDelete { .. } => Phase::HardDelete,
        }
    }

    pub fn hard_delete(collection: Collection, field: &str, value: &str) -> Self {
        Self::HardDelete {
            collection,
            filter: Filter::by(field, value),
        }
    }

    pub fn hard_delete_row(collection: Collection, id: &str) -> Self {
        Self::hard_delete(collection, "id", id)
    }
}


/// Ordered steps for clearing one record: soft deletes first, then
/// rewrites, hard deletes last.
#[derive(Debug, Clone)]
pub struct CascadePlan {
    pub target: TrashTarget,
    pub steps: Vec<CascadeStep>,
}

impl CascadePlan {
    pub fn new(target: TrashTarget, mut steps: Vec<CascadeStep>) -> Self {
        steps.sort_by_key(|s| s.phase());
        Self { target, steps }
    }

    pub fn count(&self, phase: Phase) -> usize {
        self.steps.iter().filter(|s| s.phase() == phase).count()
    }
}


#[derive(Clone)]
pub struct CascadePlanner {
    repo: Repository,
}

impl CascadePlanner {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn plan(&self, record: &TrashRecord) -> Result<CascadePlan> {
        let target = record.target.clone();
        let steps = match &target {
            TrashTarget::Question(id) => self.plan_question(id).await?,
            TrashTarget::SurveyItem(id) => self.plan_survey_item(id).await?,
            TrashTarget::Survey(id) | TrashTarget::Template(id) => self.plan_survey(id).await?,
            TrashTarget::SurveySection(id) => self.plan_section(id).await?,
            TrashTarget::QuestionItem(id) => self.plan_option::<QuestionItem>(id).await?,
            TrashTarget::GridRow(id) => self.plan_option::<GridRow>(id).await?,
            TrashTarget::GridColumn(id) => self.plan_option::<GridColumn>(id).await?,
            TrashTarget::Team(id) => plan_team(&self.repo, id).await?,
        };

        let plan = CascadePlan::new(target, steps);
        debug!(
            "Planned {} for record {}: {} soft, {} rewire, {} hard",
            plan.target,
            record.id,
            plan.count(Phase::SoftDelete),
            plan.count(Phase::Rewire),
            plan.count(Phase::HardDelete)
        );
        Ok(plan)
    }

    async fn plan_question(&self, id: &str) -> Result<Vec<CascadeStep>> {
        let mut steps = Vec::new();

        let referencing: Vec<SurveyItem> = self.repo.find_by("question", id).await?;
        for item in &referencing {
            match item.item_type {
                SurveyItemType::TrendQuestion => steps.push(CascadeStep::ReplaceTrendQuestion {
                    question: id.to_string(),
                    survey_item: item.id.clone(),
                }),
                _ => steps.push(CascadeStep::hard_delete(Collection::FlowLogic, "surveyItem", &item.id)),
            }
        }

        steps.extend([
            CascadeStep::hard_delete(Collection::QuestionItems, "question", id),
            CascadeStep::hard_delete(Collection::GridRows, "question", id),
            CascadeStep::hard_delete(Collection::GridColumns, "question", id),
            CascadeStep::hard_delete(Collection::DashboardItems, "question", id),
            CascadeStep::hard_delete(Collection::TagEntities, "entity", id),
            CascadeStep::hard_delete(Collection::QuestionStatistics, "question", id),
            // trend items were repointed by now, so this only hits private ones
            CascadeStep::hard_delete(Collection::SurveyItems, "question", id),
            CascadeStep::hard_delete_row(Collection::Questions, id),
        ]);
        Ok(steps)
    }

    async fn plan_survey_item(&self, id: &str) -> Result<Vec<CascadeStep>> {
        let mut steps = Vec::new();

        match self.repo.get::<SurveyItem>(id).await? {
            Some(item) => match item.item_type {
                SurveyItemType::TrendQuestion => {}
                SurveyItemType::Question => {
                    if let Some(question_id) = &item.question {
                        match self.repo.get::<Question>(question_id).await? {
                            Some(question) if !question.trend => {
                                steps.push(CascadeStep::Spawn(TrashTarget::Question(question.id)));
                            }
                            Some(_) => debug!("Item {} uses shared question {}, leaving it", id, question_id),
                            None => {}
                        }
                    }
                }
                SurveyItemType::Contents => {
                    if let Some(content) = &item.content_item {
                        steps.push(CascadeStep::TrashContent(content.clone()));
                    }
                }
            },
            None => debug!("Survey item {} already removed", id),
        }

        steps.extend([
            CascadeStep::hard_delete(Collection::QuestionStatistics, "surveyItem", id),
            CascadeStep::hard_delete(Collection::FlowLogic, "surveyItem", id),
            CascadeStep::hard_delete_row(Collection::SurveyItems, id),
        ]);
        Ok(steps)
    }

    async fn plan_survey(&self, id: &str) -> Result<Vec<CascadeStep>> {
        let items: Vec<SurveyItem> = self.repo.find_by("survey", id).await?;
        let mut steps: Vec<CascadeStep> = items
            .into_iter()
            .map(|item| CascadeStep::Spawn(TrashTarget::SurveyItem(item.id)))
            .collect();

        steps.extend([
            CascadeStep::hard_delete(Collection::SurveySections, "survey", id),
            CascadeStep::hard_delete(Collection::SurveyResults, "survey", id),
            CascadeStep::hard_delete(Collection::Invites, "survey", id),
            CascadeStep::hard_delete(Collection::DashboardItems, "survey", id),
            CascadeStep::hard_delete(Collection::TagEntities, "entity", id),
            CascadeStep::hard_delete(Collection::SurveyThemes, "survey", id),
            CascadeStep::hard_delete(Collection::FlowLogic, "survey", id),
            CascadeStep::hard_delete_row(Collection::Surveys, id),
        ]);
        Ok(steps)
    }

    async fn plan_section(&self, id: &str) -> Result<Vec<CascadeStep>> {
        let live: Vec<SurveyItem> = self
            .repo
            .find(&Filter::by("section", id).and("inTrash", false))
            .await?;
        let mut steps: Vec<CascadeStep> = live
            .into_iter()
            .map(|item| CascadeStep::Spawn(TrashTarget::SurveyItem(item.id)))
            .collect();

        steps.extend([
            CascadeStep::hard_delete(Collection::FlowLogic, "targetSection", id),
            CascadeStep::hard_delete_row(Collection::SurveySections, id),
        ]);
        Ok(steps)
    }

    async fn plan_option<T: QuestionOption>(&self, id: &str) -> Result<Vec<CascadeStep>> {
        let mut steps = Vec::new();

        if let Some(option) = self.repo.get::<T>(id).await? {
            steps.push(CascadeStep::RemoveOption {
                question: option.question().to_string(),
                option: id.to_string(),
            });
        }

        steps.extend([
            CascadeStep::hard_delete(Collection::FlowLogic, "questionItem", id),
            CascadeStep::hard_delete_row(T::COLLECTION, id),
        ]);
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_orders_hard_deletes_last() {
        let plan = CascadePlan::new(
            TrashTarget::Survey("s1".into()),
            vec![
                CascadeStep::hard_delete_row(Collection::Surveys, "s1"),
                CascadeStep::RepointUsers { team: "t".into() },
                CascadeStep::Spawn(TrashTarget::SurveyItem("i1".into())),
                CascadeStep::hard_delete(Collection::Invites, "survey", "s1"),
                CascadeStep::TrashContent("c1".into()),
            ],
        );
        let phases: Vec<Phase> = plan.steps.iter().map(|s| s.phase()).collect();
        assert_eq!(
            phases,
            vec![
                Phase::SoftDelete,
                Phase::SoftDelete,
                Phase::Rewire,
                Phase::HardDelete,
                Phase::HardDelete
            ]
        );
        // stable within a phase
        assert_eq!(
            plan.steps[3],
            CascadeStep::hard_delete_row(Collection::Surveys, "s1")
        );
        assert_eq!(plan.count(Phase::HardDelete), 2);
    }
}
