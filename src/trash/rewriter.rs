use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::core::{Result, TrashError};
use crate::db::Repository;
use crate::survey::{
    GridColumn, GridRow, IdMap, Question, QuestionItem, QuestionOption, QuestionStatistic, SurveyItem,
    SurveyItemType, SurveyResult,
};
use crate::utils::derived_id;


#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub clone_id: Option<String>,
    pub options_cloned: usize,
    pub results_rewritten: usize,
    pub statistics_rewritten: usize,
}


/// Replaces a shared trend question on one survey item with a private
/// copy and moves the item's collected answers and statistics onto it.
///
/// Clone ids derive from (survey item, original id) and every write is an
/// upsert, so a rerun after a partial failure converges on the same copy.
/// The survey item is repointed last; until then a rerun redoes all steps.
#[derive(Clone)]
pub struct ReferenceRewriter {
    repo: Repository,
}

impl ReferenceRewriter {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn replace(&self, question_id: &str, survey_item_id: &str) -> Result<ReplaceOutcome> {
        let Some(mut item) = self.repo.get::<SurveyItem>(survey_item_id).await? else {
            debug!("Survey item {} is gone, nothing to rewrite", survey_item_id);
            return Ok(ReplaceOutcome::default());
        };
        if item.item_type != SurveyItemType::TrendQuestion || item.question.as_deref() != Some(question_id) {
            debug!("Survey item {} no longer shares question {}", survey_item_id, question_id);
            return Ok(ReplaceOutcome::default());
        }

        let question = self
            .repo
            .get::<Question>(question_id)
            .await?
            .ok_or_else(|| TrashError::NotFound(format!("question {}", question_id)))?;

        let clone_id = derived_id(&item.id, &question.id);
        let copy = Question {
            id: clone_id.clone(),
            trend: false,
            in_trash: false,
            ..question.clone()
        };
        self.repo.save(&copy).await?;

        let mut id_map = IdMap::new();
        let mut dropped = Vec::new();
        let mut options_cloned = 0;
        options_cloned += self
            .clone_options::<QuestionItem>(&question.id, &clone_id, &mut id_map, &mut dropped)
            .await?;
        options_cloned += self
            .clone_options::<GridRow>(&question.id, &clone_id, &mut id_map, &mut dropped)
            .await?;
        options_cloned += self
            .clone_options::<GridColumn>(&question.id, &clone_id, &mut id_map, &mut dropped)
            .await?;

        let results_rewritten = self.rewrite_results(&item, &id_map, &dropped).await?;
        let statistics_rewritten = self
            .rewrite_statistics(&item.id, &clone_id, &id_map, &dropped)
            .await?;

        item.question = Some(clone_id.clone());
        item.item_type = SurveyItemType::Question;
        self.repo.update(&item).await?;

        info!(
            "Replaced trend question {} on item {} with {} ({} options, {} results, {} statistics)",
            question_id, item.id, clone_id, options_cloned, results_rewritten, statistics_rewritten
        );

        Ok(ReplaceOutcome {
            clone_id: Some(clone_id),
            options_cloned,
            results_rewritten,
            statistics_rewritten,
        })
    }

    /// Copies the live options of `original` onto `clone_id` and records the
    /// original -> copy mapping, matched by `sortable_id`. Options already in
    /// trash are not copied; their ids go to `dropped`.
    async fn clone_options<T: QuestionOption>(
        &self,
        original: &str,
        clone_id: &str,
        id_map: &mut IdMap,
        dropped: &mut Vec<String>,
    ) -> Result<usize> {
        let originals: Vec<T> = self.repo.find_by("question", original).await?;
        let mut by_position: HashMap<i64, String> = HashMap::new();
        let mut copied = 0;

        for option in &originals {
            if option.in_trash() {
                debug!("Option {} is in trash, not copying it", option.id());
                dropped.push(option.id().to_string());
                continue;
            }

            let copy = option.cloned_for(derived_id(clone_id, option.id()), clone_id);
            self.repo.save(&copy).await?;
            copied += 1;

            if let Some(taken) = by_position.get(&copy.sortable_id()) {
                warn!(
                    "Options {} and {} of question {} share position {}",
                    taken,
                    option.id(),
                    original,
                    copy.sortable_id()
                );
            } else {
                by_position.insert(copy.sortable_id(), option.id().to_string());
            }
            // each original keeps its own copy even when positions collide
            id_map.insert(option.id().to_string(), copy.id().to_string());
        }

        Ok(copied)
    }

    async fn rewrite_results(&self, item: &SurveyItem, id_map: &IdMap, dropped: &[String]) -> Result<usize> {
        let results: Vec<SurveyResult> = self.repo.find_by("survey", item.survey.as_str()).await?;
        let mut rewritten = 0;

        for mut result in results {
            let mut changed = false;
            for answer in result.answers.iter_mut().filter(|a| a.survey_item == item.id) {
                for option in dropped {
                    changed |= answer.value.remove_option(option);
                }
                changed |= answer.value.remap(id_map);
            }
            if changed {
                self.repo.update(&result).await?;
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }

    async fn rewrite_statistics(
        &self,
        survey_item: &str,
        clone_id: &str,
        id_map: &IdMap,
        dropped: &[String],
    ) -> Result<usize> {
        let statistics: Vec<QuestionStatistic> = self.repo.find_by("surveyItem", survey_item).await?;
        let count = statistics.len();

        for mut statistic in statistics {
            statistic.question = clone_id.to_string();
            for option in dropped {
                statistic.data.remove_option(option);
            }
            statistic.data.remap(id_map);
            statistic.sync_db = false;
            self.repo.update(&statistic).await?;
        }
        Ok(count)
    }
}
