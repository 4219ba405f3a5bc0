use tracing::{debug, info};

use crate::core::{Result, TrashError};
use crate::db::Repository;
use crate::survey::{GridColumn, GridRow, Question, QuestionItem, Survey, SurveyItem, SurveySection, Team};

use super::models::{TrashTarget, Trashable};


#[derive(Clone)]
pub struct RestoreResolver {
    repo: Repository,
}

impl RestoreResolver {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Clears `inTrash` on the target. Returns the section a survey item was
    /// moved to when its own section no longer exists.
    pub async fn restore(&self, target: &TrashTarget) -> Result<Option<String>> {
        match target {
            TrashTarget::SurveyItem(id) => self.restore_survey_item(id).await,
            TrashTarget::Survey(id) | TrashTarget::Template(id) => self.untrash::<Survey>(id).await,
            TrashTarget::SurveySection(id) => self.untrash::<SurveySection>(id).await,
            TrashTarget::Question(id) => self.untrash::<Question>(id).await,
            TrashTarget::QuestionItem(id) => self.untrash::<QuestionItem>(id).await,
            TrashTarget::GridRow(id) => self.untrash::<GridRow>(id).await,
            TrashTarget::GridColumn(id) => self.untrash::<GridColumn>(id).await,
            TrashTarget::Team(id) => self.untrash::<Team>(id).await,
        }
    }

    async fn untrash<T: Trashable>(&self, id: &str) -> Result<Option<String>> {
        let mut entity = self
            .repo
            .get::<T>(id)
            .await?
            .ok_or_else(|| TrashError::NotFound(format!("{} {}", T::COLLECTION.name(), id)))?;
        entity.set_in_trash(false);
        self.repo.update(&entity).await?;
        debug!("Restored {} {}", T::COLLECTION.name(), id);
        Ok(None)
    }

    async fn restore_survey_item(&self, id: &str) -> Result<Option<String>> {
        let mut item = self
            .repo
            .get::<SurveyItem>(id)
            .await?
            .ok_or_else(|| TrashError::NotFound(format!("survey item {}", id)))?;

        let mut reassigned = None;
        if self.repo.get::<SurveySection>(&item.section).await?.is_none() {
            let section = self.first_section(&item.survey).await?.ok_or(TrashError::NoSection)?;
            info!(
                "Section {} of item {} is gone, moving it to section {}",
                item.section, item.id, section.id
            );
            item.section = section.id.clone();
            reassigned = Some(section.id);
        }

        item.set_in_trash(false);
        self.repo.update(&item).await?;
        Ok(reassigned)
    }

    async fn first_section(&self, survey_id: &str) -> Result<Option<SurveySection>> {
        let sections: Vec<SurveySection> = self.repo.find_by("survey", survey_id).await?;
        Ok(sections
            .into_iter()
            .filter(|s| !s.in_trash)
            .min_by_key(|s| (s.sortable_id, s.id.clone())))
    }
}
