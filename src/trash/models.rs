use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::db::{Collection, Entity};
use crate::utils::new_id;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum TrashStage {
    Initial,
    Clearing,
}


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr, EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum TrashType {
    Survey,
    Template,
    SurveyItem,
    SurveySection,
    Question,
    QuestionItem,
    GridRow,
    GridColumn,
    Team,
}

impl TrashType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Name of the persisted reference column for this type.
    pub fn ref_field(&self) -> &'static str {
        match self {
            Self::Survey => "surveyRef",
            Self::Template => "templateRef",
            Self::SurveyItem => "surveyItemRef",
            Self::SurveySection => "surveySectionRef",
            Self::Question => "questionRef",
            Self::QuestionItem => "questionItemRef",
            Self::GridRow => "gridRowRef",
            Self::GridColumn => "gridColumnRef",
            Self::Team => "teamRef",
        }
    }
}


/// What a trash record points at. One variant per type, each with its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrashTarget {
    Survey(String),
    Template(String),
    SurveyItem(String),
    SurveySection(String),
    Question(String),
    QuestionItem(String),
    GridRow(String),
    GridColumn(String),
    Team(String),
}

impl TrashTarget {
    pub fn new(kind: TrashType, id: String) -> Self {
        match kind {
            TrashType::Survey => Self::Survey(id),
            TrashType::Template => Self::Template(id),
            TrashType::SurveyItem => Self::SurveyItem(id),
            TrashType::SurveySection => Self::SurveySection(id),
            TrashType::Question => Self::Question(id),
            TrashType::QuestionItem => Self::QuestionItem(id),
            TrashType::GridRow => Self::GridRow(id),
            TrashType::GridColumn => Self::GridColumn(id),
            TrashType::Team => Self::Team(id),
        }
    }

    pub fn kind(&self) -> TrashType {
        match self {
            Self::Survey(_) => TrashType::Survey,
            Self::Template(_) => TrashType::Template,
            Self::SurveyItem(_) => TrashType::SurveyItem,
            Self::SurveySection(_) => TrashType::SurveySection,
            Self::Question(_) => TrashType::Question,
            Self::QuestionItem(_) => TrashType::QuestionItem,
            Self::GridRow(_) => TrashType::GridRow,
            Self::GridColumn(_) => TrashType::GridColumn,
            Self::Team(_) => TrashType::Team,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Survey(id)
            | Self::Template(id)
            | Self::SurveyItem(id)
            | Self::SurveySection(id)
            | Self::Question(id)
            | Self::QuestionItem(id)
            | Self::GridRow(id)
            | Self::GridColumn(id)
            | Self::Team(id) => id,
        }
    }
}

impl std::fmt::Display for TrashTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.id())
    }
}


/// Entities that can be soft-deleted into the trash.
pub trait Trashable: Entity {
    fn trash_target(&self) -> TrashTarget;

    fn in_trash(&self) -> bool;

    fn set_in_trash(&mut self, in_trash: bool);
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrashRecordDoc", into = "TrashRecordDoc")]
pub struct TrashRecord {
    pub id: String,
    pub company_id: String,
    pub team_id: String,
    pub target: TrashTarget,
    pub stage: TrashStage,
    pub attempts: u32,
    pub parent_record: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrashRecord {
    pub fn new(target: TrashTarget, company_id: &str, team_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            company_id: company_id.to_string(),
            team_id: team_id.to_string(),
            target,
            stage: TrashStage::Initial,
            attempts: 0,
            parent_record: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record spawned by another record's cascade, ready to be swept.
    pub fn spawned(target: TrashTarget, parent: &TrashRecord) -> Self {
        Self {
            stage: TrashStage::Clearing,
            parent_record: Some(parent.id.clone()),
            ..Self::new(target, &parent.company_id, &parent.team_id)
        }
    }

    pub fn kind(&self) -> TrashType {
        self.target.kind()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Entity for TrashRecord {
    const COLLECTION: Collection = Collection::TrashRecords;

    fn id(&self) -> &str {
        &self.id
    }
}


#[derive(Debug, Error)]
pub enum InvalidTrashRecord {
    #[error("trash record {id} of type {kind} has no {field}")]
    MissingRef {
        id: String,
        kind: &'static str,
        field: &'static str,
    },
    #[error("trash record {id} has more than one reference set")]
    ExtraRef { id: String },
}


/// Persisted shape: one nullable reference column per type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrashRecordDoc {
    id: String,
    company_id: String,
    team_id: String,
    #[serde(rename = "type")]
    kind: Option<TrashType>,
    survey_ref: Option<String>,
    template_ref: Option<String>,
    survey_item_ref: Option<String>,
    survey_section_ref: Option<String>,
    question_ref: Option<String>,
    question_item_ref: Option<String>,
    grid_row_ref: Option<String>,
    grid_column_ref: Option<String>,
    team_ref: Option<String>,
    stage: Option<TrashStage>,
    #[serde(default)]
    attempts: u32,
    parent_record: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl TrashRecordDoc {
    fn slot(&mut self, kind: TrashType) -> &mut Option<String> {
        match kind {
            TrashType::Survey => &mut self.survey_ref,
            TrashType::Template => &mut self.template_ref,
            TrashType::SurveyItem => &mut self.survey_item_ref,
            TrashType::SurveySection => &mut self.survey_section_ref,
            TrashType::Question => &mut self.question_ref,
            TrashType::QuestionItem => &mut self.question_item_ref,
            TrashType::GridRow => &mut self.grid_row_ref,
            TrashType::GridColumn => &mut self.grid_column_ref,
            TrashType::Team => &mut self.team_ref,
        }
    }

    fn refs_set(&self) -> usize {
        [
            &self.survey_ref,
            &self.template_ref,
            &self.survey_item_ref,
            &self.survey_section_ref,
            &self.question_ref,
            &self.question_item_ref,
            &self.grid_row_ref,
            &self.grid_column_ref,
            &self.team_ref,
        ]
        .iter()
        .filter(|r| r.is_some())
        .count()
    }
}

impl From<TrashRecord> for TrashRecordDoc {
    fn from(record: TrashRecord) -> Self {
        let kind = record.target.kind();
        let mut doc = TrashRecordDoc {
            id: record.id,
            company_id: record.company_id,
            team_id: record.team_id,
            kind: Some(kind),
            stage: Some(record.stage),
            attempts: record.attempts,
            parent_record: record.parent_record,
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
            ..Default::default()
        };
        let (TrashTarget::Survey(id)
        | TrashTarget::Template(id)
        | TrashTarget::SurveyItem(id)
        | TrashTarget::SurveySection(id)
        | TrashTarget::Question(id)
        | TrashTarget::QuestionItem(id)
        | TrashTarget::GridRow(id)
        | TrashTarget::GridColumn(id)
        | TrashTarget::Team(id)) = record.target;
        *doc.slot(kind) = Some(id);
        doc
    }
}

impl TryFrom<TrashRecordDoc> for TrashRecord {
    type Error = InvalidTrashRecord;

    fn try_from(mut doc: TrashRecordDoc) -> Result<Self, Self::Error> {
        let Some(kind) = doc.kind else {
            return Err(InvalidTrashRecord::MissingRef {
                id: doc.id,
                kind: "unknown",
                field: "type",
            });
        };
        if doc.refs_set() > 1 {
            return Err(InvalidTrashRecord::ExtraRef { id: doc.id });
        }
        let Some(target_id) = doc.slot(kind).take() else {
            return Err(InvalidTrashRecord::MissingRef {
                id: doc.id,
                kind: kind.as_str(),
                field: kind.ref_field(),
            });
        };

        let now = Utc::now();
        Ok(TrashRecord {
            id: doc.id,
            company_id: doc.company_id,
            team_id: doc.team_id,
            target: TrashTarget::new(kind, target_id),
            stage: doc.stage.unwrap_or(TrashStage::Initial),
            attempts: doc.attempts,
            parent_record: doc.parent_record,
            created_at: doc.created_at.unwrap_or(now),
            updated_at: doc.updated_at.unwrap_or(now),
        })
    }
}


#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearingRequestReport {
    pub scheduled: Vec<String>,
    /// Already in `clearing`; left untouched.
    pub already_clearing: Vec<String>,
    pub missing: Vec<String>,
    /// Held by a running clear or restore.
    pub busy: Vec<String>,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearOutcome {
    pub record_id: String,
    pub target: String,
    /// Trash records created or moved to `clearing` by the cascade.
    pub spawned: Vec<String>,
    pub rewritten_items: usize,
    pub hard_deleted: usize,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreOutcome {
    pub record_id: String,
    pub target: String,
    /// Section a survey item was moved to because its own was gone.
    pub reassigned_section: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_persisted_shape_has_single_ref() {
        let record = TrashRecord::new(TrashTarget::Question("q1".into()), "c1", "t1");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "question");
        assert_eq!(json["questionRef"], "q1");
        assert_eq!(json["surveyRef"], serde_json::Value::Null);
        assert_eq!(json["stage"], "initial");
        assert_eq!(json["attempts"], 0);

        let back: TrashRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.target, TrashTarget::Question("q1".into()));
    }

    #[test]
    fn test_ref_must_match_type() {
        let result = serde_json::from_value::<TrashRecord>(json!({
            "id": "r1",
            "companyId": "c1",
            "teamId": "t1",
            "type": "survey",
            "questionRef": "q1",
            "stage": "initial",
            "attempts": 0
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_two_refs_rejected() {
        let result = serde_json::from_value::<TrashRecord>(json!({
            "id": "r1",
            "companyId": "c1",
            "teamId": "t1",
            "type": "survey",
            "surveyRef": "s1",
            "questionRef": "q1",
            "stage": "clearing"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_spawned_inherits_scope() {
        let parent = TrashRecord::new(TrashTarget::Team("t1".into()), "c1", "t1");
        let child = TrashRecord::spawned(TrashTarget::Survey("s1".into()), &parent);
        assert_eq!(child.stage, TrashStage::Clearing);
        assert_eq!(child.parent_record.as_deref(), Some(parent.id.as_str()));
        assert_eq!(child.company_id, "c1");
        assert_ne!(child.id, parent.id);
    }

    #[test]
    fn test_target_display() {
        assert_eq!(TrashTarget::GridRow("r".into()).to_string(), "gridRow:r");
    }
}
