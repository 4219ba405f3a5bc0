use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::db::{Collection, Entity};
use crate::trash::{TrashTarget, Trashable};

use super::payloads::{Answer, StatisticData};


macro_rules! entity {
    ($ty:ident, $collection:expr) => {
        impl Entity for $ty {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

macro_rules! trashable {
    ($ty:ident, $variant:ident) => {
        impl Trashable for $ty {
            fn trash_target(&self) -> TrashTarget {
                TrashTarget::$variant(self.id.clone())
            }

            fn in_trash(&self) -> bool {
                self.in_trash
            }

            fn set_in_trash(&mut self, in_trash: bool) {
                self.in_trash = in_trash;
            }
        }
    };
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub company: String,
    pub name: String,
    #[serde(default)]
    pub in_trash: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub company: String,
    pub current_team: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamUser {
    pub id: String,
    pub team: String,
    pub user: String,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: String,
    pub company: String,
    pub team: String,
    pub title: String,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub in_trash: bool,
}

impl Trashable for Survey {
    fn trash_target(&self) -> TrashTarget {
        if self.is_template {
            TrashTarget::Template(self.id.clone())
        } else {
            TrashTarget::Survey(self.id.clone())
        }
    }

    fn in_trash(&self) -> bool {
        self.in_trash
    }

    fn set_in_trash(&mut self, in_trash: bool) {
        self.in_trash = in_trash;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySection {
    pub id: String,
    pub survey: String,
    pub sortable_id: i64,
    #[serde(default)]
    pub in_trash: bool,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SurveyItemType {
    Question,
    TrendQuestion,
    Contents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyItem {
    pub id: String,
    pub survey: String,
    pub section: String,
    #[serde(rename = "type")]
    pub item_type: SurveyItemType,
    pub question: Option<String>,
    pub content_item: Option<String>,
    pub sortable_id: i64,
    #[serde(default)]
    pub in_trash: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub survey: String,
    pub body: String,
    #[serde(default)]
    pub in_trash: bool,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    Grid,
    Text,
    Number,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub company: String,
    pub team: String,
    pub kind: QuestionKind,
    pub text: String,
    /// Shared across surveys through `trendQuestion` items.
    #[serde(default)]
    pub trend: bool,
    #[serde(default)]
    pub in_trash: bool,
}


/// Answer options of a question: items, grid rows and grid columns.
pub trait QuestionOption: Entity + Trashable {
    fn question(&self) -> &str;

    fn sortable_id(&self) -> i64;

    /// Copy of this option attached to another question under a new id.
    fn cloned_for(&self, id: String, question: &str) -> Self;
}

macro_rules! question_option {
    ($ty:ident, $collection:expr, $variant:ident) => {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $ty {
            pub id: String,
            pub question: String,
            pub label: String,
            pub sortable_id: i64,
            #[serde(default)]
            pub in_trash: bool,
        }

        entity!($ty, $collection);
        trashable!($ty, $variant);

        impl QuestionOption for $ty {
            fn question(&self) -> &str {
                &self.question
            }

            fn sortable_id(&self) -> i64 {
                self.sortable_id
            }

            fn cloned_for(&self, id: String, question: &str) -> Self {
                Self {
                    id,
                    question: question.to_string(),
                    label: self.label.clone(),
                    sortable_id: self.sortable_id,
                    in_trash: false,
                }
            }
        }
    };
}

question_option!(QuestionItem, Collection::QuestionItems, QuestionItem);
question_option!(GridRow, Collection::GridRows, GridRow);
question_option!(GridColumn, Collection::GridColumns, GridColumn);


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResult {
    pub id: String,
    pub survey: String,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStatistic {
    pub id: String,
    pub survey: String,
    pub survey_item: String,
    pub question: String,
    pub data: StatisticData,
    #[serde(rename = "syncDB")]
    pub sync_db: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardItem {
    pub id: String,
    pub survey: Option<String>,
    pub question: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub team: String,
    pub name: String,
}

/// Attaches a tag to a survey or question by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEntity {
    pub id: String,
    pub tag: String,
    pub entity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyTheme {
    pub id: String,
    pub survey: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: String,
    pub survey: String,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowLogic {
    pub id: String,
    pub survey: String,
    pub survey_item: Option<String>,
    pub target_section: Option<String>,
    pub question_item: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: String,
    pub team: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub team: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub team: String,
}


entity!(Team, Collection::Teams);
entity!(User, Collection::Users);
entity!(TeamUser, Collection::TeamUsers);
entity!(Survey, Collection::Surveys);
entity!(SurveySection, Collection::SurveySections);
entity!(SurveyItem, Collection::SurveyItems);
entity!(ContentItem, Collection::ContentItems);
entity!(Question, Collection::Questions);
entity!(SurveyResult, Collection::SurveyResults);
entity!(QuestionStatistic, Collection::QuestionStatistics);
entity!(DashboardItem, Collection::DashboardItems);
entity!(Tag, Collection::Tags);
entity!(TagEntity, Collection::TagEntities);
entity!(SurveyTheme, Collection::SurveyThemes);
entity!(Invite, Collection::Invites);
entity!(FlowLogic, Collection::FlowLogic);
entity!(Email, Collection::Emails);
entity!(Asset, Collection::Assets);
entity!(Contact, Collection::Contacts);

trashable!(Team, Team);
trashable!(SurveySection, SurveySection);
trashable!(SurveyItem, SurveyItem);
trashable!(Question, Question);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_survey_item_wire_shape() {
        let item: SurveyItem = serde_json::from_value(json!({
            "id": "i1",
            "survey": "s1",
            "section": "sec1",
            "type": "trendQuestion",
            "question": "q1",
            "contentItem": null,
            "sortableId": 2
        }))
        .unwrap();
        assert_eq!(item.item_type, SurveyItemType::TrendQuestion);
        assert!(!item.in_trash);
    }

    #[test]
    fn test_template_target() {
        let mut survey = Survey {
            id: "s1".into(),
            company: "c".into(),
            team: "t".into(),
            title: "T".into(),
            is_template: true,
            in_trash: false,
        };
        assert_eq!(survey.trash_target(), TrashTarget::Template("s1".into()));
        survey.is_template = false;
        assert_eq!(survey.trash_target(), TrashTarget::Survey("s1".into()));
    }

    #[test]
    fn test_option_clone_keeps_position() {
        let item = QuestionItem {
            id: "o1".into(),
            question: "q1".into(),
            label: "Yes".into(),
            sortable_id: 4,
            in_trash: true,
        };
        let copy = item.cloned_for("o2".into(), "q2");
        assert_eq!(copy.sortable_id, 4);
        assert_eq!(copy.question, "q2");
        assert!(!copy.in_trash);
    }

    #[test]
    fn test_statistic_sync_flag_name() {
        let stat = QuestionStatistic {
            id: "st".into(),
            survey: "s".into(),
            survey_item: "i".into(),
            question: "q".into(),
            data: StatisticData::Summary { responses: 1 },
            sync_db: true,
        };
        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(json["syncDB"], true);
        assert_eq!(json["surveyItem"], "i");
    }
}
