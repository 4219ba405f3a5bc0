pub mod models;
pub mod payloads;

pub use models::{
    Asset, Contact, ContentItem, DashboardItem, Email, FlowLogic, GridColumn, GridRow, Invite,
    Question, QuestionItem, QuestionKind, QuestionOption, QuestionStatistic, Survey, SurveyItem,
    SurveyItemType, SurveyResult, SurveySection, SurveyTheme, Tag, TagEntity, Team, TeamUser, User,
};
pub use payloads::{Answer, AnswerValue, GridCell, IdMap, StatisticData};
