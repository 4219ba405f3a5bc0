use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;


#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}/{1}")]
    NotFound(&'static str, String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Retry exhausted after {0} attempts: {1}")]
    RetryExhausted(u32, String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, EnumString, IntoStaticStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
    TrashRecords,
    Teams,
    Users,
    TeamUsers,
    Surveys,
    SurveySections,
    SurveyItems,
    ContentItems,
    Questions,
    QuestionItems,
    GridRows,
    GridColumns,
    SurveyResults,
    QuestionStatistics,
    DashboardItems,
    Tags,
    TagEntities,
    SurveyThemes,
    Invites,
    FlowLogic,
    Emails,
    Assets,
    Contacts,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// Equality filter on top-level document fields; all clauses must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(field: &str, value: impl Into<Value>) -> Self {
        Self::new().and(field, value)
    }

    pub fn and(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push((field.to_string(), value.into()));
        self
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|(field, expected)| {
            doc.get(field).unwrap_or(&Value::Null) == expected
        })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}


/// Generic document CRUD. Every document carries a string `id` field.
/// Deleting an absent document is a no-op.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    /// Insert or replace by `id`.
    async fn insert(&self, collection: Collection, doc: Value) -> Result<(), StoreError>;

    /// Replace an existing document; fails with `NotFound` when absent.
    async fn update(&self, collection: Collection, doc: Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;

    async fn delete_where(&self, collection: Collection, filter: &Filter) -> Result<usize, StoreError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<usize, StoreError> {
        Ok(self.find(collection, filter).await?.len())
    }
}

pub(crate) fn doc_id(doc: &Value) -> Result<String, StoreError> {
    doc.get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| StoreError::Backend("document without string id".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches() {
        let doc = json!({"id": "a", "survey": "s1", "inTrash": false});
        assert!(Filter::by("survey", "s1").matches(&doc));
        assert!(Filter::by("survey", "s1").and("inTrash", false).matches(&doc));
        assert!(!Filter::by("survey", "s2").matches(&doc));
        assert!(Filter::by("section", Value::Null).matches(&doc));
        assert!(Filter::new().matches(&doc));
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::QuestionStatistics.name(), "question_statistics");
        assert_eq!("flow_logic".parse::<Collection>().unwrap(), Collection::FlowLogic);
    }
}
