use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr)]
pub enum TrashEventKind {
    #[strum(serialize = "trash.created")]
    #[serde(rename = "trash.created")]
    Created,
    #[strum(serialize = "trash.clearing_requested")]
    #[serde(rename = "trash.clearing_requested")]
    ClearingRequested,
    #[strum(serialize = "trash.cleared")]
    #[serde(rename = "trash.cleared")]
    Cleared,
    #[strum(serialize = "trash.clear_failed")]
    #[serde(rename = "trash.clear_failed")]
    ClearFailed,
    #[strum(serialize = "trash.restored")]
    #[serde(rename = "trash.restored")]
    Restored,
}

impl TrashEventKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,

    pub kind: TrashEventKind,

    pub timestamp: DateTime<Utc>,

    /// Trash record the event is about.
    pub record_id: String,

    pub payload: Value,
}

impl Event {
    #[must_use]
    pub fn new(kind: TrashEventKind, record_id: impl Into<String>, payload: Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            record_id: record_id.into(),
            payload,
        }
    }
}
