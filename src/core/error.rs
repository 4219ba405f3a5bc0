use thiserror::Error;

use crate::db::StoreError;


#[derive(Error, Debug)]
pub enum TrashError {
    #[error("cannot restore/clear this item")]
    Stage,

    #[error("too many attempts to clear")]
    AttemptsExceeded,

    #[error("need to have a section to restore")]
    NoSection,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Trash record {0} is already being processed")]
    Leased(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl TrashError {
    /// Errors that a later sweep pass cannot fix on its own.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AttemptsExceeded | Self::Stage)
    }
}

impl From<config::ConfigError> for TrashError {
    fn from(e: config::ConfigError) -> Self {
        TrashError::Config(e.to_string())
    }
}


pub type Result<T> = std::result::Result<T, TrashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(TrashError::AttemptsExceeded.is_fatal());
        assert!(TrashError::Stage.is_fatal());
        assert!(!TrashError::Leased("r1".into()).is_fatal());
        assert!(!TrashError::Store(StoreError::Backend("down".into())).is_fatal());
    }
}
