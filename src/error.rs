//! Error kinds shared by the analysis engines, the entry store and the orchestrator.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DiaryError {
    /// Analysis was requested for an entry with no content.
    #[error("invalid input: entry content is empty")]
    InvalidInput,

    #[error("entry not found: {0}")]
    NotFound(Uuid),

    /// An analysis request is already in flight on this orchestrator.
    #[error("an analysis request is already running")]
    AlreadyRunning,

    /// Reading or writing the persisted collection failed.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// A model-backed engine could not produce an analysis.
    #[error("analysis engine failure: {0}")]
    EngineFailure(String),
}

/// Payload-free discriminant of [`DiaryError`], cheap to copy into UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    AlreadyRunning,
    StorageFailure,
    EngineFailure,
}

impl ErrorKind {
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "Invalid entry data: write something before analyzing",
            ErrorKind::NotFound => "This journal entry no longer exists",
            ErrorKind::AlreadyRunning => "An analysis is already in progress",
            ErrorKind::StorageFailure => "Failed to save journal entry",
            ErrorKind::EngineFailure => "Network error. Please check your connection.",
        }
    }
}

impl DiaryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiaryError::InvalidInput => ErrorKind::InvalidInput,
            DiaryError::NotFound(_) => ErrorKind::NotFound,
            DiaryError::AlreadyRunning => ErrorKind::AlreadyRunning,
            DiaryError::StorageFailure(_) => ErrorKind::StorageFailure,
            DiaryError::EngineFailure(_) => ErrorKind::EngineFailure,
        }
    }

    /// Fixed, user-presentable message for this error's kind.
    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}

impl From<std::io::Error> for DiaryError {
    fn from(e: std::io::Error) -> Self {
        DiaryError::StorageFailure(e.to_string())
    }
}

impl From<serde_json::Error> for DiaryError {
    fn from(e: serde_json::Error) -> Self {
        DiaryError::StorageFailure(e.to_string())
    }
}

impl From<reqwest::Error> for DiaryError {
    fn from(e: reqwest::Error) -> Self {
        DiaryError::EngineFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DiaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_become_storage_failures() {
        let err: DiaryError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn user_message_is_fixed_per_kind() {
        let a = DiaryError::NotFound(Uuid::new_v4());
        let b = DiaryError::NotFound(Uuid::new_v4());
        assert_eq!(a.user_message(), b.user_message());
        assert_ne!(
            DiaryError::InvalidInput.user_message(),
            DiaryError::AlreadyRunning.user_message()
        );
    }
}
