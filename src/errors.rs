use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("missing required input: {0}")] MissingInput(String),
    #[error("unknown category: {0}")] UnknownCategory(String),
    #[error("configuration error: {0}")] Config(String),
    #[error("backend error: {0}")] Backend(String),
    #[error("malformed backend response: {0}")] Malformed(String),
    #[error("storage error: {0}")] Storage(String),
}

impl StudioError {
    /// Errors the caller caused; these are rejected before any backend call.
    pub fn is_client_error(&self) -> bool {
        matches!(self, StudioError::MissingInput(_) | StudioError::UnknownCategory(_))
    }
}

impl From<reqwest::Error> for StudioError {
    fn from(e: reqwest::Error) -> Self {
        StudioError::Backend(e.to_string())
    }
}

impl From<rusqlite::Error> for StudioError {
    fn from(e: rusqlite::Error) -> Self {
        StudioError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
