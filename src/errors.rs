use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Config(String),
}

/// Outcome classes for a single failed address lookup.
///
/// `NotFound` is authoritative and gets cached as a tombstone. `Transient` covers everything
/// that might succeed on a later run and is never cached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("provider returned no candidates")]
    NotFound,
    #[error("transient geocoding failure: {0}")]
    Transient(String),
}

impl GeocodeError {
    pub fn transient(detail: impl Into<String>) -> Self {
        GeocodeError::Transient(detail.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GeocodeError::NotFound => "not_found",
            GeocodeError::Transient(_) => "transient",
        }
    }
}

impl From<reqwest::Error> for GeocodeError {
    /// Drops the request URL, which can carry the provider key in its query.
    fn from(err: reqwest::Error) -> Self {
        GeocodeError::Transient(err.without_url().to_string())
    }
}
