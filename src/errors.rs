use std::fmt::{self, Display};

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// The referenced quote does not exist.
    NotFound,
    /// The vote path segment was neither "like" nor "dislike".
    InvalidDirection,
    /// The user already holds a vote in the requested direction.
    DuplicateVote,
    /// The source already carries the maximum of three quotes.
    SourceQuotaExceeded,
    /// A quote with identical text already exists.
    DuplicateText,
    /// Only the recorded author may edit a quote.
    NotAuthor,
    /// A malformed submit/edit payload.
    Validation(&'static str),
    /// A transaction conflict that survived the retry.
    Transient,
    Sqlx(sqlx::Error),
}

impl ApiError {
    fn message(&self) -> String {
        match self {
            Self::NotFound => "Quote does not exist".to_string(),
            Self::InvalidDirection => "Invalid vote direction".to_string(),
            Self::DuplicateVote => "You have already voted this way".to_string(),
            Self::SourceQuotaExceeded => {
                "This source already has the maximum of 3 quotes".to_string()
            }
            Self::DuplicateText => "A quote with this text already exists".to_string(),
            Self::NotAuthor => "Only the author may edit this quote".to_string(),
            Self::Validation(reason) => (*reason).to_string(),
            Self::Transient => "Temporary conflict, please retry".to_string(),
            Self::Sqlx(_) => "Internal database error".to_string(),
        }
    }

    /// Postgres serialization failures and deadlocks are safe to rerun once.
    pub fn is_transient_conflict(&self) -> bool {
        match self {
            Self::Sqlx(sqlx::Error::Database(err)) => {
                matches!(err.code().as_deref(), Some("40001") | Some("40P01"))
            }
            _ => false,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Self::Sqlx(err) => write!(f, "{err}"),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidDirection | Self::DuplicateVote | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::SourceQuotaExceeded | Self::DuplicateText => StatusCode::CONFLICT,
            Self::NotAuthor => StatusCode::FORBIDDEN,
            Self::Transient => StatusCode::SERVICE_UNAVAILABLE,
            Self::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.message() }))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        Self::Sqlx(error)
    }
}
