use crate::schema::BindError;
use crate::scoring::ScoringError;
use http::StatusCode;
use thiserror::Error;

/// Result type alias for request handling
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Caller-visible failures. Each one maps to a status code and a fixed
/// message; the attached reason is only logged.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad Request")]
    BadRequest,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not Found")]
    NotFound,

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ApiError::BadRequest => "Bad Request",
            ApiError::Forbidden => "Forbidden",
            ApiError::NotFound => "Not Found",
            ApiError::InvalidRequest(_) => "Invalid Request",
            ApiError::Internal(_) => "Internal Server Error",
        }
    }
}

impl From<BindError> for ApiError {
    fn from(err: BindError) -> Self {
        ApiError::InvalidRequest(err.to_string())
    }
}

impl From<ScoringError> for ApiError {
    fn from(err: ScoringError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
