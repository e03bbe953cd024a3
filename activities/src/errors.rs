use crate::config::ValidationError;
use crate::oauth::OAuthError;
use crate::page_fetcher::FetchError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Errors surfaced to callers of the HTTP API.
#[derive(thiserror::Error, Debug)]
pub enum ActivitiesError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("no access token for this session")]
    TokenMissing,

    #[error("failed to fetch activities")]
    Upstream(#[source] FetchError),

    #[error("missing authorization code")]
    MissingCode,

    #[error("token exchange failed")]
    TokenExchange(#[source] OAuthError),
}

impl ActivitiesError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ActivitiesError::Unauthenticated | ActivitiesError::TokenMissing => {
                StatusCode::UNAUTHORIZED
            }
            ActivitiesError::MissingCode => StatusCode::BAD_REQUEST,
            ActivitiesError::Upstream(_) | ActivitiesError::TokenExchange(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

impl IntoResponse for ActivitiesError {
    fn into_response(self) -> Response {
        // Upstream details stay in the logs, the client only gets the summary
        let body = Json(ApiErrorResponse {
            error_message: self.to_string(),
        });

        (self.status_code(), body).into_response()
    }
}

/// Errors that stop the service from starting or serving.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
    #[error("invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("OAuth client error: {0}")]
    OAuth(#[from] OAuthError),
    #[error("could not fetch activities: {0}")]
    Fetch(#[from] FetchError),
    #[error("could not encode activities: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ActivitiesError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ActivitiesError::TokenMissing.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ActivitiesError::MissingCode.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ActivitiesError::Upstream(FetchError::Timeout { page: 2 }).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_detail_not_exposed() {
        let err = ActivitiesError::Upstream(FetchError::Timeout { page: 2 });
        assert_eq!(err.to_string(), "failed to fetch activities");
    }
}
