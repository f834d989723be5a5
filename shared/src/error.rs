use lambda_http::http::StatusCode;
use lambda_http::{Body, Response};
use thiserror::Error;

use crate::password::CredentialError;
use crate::records::RecordError;
use crate::response::json_response;
use crate::table::StoreError;
use crate::token::TokenError;
use crate::types::ErrorResponse;

/// Every way a request can fail, each with a fixed status code.
///
/// Messages for 401s are identical across causes so responses do not reveal
/// whether an account exists.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("invalid query parameter: {0}")]
    InvalidQuery(String),

    #[error("email is invalid")]
    InvalidEmail,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("route not found")]
    RouteNotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("email is already in use")]
    EmailTaken,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::InvalidQuery(_) | ApiError::InvalidEmail => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::EmailTaken => StatusCode::CONFLICT,
            ApiError::MissingConfig(_)
            | ApiError::Store(_)
            | ApiError::Record(_)
            | ApiError::Token(_)
            | ApiError::Credential(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingConfig(_) => "MissingConfig",
            ApiError::InvalidBody(_) => "InvalidRequest",
            ApiError::InvalidQuery(_) => "InvalidQuery",
            ApiError::InvalidEmail => "InvalidEmail",
            ApiError::InvalidCredentials => "InvalidCredentials",
            ApiError::Unauthorized => "Unauthorized",
            ApiError::Forbidden => "Forbidden",
            ApiError::NotFound(_) | ApiError::RouteNotFound => "NotFound",
            ApiError::MethodNotAllowed => "MethodNotAllowed",
            ApiError::EmailTaken => "Conflict",
            ApiError::Store(_)
            | ApiError::Record(_)
            | ApiError::Token(_)
            | ApiError::Credential(_)
            | ApiError::Internal(_) => "InternalError",
        }
    }

    /// Text sent to the client. Server-side failures get a generic message;
    /// the detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::MissingConfig(_) => "Server is misconfigured".to_string(),
            ApiError::InvalidBody(detail) => format!("Invalid request body: {detail}"),
            ApiError::InvalidQuery(detail) => format!("Invalid query parameter: {detail}"),
            ApiError::InvalidEmail => "Email is invalid".to_string(),
            ApiError::InvalidCredentials => "Invalid credentials".to_string(),
            ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::Forbidden => "Forbidden".to_string(),
            ApiError::NotFound(what) => format!("{what} not found"),
            ApiError::RouteNotFound => "Not found".to_string(),
            ApiError::MethodNotAllowed => "Method not allowed".to_string(),
            ApiError::EmailTaken => "Email is already in use".to_string(),
            ApiError::Store(_)
            | ApiError::Record(_)
            | ApiError::Token(_)
            | ApiError::Credential(_)
            | ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Log the failure and turn it into the structured error body.
    pub fn into_response(self) -> Response<Body> {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.public_message(),
        };
        let text = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":"InternalError","message":"Internal server error"}"#.to_string()
        });
        json_response(status, text)
    }
}
