use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::core::error::KeepaliveError;

/// Uniform body of every JSON response.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(Envelope {
            code: StatusCode::OK.as_u16(),
            message: "success".to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn ok_message(message: impl Into<String>) -> Response {
    (
        StatusCode::OK,
        Json(Envelope::<()> {
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: None,
        }),
    )
        .into_response()
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

pub type ApiResult = Result<Response, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<KeepaliveError> for ApiError {
    fn from(err: KeepaliveError) -> Self {
        let status = match &err {
            KeepaliveError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            KeepaliveError::TaskAlreadyExists(_) => StatusCode::CONFLICT,
            KeepaliveError::UnsupportedPlatform(_)
            | KeepaliveError::InvalidTaskCode(_)
            | KeepaliveError::TaskDisabled(_)
            | KeepaliveError::NoCredentials(_)
            | KeepaliveError::EmptyPool
            | KeepaliveError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            KeepaliveError::Storage(e) => {
                tracing::error!("Storage failure while serving request: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        KeepaliveError::Storage(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            code: self.status.as_u16(),
            message: self.message,
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}
