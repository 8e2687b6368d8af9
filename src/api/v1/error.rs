use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use std::fmt::Display;
use thiserror::Error;
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let api_error = if let Some(err) = err.find::<ApiError>() {
        err.clone()
    } else if let Some(err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        debug!(%err, "rejected request body");
        ApiError::bad_request("failed to bind JSON object")
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        ApiError::bad_request("expected a JSON body")
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        ApiError::bad_request("request body with a Content-Length is required")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        ApiError::bad_request("request body too large")
    } else if err.is_not_found() {
        ApiError::new(ApiErrorCode::NotFound, "no such route")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiError::new(ApiErrorCode::MethodNotAllowed, "method not allowed")
    } else {
        ApiError::internal(format!("unhandled rejection: {:?}", err))
    };

    let status = api_error.code.status();
    let json = warp::reply::json(&ErrorBody {
        code: api_error.code,
        message: api_error.message,
    });
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApiErrorCode {
    BadRequest,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Unauthorized, message)
    }

    /// Log the detail and hand the client a generic message.
    pub fn internal<E: Display>(error: E) -> Self {
        warn!("Internal error: {}", error);
        Self::new(ApiErrorCode::InternalServerError, "internal server error")
    }
}

impl reject::Reject for ApiError {}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::BadRequest(m) => ApiError::bad_request(m),
            SessionError::Unauthorized(m) => ApiError::unauthorized(m),
            // Already logged with full detail by the session service.
            SessionError::Internal(m) => ApiError::new(ApiErrorCode::InternalServerError, m),
        }
    }
}

impl From<AccountServiceError> for ApiError {
    fn from(error: AccountServiceError) -> Self {
        match error {
            AccountServiceError::NotFound => ApiError::unauthorized("account no longer exists"),
            AccountServiceError::Transport(e) => ApiError::internal(e),
        }
    }
}
