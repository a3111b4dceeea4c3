//! HTTP error mapping.
//!
//! Handlers propagate `anyhow::Error`; this module downcasts back to
//! the gateway taxonomy to pick the status code and renders a
//! structured JSON body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// An error leaving the HTTP boundary.
pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<ocore::Error>() {
            Some(ocore::Error::Params(_)) => StatusCode::BAD_REQUEST,
            Some(ocore::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(ocore::Error::RateLimit) => StatusCode::TOO_MANY_REQUESTS,
            Some(ocore::Error::Provider { .. }) => StatusCode::BAD_GATEWAY,
            Some(ocore::Error::Configuration(_)) | Some(ocore::Error::ToolExecution(_)) | None => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self.0.downcast_ref::<ocore::Error>() {
            Some(ocore::Error::Params(_)) => "invalid_request_error",
            Some(ocore::Error::NotFound(_)) => "not_found_error",
            Some(ocore::Error::RateLimit) => "rate_limit_error",
            Some(ocore::Error::Provider { .. }) => "upstream_error",
            Some(ocore::Error::Configuration(_)) => "configuration_error",
            Some(ocore::Error::ToolExecution(_)) | None => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        } else {
            tracing::warn!("request rejected: {:#}", self.0);
        }

        let body = json!({
            "error": {
                "message": self.0.to_string(),
                "type": self.kind(),
            },
        });
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}
