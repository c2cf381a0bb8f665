use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use api::error::ErrorEnvelope;
use api::request::{Endpoint, Format};

pub mod bytes;
pub mod data;
pub mod info;
pub mod svc;
pub mod ticket;

// error taxonomy surfaced to clients as the protocol's json error envelope.
// these only apply before the first data byte is flushed; once streaming has
// begun, failures can only be signalled by closing the connection and the
// client re-fetches the descriptor
#[derive(Debug, Error)]
pub enum HtsgetError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidRange(String),

    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    NotFound(String),

    // covers unreadable backings, failed probes, and subprocess spawn
    // failures
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HtsgetError {
    fn status_and_name(&self) -> (StatusCode, &'static str) {
        match self {
            HtsgetError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "InvalidInput"),
            HtsgetError::InvalidRange(_) => (StatusCode::BAD_REQUEST, "InvalidRange"),
            HtsgetError::UnsupportedFormat(_) => (StatusCode::BAD_REQUEST, "UnsupportedFormat"),
            HtsgetError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            HtsgetError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError")
            }
        }
    }
}

impl IntoResponse for HtsgetError {
    fn into_response(self) -> Response {
        let (status, name) = self.status_and_name();

        if status.is_server_error() {
            tracing::error!("request failed: {self:#}");
        }

        (status, Json(ErrorEnvelope::new(name, self.to_string()))).into_response()
    }
}

// resolves the requested format name against the endpoint's matrix, falling
// back to the endpoint default.  shared by the ticket and data handlers
pub(crate) fn parse_format(
    endpoint: Endpoint,
    format: &Option<String>,
) -> Result<Format, HtsgetError> {
    let format = match format {
        None => endpoint.default_format(),
        Some(name) => name.parse::<Format>().map_err(|name| {
            HtsgetError::UnsupportedFormat(format!("unsupported format {name}"))
        })?,
    };

    if !endpoint.supports(format) {
        return Err(HtsgetError::UnsupportedFormat(format!(
            "format {format} is not available from this endpoint"
        )));
    }

    Ok(format)
}
