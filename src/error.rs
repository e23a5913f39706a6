use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::web::models::ErrorBody;

/// Failures of the `/api/chat` relay, each mapped onto the JSON error envelope.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No credential could be resolved; nothing was sent upstream.
    #[error("{0}")]
    MissingCredential(String),

    /// Upstream answered with a non-success status.
    #[error("Thirdweb API error: {body}")]
    Upstream { status: u16, body: String },

    /// Anything else. The detail is for logs only.
    #[error("Internal server error")]
    Internal(String),
}

impl ResponseError for ProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingCredential(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

/// Failures seen by a [`crate::client::ChatSession`] while streaming a reply.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request aborted")]
    Aborted,

    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// An `error` event sent by the upstream service.
    #[error("{0}")]
    Upstream(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
