use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use paper_grid::{OutOfBounds, Unavailable};
use paper_types::api::PlacementResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// An extractor refused the request before it reached a handler.
    #[error("{reason}")]
    Rejected { status: StatusCode, reason: String },

    #[error(transparent)]
    OutOfBounds(#[from] OutOfBounds),

    #[error("missing or invalid token")]
    Unauthorized,

    #[error("only the board owner may do this")]
    Forbidden,

    #[error("message not found")]
    NotFound,

    #[error(transparent)]
    Unavailable(#[from] Unavailable),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::BadRequest(reason) => (StatusCode::BAD_REQUEST, plain(reason.as_str())),
            Self::Rejected { status, reason } => (*status, plain(reason.as_str())),
            Self::OutOfBounds(oob) => (StatusCode::UNPROCESSABLE_ENTITY, out_of_bounds_body(oob)),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, plain(self.to_string())),
            Self::Forbidden => (StatusCode::FORBIDDEN, plain(self.to_string())),
            Self::NotFound => (StatusCode::NOT_FOUND, plain(self.to_string())),
            Self::Unavailable(e) => {
                error!("{:#}", e);
                (StatusCode::SERVICE_UNAVAILABLE, plain("storage unavailable"))
            }
            Self::Join(e) => {
                error!("spawn_blocking join error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, plain("internal error"))
            }
        };

        (status, Json(body)).into_response()
    }
}

macro_rules! from_rejection {
    ($($rejection:ty),+) => {
        $(impl From<$rejection> for ApiError {
            fn from(rejection: $rejection) -> Self {
                Self::Rejected {
                    status: rejection.status(),
                    reason: rejection.body_text(),
                }
            }
        })+
    };
}

from_rejection!(JsonRejection, QueryRejection, PathRejection);

fn plain(reason: impl Into<String>) -> PlacementResponse {
    PlacementResponse::error(None, reason)
}

pub fn out_of_bounds_body(oob: &OutOfBounds) -> PlacementResponse {
    PlacementResponse::Error {
        field: Some(oob.axis.as_str().to_string()),
        reason: oob.reason(),
        min: Some(oob.min),
        max: Some(oob.max),
    }
}
