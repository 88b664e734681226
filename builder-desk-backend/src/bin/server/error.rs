use builder_desk_backend::allocations::Allocation;
use builder_desk_backend::{DeskError, ErrorKind};
use builder_desk_config::ConfigError;
use builder_desk_database::DatabaseError;
use builder_desk_telemetry::TryInitError;
use bytes::Bytes;
use http::{Method, Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use crate::router::{json_response, keyed};

/// Error body of a window move whose allocations could not be saved.
#[derive(Serialize)]
struct ReslotBody<'a> {
    error: String,
    unsaved: &'a [Allocation],
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    File(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("query string error: {0}")]
    Query(#[from] serde_urlencoded::de::Error),
    #[error("request body error: {0}")]
    Body(String),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TryInitError),
    #[error("{0}")]
    Desk(#[from] DeskError),
    #[error("invalid id {0:?}")]
    InvalidId(String),
    #[error("no route for {method} {path}")]
    RouteNotFound { method: Method, path: String },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Json(_) | Self::Query(_) | Self::Body(_) | Self::InvalidId(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Desk(error) => match error.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::File(_) | Self::Config(_) | Self::Database(_) | Self::Telemetry(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        if let Self::Desk(DeskError::Reslot { unsaved, .. }) = &self {
            let body = ReslotBody {
                error: self.to_string(),
                unsaved,
            };
            return json_response(status, &body);
        }
        json_response(status, &keyed("error", self.to_string()))
    }
}
