use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lumascrape::ScraperError;
use lumascrape::export::ExportError;

use crate::envelope::Envelope;

#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    #[error("Missing required parameter: {0}")]
    Missing(&'static str),
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Invalid request: {0}")]
    Malformed(String),
    #[error("No events provided")]
    NoEvents,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Scrape(#[from] ScraperError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("Endpoint not found: {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Param(_) | ApiError::Export(_) => StatusCode::BAD_REQUEST,
            ApiError::Scrape(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        } else {
            log::warn!("Request rejected: {}", self);
        }
        (status, Json(Envelope::error(self.to_string()))).into_response()
    }
}
