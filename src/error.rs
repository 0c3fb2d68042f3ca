use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Failures that end a page request. User-facing problems (validation,
/// service failures) are rendered as notices instead and never get here.
#[derive(Error, Debug)]
pub enum AppError {
  #[error("Storage error: {0}")]
  Store(#[from] StoreError),

  #[error("Render error: {0}")]
  Render(#[from] handlebars::RenderError),
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    error!(target: "intake_frontend", error = %self, "Request failed");
    let status = match self {
      AppError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, self.to_string()).into_response()
  }
}
