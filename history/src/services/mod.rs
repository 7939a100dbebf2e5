pub mod history;
pub mod ingest;
pub use history::HistoryService;

use axum::{
    response::IntoResponse,
    http::StatusCode,
    Json
};
use crate::api::models::ApiResponse;

pub struct AppError(pub common::Error);

impl AppError {
    pub fn bad_request(message: String) -> Self {
        AppError(common::Error::InvalidInput(message))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match self.0 {
            common::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            common::Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status_code.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = Json(ApiResponse::<()>::error(self.0.to_string()));
        (status_code, body).into_response()
    }
}

impl From<common::Error> for AppError {
    fn from(err: common::Error) -> Self {
        AppError(err)
    }
}
