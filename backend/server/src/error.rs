use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use graph::GraphError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Server is missing FB_APP_ID/FB_APP_SECRET")]
    MissingAppCredentials,

    #[error("Missing token")]
    MissingToken,

    #[error("No Facebook Pages available for this user. Ensure pages_show_list permission is granted.")]
    NoPages,

    #[error("Missing Page access token. Ensure pages_read_engagement/pages_show_list are granted.")]
    MissingPageToken,

    #[error("Auth/Setup failed")]
    Upstream(#[from] GraphError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Upstream(..) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };

        let body = match &self {
            AppError::Upstream(source) => {
                json!({ "error": self.to_string(), "details": source.details() })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
