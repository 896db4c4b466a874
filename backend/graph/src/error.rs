use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        body: Value,
    },
}

impl GraphError {
    /// Builds an [`GraphError::Api`] from a non-success response body.
    ///
    /// Graph API errors look like `{"error": {"message": "...", ...}}`; anything
    /// else falls back to a generic status message.
    pub fn from_response(status: u16, body: Value) -> Self {
        let message = body
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status code {status}"));

        GraphError::Api {
            status,
            message,
            body,
        }
    }

    /// Upstream body when there is one, otherwise the error message.
    pub fn details(&self) -> Value {
        match self {
            GraphError::Api { body, .. } if !body.is_null() => body.clone(),
            other => Value::String(other.to_string()),
        }
    }
}
