use shared::error::{ApiError, ApiException, ErrorCode, FieldError};
use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error - please check your connection";

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error(transparent)]
    Api(#[from] ApiException),
    #[error("failed to persist priority for {resource} {id}: {source}")]
    Conflict {
        resource: String,
        id: i64,
        #[source]
        source: Box<ClientError>,
    },
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("cannot move index {source_index} to {destination_index} in a list of {len}")]
    InvalidMove {
        source_index: usize,
        destination_index: usize,
        len: usize,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn validation(fields: Vec<FieldError>) -> Self {
        let message = match fields.as_slice() {
            [] => "Invalid input".to_string(),
            [only] => only.message.clone(),
            _ => "Please correct the highlighted fields".to_string(),
        };
        Self::Validation { message, fields }
    }

    /// Maps a non-2xx response to the error taxonomy. 422 is a validation failure.
    pub fn from_response(status: u16, body: &str) -> Self {
        let api = ApiError::from_response(status, body);
        if api.code == ErrorCode::Validation {
            return Self::Validation {
                message: api.message,
                fields: api.fields,
            };
        }
        Self::Api(api.into())
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(api) => Some(api.status),
            Self::Conflict { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation { fields, .. } => fields,
            _ => &[],
        }
    }

    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::Api(api) => api.message.clone(),
            Self::Conflict { source, .. } => source.user_message(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::from_response(status.as_u16(), "");
        }
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
