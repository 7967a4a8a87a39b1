use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            422 => Self::Validation,
            429 => Self::RateLimited,
            400..=499 => Self::BadRequest,
            _ => Self::Internal,
        }
    }
}

/// A single field-level validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// One entry of a 422 `detail` array: `{"loc": ["body", "client_email"], "msg": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldViolation {
    #[serde(default)]
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl FieldViolation {
    pub fn field(&self) -> String {
        match self.loc.last() {
            Some(Value::String(name)) => name.clone(),
            Some(other) => other.to_string(),
            None => "body".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Text(String),
    Violations(Vec<FieldViolation>),
    Other(Value),
}

/// Error body as returned by the API's exception handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl ApiError {
    pub fn new(code: ErrorCode, status: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Builds the user-facing error for a non-2xx response.
    ///
    /// Message precedence is `detail` text, then `message`, then `HTTP {status} Error`.
    pub fn from_response(status: u16, body: &str) -> Self {
        let code = ErrorCode::from_status(status);
        let fallback = format!("HTTP {status} Error");
        let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) else {
            return Self::new(code, status, fallback);
        };

        let mut fields = Vec::new();
        let detail_text = match parsed.detail {
            Some(ErrorDetail::Text(text)) if !text.trim().is_empty() => Some(text),
            Some(ErrorDetail::Violations(violations)) => {
                fields = violations
                    .iter()
                    .map(|v| FieldError::new(v.field(), v.msg.clone()))
                    .collect();
                None
            }
            _ => None,
        };

        let message = detail_text
            .or(parsed.message.filter(|m| !m.trim().is_empty()))
            .unwrap_or(fallback);

        Self {
            code,
            status,
            message,
            fields,
        }
    }
}

#[derive(Debug, Error)]
#[error("{code:?} ({status}): {message}")]
pub struct ApiException {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
}

impl From<ApiError> for ApiException {
    fn from(value: ApiError) -> Self {
        Self {
            code: value.code,
            status: value.status,
            message: value.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_text_wins_over_message() {
        let err = ApiError::from_response(
            404,
            r#"{"detail":"Developer not found","message":"ignored"}"#,
        );
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Developer not found");
        assert!(err.fields.is_empty());
    }

    #[test]
    fn validation_detail_becomes_field_errors() {
        let body = r#"{
            "detail": [
                {"loc": ["body", "client_email"], "msg": "value is not a valid email address", "type": "value_error"},
                {"loc": ["body", "description"], "msg": "field required", "type": "missing"}
            ],
            "message": "Validation failed - check server logs for details"
        }"#;
        let err = ApiError::from_response(422, body);
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, "Validation failed - check server logs for details");
        assert_eq!(
            err.fields,
            vec![
                FieldError::new("client_email", "value is not a valid email address"),
                FieldError::new("description", "field required"),
            ]
        );
    }

    #[test]
    fn unparseable_body_falls_back_to_status_text() {
        let err = ApiError::from_response(502, "<html>bad gateway</html>");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "HTTP 502 Error");
    }
}
