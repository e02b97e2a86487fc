use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotExposed,
    Validation,
    Internal,
}

/// Error value carried by a failed return frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Backends are not required to send a structured error; anything that
    /// is not an `ApiError` becomes an internal error carrying its text.
    pub fn from_value(value: serde_json::Value) -> Self {
        match serde_json::from_value::<ApiError>(value.clone()) {
            Ok(err) => err,
            Err(_) => {
                let message = match value {
                    serde_json::Value::String(text) => text,
                    serde_json::Value::Null => "backend call failed".to_string(),
                    other => other.to_string(),
                };
                Self::new(ErrorCode::Internal, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_error_values_decode() {
        let err = ApiError::from_value(json!({"code": "not_exposed", "message": "nope"}));
        assert_eq!(err, ApiError::new(ErrorCode::NotExposed, "nope"));
    }

    #[test]
    fn plain_error_values_become_internal() {
        let err = ApiError::from_value(json!("Traceback: boom"));
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "Traceback: boom");

        let err = ApiError::from_value(serde_json::Value::Null);
        assert_eq!(err.message, "backend call failed");
    }
}
