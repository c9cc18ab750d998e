// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found; `data` optionally echoes what the caller asked for
    // (e.g. the identifier list of a delete that matched nothing)
    NotFound {
        message: String,
        data: Option<Value>,
    },

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound { .. } => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError {
                message,
                field_errors,
            } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            ApiError::NotFound { message, data } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "NOT_FOUND"
                });

                if let Some(data) = data {
                    response["data"] = data.clone();
                }

                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
            data: None,
        }
    }

    pub fn not_found_with(message: impl Into<String>, data: Value) -> Self {
        ApiError::NotFound {
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<crate::store::StoreError> for ApiError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::NotFound(msg) => ApiError::not_found(msg),
            crate::store::StoreError::InvalidCollection(name) => {
                ApiError::bad_request(format!("Invalid collection name: {}", name))
            }
            crate::store::StoreError::ConfigMissing(key) => {
                tracing::error!("Missing store configuration: {}", key);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            crate::store::StoreError::InvalidDatabaseUrl => {
                tracing::error!("Invalid DATABASE_URL");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            crate::store::StoreError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Internal Server Error")
            }
            crate::store::StoreError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
        }
    }
}

impl From<crate::store::record::RecordError> for ApiError {
    fn from(err: crate::store::record::RecordError) -> Self {
        match err {
            crate::store::record::RecordError::InvalidJson(msg) => ApiError::invalid_json(msg),
            crate::store::record::RecordError::InvalidId(value) => {
                ApiError::bad_request(format!("Invalid record identifier: {}", value))
            }
            crate::store::record::RecordError::MissingField(field) => {
                let mut field_errors = HashMap::new();
                field_errors.insert(field.clone(), "This field is required".to_string());
                ApiError::validation_error("Missing required fields", Some(field_errors))
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

/// Handler result type: a JSON body or an ApiError response
pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ApiError::unauthorized("Not Authenticated!").status_code(), 401);
        assert_eq!(ApiError::bad_request("Invalid IDs format").status_code(), 400);
        assert_eq!(ApiError::not_found("no such record").status_code(), 404);
        assert_eq!(ApiError::internal_server_error("oops").status_code(), 500);
    }

    #[test]
    fn not_found_echoes_data_payload() {
        let err = ApiError::not_found_with("Nothing deleted", json!(["a", "b"]));
        let body = err.to_json();
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["data"], json!(["a", "b"]));
    }

    #[test]
    fn store_errors_never_leak_details() {
        let err: ApiError = crate::store::StoreError::Sqlx(sqlx::Error::PoolClosed).into();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), "Internal Server Error");
    }

    #[test]
    fn validation_error_carries_field_errors() {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), "Must be one of the options".to_string());
        let body = ApiError::validation_error("Validation failed", Some(fields)).to_json();
        assert_eq!(body["field_errors"]["status"], "Must be one of the options");
    }
}
