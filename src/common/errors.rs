use crate::common::validation::{Violation, Violations};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use std::fmt;

/// Error kinds surfaced by the store, the sample lifecycle and the API
#[derive(Debug, Clone)]
pub enum BusinessError {
    /// Payload shape, range or enumeration violation (400 Bad Request)
    ValidationError {
        field: String,
        message: String,
        violations: Vec<Violation>,
    },
    /// Referenced or requested entity absent (404 Not Found)
    NotFound { resource: String, id: String },
    /// Delete blocked by a live reference (409 Conflict)
    ReferentialIntegrity {
        resource: String,
        id: String,
        referenced_by: String,
    },
    /// Unique constraint violation (409 Conflict)
    Duplicate { resource: String, field: String },
    /// Operation not legal in the current lifecycle state (422 Unprocessable Entity)
    InvalidState {
        resource: String,
        id: String,
        message: String,
    },
    /// Transaction failure, always rolled back (500 Internal Server Error)
    StorageError { message: String },
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::ValidationError { field, message, .. } => {
                write!(f, "Validation error in field '{field}': {message}")
            }
            BusinessError::NotFound { resource, id } => {
                write!(f, "{resource} with id '{id}' not found")
            }
            BusinessError::ReferentialIntegrity {
                resource,
                id,
                referenced_by,
            } => {
                write!(f, "{resource} with id '{id}' is still referenced by {referenced_by}")
            }
            BusinessError::Duplicate { resource, field } => {
                write!(f, "{resource} with this {field} already exists")
            }
            BusinessError::InvalidState {
                resource,
                id,
                message,
            } => {
                write!(f, "{resource} with id '{id}' {message}")
            }
            BusinessError::StorageError { message } => {
                write!(f, "Storage error: {message}")
            }
        }
    }
}

impl std::error::Error for BusinessError {}

impl BusinessError {
    fn code(&self) -> &'static str {
        match self {
            BusinessError::ValidationError { .. } => "VALIDATION_ERROR",
            BusinessError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            BusinessError::ReferentialIntegrity { .. } => "REFERENTIAL_INTEGRITY_ERROR",
            BusinessError::Duplicate { .. } => "DUPLICATE_RESOURCE",
            BusinessError::InvalidState { .. } => "INVALID_STATE",
            BusinessError::StorageError { .. } => "STORAGE_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            BusinessError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            BusinessError::NotFound { .. } => StatusCode::NOT_FOUND,
            BusinessError::ReferentialIntegrity { .. } | BusinessError::Duplicate { .. } => {
                StatusCode::CONFLICT
            }
            BusinessError::InvalidState { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BusinessError::StorageError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert BusinessError to HTTP responses
impl IntoResponse for BusinessError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match &self {
            BusinessError::ValidationError {
                field,
                message,
                violations,
            } => json!({
                "error": {
                    "code": code,
                    "message": format!("Validation failed for field '{field}': {message}"),
                    "type": "ValidationError",
                    "field": field,
                    "violations": violations,
                }
            }),
            BusinessError::StorageError { message } => {
                tracing::error!("Storage error surfaced to client: {message}");
                json!({
                    "error": {
                        "code": code,
                        "message": "The operation could not be completed and was rolled back",
                        "type": "StorageError",
                    }
                })
            }
            other => json!({
                "error": {
                    "code": code,
                    "message": other.to_string(),
                    "type": format!("{other:?}").split([' ', '{']).next().unwrap_or("Unknown"),
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<Violations> for BusinessError {
    fn from(violations: Violations) -> Self {
        let first = violations.first().clone();
        BusinessError::ValidationError {
            field: first.field,
            message: first.reason,
            violations: violations.into_vec(),
        }
    }
}

impl From<DbErr> for BusinessError {
    fn from(err: DbErr) -> Self {
        ErrorMapper::map_db_error(err, "record")
    }
}

/// Maps storage errors onto business errors
pub struct ErrorMapper;

impl ErrorMapper {
    pub fn map_db_error(err: DbErr, context: &str) -> BusinessError {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => {
                return BusinessError::Duplicate {
                    resource: Self::extract_resource_from_context(context),
                    field: Self::extract_field_from_constraint(&msg),
                };
            }
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
                return BusinessError::ReferentialIntegrity {
                    resource: Self::extract_resource_from_context(context),
                    id: "unknown".to_string(),
                    referenced_by: msg,
                };
            }
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(msg) => BusinessError::NotFound {
                resource: Self::extract_resource_from_context(context),
                id: Self::extract_id_from_message(&msg),
            },
            DbErr::Exec(exec_err) => {
                let err_msg = exec_err.to_string();
                if err_msg.contains("UNIQUE constraint") || err_msg.contains("duplicate key") {
                    BusinessError::Duplicate {
                        resource: Self::extract_resource_from_context(context),
                        field: Self::extract_field_from_constraint(&err_msg),
                    }
                } else {
                    BusinessError::StorageError { message: err_msg }
                }
            }
            other => BusinessError::StorageError {
                message: other.to_string(),
            },
        }
    }

    fn extract_resource_from_context(context: &str) -> String {
        context.replace('_', " ")
    }

    /// Pulls the first integer out of a "not found" message
    fn extract_id_from_message(msg: &str) -> String {
        msg.split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_ascii_digit()))
            .find(|word| !word.is_empty() && word.parse::<i64>().is_ok())
            .map_or_else(|| "unknown".to_string(), str::to_string)
    }

    fn extract_field_from_constraint(msg: &str) -> String {
        if msg.contains("email") {
            "email".to_string()
        } else if msg.contains("sample_researchers") || msg.contains("researcher_id") {
            "sample and researcher pair".to_string()
        } else {
            "field".to_string()
        }
    }
}

/// Extension trait to add business error conversion to DbErr
pub trait DbErrorExt {
    fn to_business_error(self, context: &str) -> BusinessError;
}

impl DbErrorExt for DbErr {
    fn to_business_error(self, context: &str) -> BusinessError {
        ErrorMapper::map_db_error(self, context)
    }
}

#[macro_export]
macro_rules! not_found {
    ($resource:expr, $id:expr) => {
        $crate::common::errors::BusinessError::NotFound {
            resource: $resource.to_string(),
            id: $id.to_string(),
        }
    };
}

#[macro_export]
macro_rules! invalid_state {
    ($resource:expr, $id:expr, $message:expr) => {
        $crate::common::errors::BusinessError::InvalidState {
            resource: $resource.to_string(),
            id: $id.to_string(),
            message: $message.to_string(),
        }
    };
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;
