use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use std::collections::BTreeMap;

/// Application error carrying an HTTP status, rendered by actix's
/// ResponseError machinery as the JSON envelope the frontend expects.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "Validation failed")]
    Validation(BTreeMap<&'static str, String>),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl AppError {
    fn error_label(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Validation Error",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::NotFound(_) => "Not Found",
            AppError::Conflict(_) => "Conflict",
            AppError::BadRequest(_) => "Bad Request",
            AppError::Internal => "Internal Server Error",
        }
    }

    /// Map a sqlx error from an INSERT/UPDATE into a 409 when it is a
    /// unique violation (Postgres code 23505), 500 otherwise.
    pub fn from_db_write(e: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23505") {
                return AppError::Conflict(conflict_message.to_string());
            }
        }
        tracing::error!(error = %e, "Database write failed");
        AppError::Internal
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let mut body = json!({
            "statusCode": status.as_u16(),
            "error": self.error_label(),
            "message": self.to_string(),
        });

        if let AppError::Validation(fields) = self {
            body["message"] = json!("Validation failed. Please check your input.");
            body["details"] = json!(fields);
        }

        HttpResponse::build(status).json(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        AppError::Internal
    }
}

/// Accumulates field-level validation messages and turns into a 400.
#[derive(Debug, Default)]
pub struct FieldErrors {
    fields: BTreeMap<&'static str, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    /// Ok(()) when nothing was collected, otherwise the Validation error.
    pub fn finish(self) -> Result<(), AppError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.fields))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_is_400_with_field_details() {
        let mut errors = FieldErrors::new();
        errors.push("cpf", "Invalid CPF format.");
        errors.push("password", "Password must be at least 6 characters long.");

        let err = errors.finish().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn first_message_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.push("email", "Invalid email address.");
        errors.push("email", "second message ignored");

        match errors.finish().unwrap_err() {
            AppError::Validation(fields) => {
                assert_eq!(fields.get("email").unwrap(), "Invalid email address.");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_field_errors_is_ok() {
        assert!(FieldErrors::new().finish().is_ok());
    }

    #[test]
    fn status_codes_match_variants() {
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
