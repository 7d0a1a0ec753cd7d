//! Contract error types for form designer
//!
//! These errors are transport-agnostic and used for inter-module communication.

use thiserror::Error;

/// Validation message attached to one field of a definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name, or `__all__` for definition-level problems
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

/// Form designer domain errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormsError {
    /// Definition, log or other resource not found
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Request-level validation error
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Definition rejected at save time
    #[error("Invalid form definition: {}", format_field_errors(.errors))]
    InvalidDefinition { errors: Vec<FieldError> },

    /// Unknown or disabled field kind, widget, choice model or template
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Mail transport failed; not retried
    #[error("Mail delivery failed: {message}")]
    Delivery { message: String },

    /// Export format unknown or disabled in this build
    #[error("Export format not available: {format}")]
    ExportFormatUnavailable { format: String },

    /// Persistence collaborator failed
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error")]
    Internal,
}

impl FormsError {
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn storage(error: anyhow::Error) -> Self {
        tracing::error!("Storage failure: {:?}", error);
        Self::Storage {
            message: error.to_string(),
        }
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}
