//! HTTP error mapping to RFC-9457 Problem Details

use crate::contract::FormsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// RFC-9457 Problem Details for HTTP API errors
#[derive(Debug, Serialize)]
pub struct Problem {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type")]
    pub type_uri: String,
    
    /// A short, human-readable summary of the problem type
    pub title: String,
    
    /// The HTTP status code
    pub status: u16,
    
    /// A human-readable explanation specific to this occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    
    /// A URI reference that identifies the specific occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl Problem {
    /// Create a new Problem Details response
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            type_uri: format!("https://httpstatuses.io/{}", status.as_u16()),
            title: title.into(),
            status: status.as_u16(),
            detail: None,
            instance: None,
        }
    }

    /// Add detail message
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Add instance URI
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Map domain errors to HTTP Problem Details
pub fn map_domain_error(error: FormsError) -> Problem {
    match error {
        FormsError::NotFound { resource, id } => Problem::new(
            StatusCode::NOT_FOUND,
            format!("{} Not Found", resource),
        )
        .with_detail(format!("{} '{}' was not found", resource, id)),

        FormsError::Validation { message } => Problem::new(
            StatusCode::BAD_REQUEST,
            "Validation Error",
        )
        .with_detail(message),

        error @ FormsError::InvalidDefinition { .. } => Problem::new(
            StatusCode::BAD_REQUEST,
            "Invalid Form Definition",
        )
        .with_detail(error.to_string()),

        FormsError::ExportFormatUnavailable { format } => Problem::new(
            StatusCode::NOT_FOUND,
            "Export Format Not Available",
        )
        .with_detail(format!("Export format '{}' is unknown or disabled", format)),

        FormsError::Delivery { message } => {
            tracing::error!("Mail delivery failed: {}", message);
            Problem::new(StatusCode::BAD_GATEWAY, "Mail Delivery Failed")
                .with_detail("The notification mail could not be sent")
        }

        FormsError::Configuration { message } => {
            tracing::error!("Form configuration error: {}", message);
            Problem::new(StatusCode::INTERNAL_SERVER_ERROR, "Form Configuration Error")
                .with_detail(message)
        }

        FormsError::Storage { .. } | FormsError::Internal => Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
        )
        .with_detail("An unexpected error occurred"),
    }
}
