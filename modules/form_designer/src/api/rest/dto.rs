//! REST DTOs with serde derives for HTTP API

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ===== Definition DTOs =====

/// Form definition response DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FormDefinitionDto {
    pub id: i32,

    /// Unique slug
    #[schema(example = "contact")]
    pub name: String,

    pub require_hash: bool,

    /// Token for reaching the form when the slug is not exposed
    pub public_hash: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_subject: Option<String>,
    pub mail_uploaded_files: bool,

    #[schema(example = "POST")]
    pub method: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_label: Option<String>,
    pub log_data: bool,
    pub save_uploaded_files: bool,
    pub success_redirect: bool,
    pub success_clear: bool,
    pub allow_get_initial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_template_name: Option<String>,
    pub display_logged: bool,
    pub html_default_template: bool,

    pub fields: Vec<FormDefinitionFieldDto>,
}

/// Definition field DTO, used for both requests and responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FormDefinitionFieldDto {
    #[serde(default)]
    pub id: i32,

    /// Field kind tag
    #[schema(example = "char")]
    pub field_class: String,

    #[serde(default)]
    pub position: i32,

    #[schema(example = "email")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default = "default_true")]
    pub include_result: bool,

    /// Widget tag; the kind's default widget when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_values: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_labels: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_digits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_model_empty_label: Option<String>,
}

/// Create or update definition request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpsertFormDefinitionRequest {
    pub name: String,
    #[serde(default)]
    pub require_hash: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub mail_to: Option<String>,
    #[serde(default)]
    pub mail_from: Option<String>,
    #[serde(default)]
    pub mail_reply_to: Option<String>,
    #[serde(default)]
    pub mail_subject: Option<String>,
    #[serde(default = "default_true")]
    pub mail_uploaded_files: bool,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub success_message: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub submit_label: Option<String>,
    #[serde(default = "default_true")]
    pub log_data: bool,
    #[serde(default = "default_true")]
    pub save_uploaded_files: bool,
    #[serde(default = "default_true")]
    pub success_redirect: bool,
    #[serde(default = "default_true")]
    pub success_clear: bool,
    #[serde(default = "default_true")]
    pub allow_get_initial: bool,
    #[serde(default)]
    pub message_template: Option<String>,
    #[serde(default)]
    pub message_template_name: Option<String>,
    #[serde(default)]
    pub form_template_name: Option<String>,
    #[serde(default)]
    pub display_logged: bool,
    #[serde(default)]
    pub html_default_template: bool,
    #[serde(default)]
    pub fields: Vec<FormDefinitionFieldDto>,
}

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    "POST".to_string()
}

/// List of definitions response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FormDefinitionsListResponse {
    pub items: Vec<FormDefinitionDto>,
    pub total: usize,
}

// ===== Runtime Form DTOs =====

/// Choice offered by a choice field
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChoiceDto {
    pub value: String,
    pub label: String,
}

/// Compiled field as rendered to a client
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RuntimeFieldDto {
    pub name: String,
    pub kind: String,
    pub widget: String,
    pub label: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,

    /// Initial or submitted value(s)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceDto>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Runtime form state
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RuntimeFormDto {
    pub name: String,
    /// Hidden marker field a client must echo back to submit
    pub submit_flag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_label: Option<String>,
    pub method: String,
    pub fields: Vec<RuntimeFieldDto>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub non_field_errors: Vec<String>,
}

/// Flash message produced by a submission
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FlashMessageDto {
    /// "success" or "error"
    pub level: String,
    pub text: String,
}

/// Result of rendering or submitting a form
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmissionResponse {
    pub form_success: bool,
    pub form_error: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub messages: Vec<FlashMessageDto>,
    pub form: RuntimeFormDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_id: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<FormLogDto>,
}

// ===== Log DTOs =====

/// Reconciled log value
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FormValueDto {
    pub name: String,
    /// Current field label; absent when the field no longer exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub value: serde_json::Value,
}

/// Form log response DTO
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FormLogDto {
    pub id: i32,
    pub form_definition_id: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub data: Vec<FormValueDto>,
}

/// List of logs response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FormLogsListResponse {
    pub items: Vec<FormLogDto>,
    pub total: usize,
}

/// Replace log values request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordValuesRequest {
    pub values: Vec<RecordValueDto>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordValueDto {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub value: serde_json::Value,
}

// ===== Export DTOs =====

/// Export format available in this deployment
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExporterDto {
    #[schema(example = "CSV")]
    pub name: String,
    #[schema(example = "csv")]
    pub extension: String,
    pub content_type: String,
}

/// Export query: one definition by name or explicit log ids
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ExportQuery {
    /// Definition name
    pub form: Option<String>,
    /// Comma separated log ids
    pub ids: Option<String>,
}

