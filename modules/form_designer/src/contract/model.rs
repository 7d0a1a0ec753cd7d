//! Contract models for form designer
//!
//! These models are transport-agnostic and used for inter-module communication.
//! NO serde derives - these are pure domain models.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// HTTP method a form is submitted with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMethod {
    #[default]
    Post,
    Get,
}

impl FormMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Get => "GET",
        }
    }
}

impl FromStr for FormMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(Self::Post),
            "GET" => Ok(Self::Get),
            other => Err(format!("unsupported form method '{}'", other)),
        }
    }
}

impl fmt::Display for FormMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of input kinds a definition field may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKind {
    Boolean,
    NullBoolean,
    Char,
    Choice,
    Date,
    DateTime,
    Time,
    Decimal,
    Email,
    File,
    Float,
    Integer,
    MultipleChoice,
    Regex,
    Url,
    ModelChoice,
    ModelMultipleChoice,
}

impl FieldKind {
    pub const ALL: [FieldKind; 17] = [
        Self::Boolean,
        Self::NullBoolean,
        Self::Char,
        Self::Choice,
        Self::Date,
        Self::DateTime,
        Self::Time,
        Self::Decimal,
        Self::Email,
        Self::File,
        Self::Float,
        Self::Integer,
        Self::MultipleChoice,
        Self::Regex,
        Self::Url,
        Self::ModelChoice,
        Self::ModelMultipleChoice,
    ];

    /// Stable tag used in storage, configuration and the REST API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::NullBoolean => "null_boolean",
            Self::Char => "char",
            Self::Choice => "choice",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::Time => "time",
            Self::Decimal => "decimal",
            Self::Email => "email",
            Self::File => "file",
            Self::Float => "float",
            Self::Integer => "integer",
            Self::MultipleChoice => "multiple_choice",
            Self::Regex => "regex",
            Self::Url => "url",
            Self::ModelChoice => "model_choice",
            Self::ModelMultipleChoice => "model_multiple_choice",
        }
    }

    /// Kinds whose submitted value is a list
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, Self::MultipleChoice | Self::ModelMultipleChoice)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Kinds that require a regular expression on the definition
    pub fn requires_regex(&self) -> bool {
        matches!(self, Self::Regex)
    }

    /// Kinds that require a choice model reference on the definition
    pub fn requires_choice_model(&self) -> bool {
        matches!(self, Self::ModelChoice | Self::ModelMultipleChoice)
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown field kind '{}'", s))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of widgets a field may be rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WidgetKind {
    TextInput,
    Textarea,
    PasswordInput,
    HiddenInput,
    EmailInput,
    UrlInput,
    NumberInput,
    CheckboxInput,
    NullBooleanSelect,
    Select,
    SelectMultiple,
    RadioSelect,
    CheckboxSelectMultiple,
    DateInput,
    DateTimeInput,
    TimeInput,
    FileInput,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 17] = [
        Self::TextInput,
        Self::Textarea,
        Self::PasswordInput,
        Self::HiddenInput,
        Self::EmailInput,
        Self::UrlInput,
        Self::NumberInput,
        Self::CheckboxInput,
        Self::NullBooleanSelect,
        Self::Select,
        Self::SelectMultiple,
        Self::RadioSelect,
        Self::CheckboxSelectMultiple,
        Self::DateInput,
        Self::DateTimeInput,
        Self::TimeInput,
        Self::FileInput,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextInput => "text_input",
            Self::Textarea => "textarea",
            Self::PasswordInput => "password_input",
            Self::HiddenInput => "hidden_input",
            Self::EmailInput => "email_input",
            Self::UrlInput => "url_input",
            Self::NumberInput => "number_input",
            Self::CheckboxInput => "checkbox_input",
            Self::NullBooleanSelect => "null_boolean_select",
            Self::Select => "select",
            Self::SelectMultiple => "select_multiple",
            Self::RadioSelect => "radio_select",
            Self::CheckboxSelectMultiple => "checkbox_select_multiple",
            Self::DateInput => "date_input",
            Self::DateTimeInput => "date_time_input",
            Self::TimeInput => "time_input",
            Self::FileInput => "file_input",
        }
    }
}

impl FromStr for WidgetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|widget| widget.as_str() == s)
            .ok_or_else(|| format!("unknown widget '{}'", s))
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted schema for one form
#[derive(Debug, Clone, PartialEq)]
pub struct FormDefinition {
    /// Storage identity (0 until first save)
    pub id: i32,
    /// Unique slug
    pub name: String,
    /// Form is only reachable through its public hash
    pub require_hash: bool,
    /// Random token generated on first save, never regenerated
    pub private_hash: String,
    /// Random token generated on first save, never regenerated
    pub public_hash: String,
    pub title: Option<String>,
    pub body: Option<String>,
    /// Target URL; also the redirect target after a successful submission
    pub action: Option<String>,
    /// Recipient list template (comma or semicolon separated)
    pub mail_to: Option<String>,
    pub mail_from: Option<String>,
    pub mail_reply_to: Option<String>,
    pub mail_subject: Option<String>,
    pub mail_uploaded_files: bool,
    pub method: FormMethod,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
    pub submit_label: Option<String>,
    pub log_data: bool,
    pub save_uploaded_files: bool,
    pub success_redirect: bool,
    pub success_clear: bool,
    pub allow_get_initial: bool,
    /// Inline message body template
    pub message_template: Option<String>,
    /// Named message body template; wins over the inline template
    pub message_template_name: Option<String>,
    pub form_template_name: Option<String>,
    pub display_logged: bool,
    pub html_default_template: bool,
    /// Fields owned by this definition
    pub fields: Vec<FormDefinitionField>,
}

impl FormDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            require_hash: false,
            private_hash: String::new(),
            public_hash: String::new(),
            title: None,
            body: None,
            action: None,
            mail_to: None,
            mail_from: None,
            mail_reply_to: None,
            mail_subject: None,
            mail_uploaded_files: true,
            method: FormMethod::Post,
            success_message: None,
            error_message: None,
            submit_label: None,
            log_data: true,
            save_uploaded_files: true,
            success_redirect: true,
            success_clear: true,
            allow_get_initial: true,
            message_template: None,
            message_template_name: None,
            form_template_name: None,
            display_logged: false,
            html_default_template: false,
            fields: Vec::new(),
        }
    }

    /// Title if set, otherwise the slug
    pub fn display_name(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.name,
        }
    }

    /// Fields in position order; ties keep insertion order
    pub fn ordered_fields(&self) -> Vec<&FormDefinitionField> {
        let mut fields: Vec<&FormDefinitionField> = self.fields.iter().collect();
        fields.sort_by_key(|field| field.position);
        fields
    }

    pub fn field(&self, name: &str) -> Option<&FormDefinitionField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// One typed, constrained input slot within a definition
#[derive(Debug, Clone, PartialEq)]
pub struct FormDefinitionField {
    pub id: i32,
    pub field_class: FieldKind,
    pub position: i32,
    /// Unique within the definition; the runtime form key
    pub name: String,
    pub label: Option<String>,
    pub required: bool,
    /// Whether the value goes into logs and mails
    pub include_result: bool,
    pub widget: Option<WidgetKind>,
    pub initial: Option<String>,
    pub help_text: Option<String>,
    /// Newline separated choice values
    pub choice_values: Option<String>,
    /// Newline separated choice labels, paired with values by position
    pub choice_labels: Option<String>,
    pub max_length: Option<u32>,
    pub min_length: Option<u32>,
    pub max_value: Option<f64>,
    pub min_value: Option<f64>,
    pub max_digits: Option<u32>,
    pub decimal_places: Option<u32>,
    pub regex: Option<String>,
    pub choice_model: Option<String>,
    pub choice_model_empty_label: Option<String>,
}

impl FormDefinitionField {
    pub fn new(name: impl Into<String>, field_class: FieldKind) -> Self {
        Self {
            id: 0,
            field_class,
            position: 0,
            name: name.into(),
            label: None,
            required: true,
            include_result: true,
            widget: None,
            initial: None,
            help_text: None,
            choice_values: None,
            choice_labels: None,
            max_length: None,
            min_length: None,
            max_value: None,
            min_value: None,
            max_digits: None,
            decimal_places: None,
            regex: None,
            choice_model: None,
            choice_model_empty_label: None,
        }
    }

    /// Label if set, otherwise the name
    pub fn display_label(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => &self.name,
        }
    }
}

/// One persisted submission record
#[derive(Debug, Clone, PartialEq)]
pub struct FormLog {
    pub id: i32,
    pub form_definition_id: i32,
    pub created_at: DateTime<Utc>,
    /// Submitting user; None for anonymous submissions
    pub created_by: Option<String>,
    /// Persisted values in persistence order
    pub values: Vec<FormValue>,
}

/// One persisted (field name, value) pair; the name is a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct FormValue {
    pub field_name: String,
    pub value: serde_json::Value,
}

/// A submission that has not been saved yet
///
/// Values can only be persisted once the log has an identity, so the
/// repository saves the log and its values together.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLog {
    pub form_definition_id: i32,
    pub created_by: Option<String>,
    pub values: Vec<FormValueEntry>,
}

/// Field value annotated with its current label
#[derive(Debug, Clone, PartialEq)]
pub struct FormValueEntry {
    pub name: String,
    pub value: serde_json::Value,
    /// None when the field no longer exists on the definition
    pub label: Option<String>,
}

impl FormValueEntry {
    pub fn new(name: impl Into<String>, value: serde_json::Value, label: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
            label,
        }
    }
}

/// A log together with its reconciled values
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedSubmission {
    pub log: FormLog,
    pub data: Vec<FormValueEntry>,
}

/// Rendered export ready for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub content_type: String,
    pub file_name: String,
    pub body: Vec<u8>,
}

/// Which logs an export covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSelection {
    /// Every log of one definition
    Definition(String),
    /// Explicit log identities, possibly across definitions
    Logs(Vec<i32>),
    /// Every log in the store
    All,
}
