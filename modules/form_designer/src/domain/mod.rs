//! Domain layer - business logic and services

pub mod export;
pub mod fields;
pub mod form;
pub mod log_store;
pub mod mail;
pub mod repository;
pub mod service;
pub mod submission;
pub mod template;
pub mod uploads;
pub mod validation;

pub use fields::{Choice, ChoiceSource, FieldCompiler, StaticChoices};
pub use form::{install_form_compiler, DesignedFormCompiler, FormCompiler, FormData, RuntimeForm};
pub use mail::{BuiltinTemplates, LogMailTransport, MailMessage, MailTransport, TemplateResolver};
pub use repository::{DefinitionRepository, LogRepository};
pub use service::Service;
pub use submission::{ProcessOptions, SubmissionOutcome, SubmissionRequest, SubmissionState};
