//! Form Designer Module
//!
//! Administrators define web forms as data: a definition owns typed,
//! constrained fields. At request time a definition compiles into a runtime
//! form that validates submissions, logs them, mails them and exports the
//! logs as CSV or XLSX.

// Public exports
pub mod contract;
pub use contract::{
    client::FormsApi, error::FormsError, ExportSelection, ExportedFile, FieldError, FieldKind,
    FormDefinition, FormDefinitionField, FormLog, FormMethod, FormValue, FormValueEntry,
    LoggedSubmission, WidgetKind,
};

pub mod module;
pub use module::FormDesignerModule;

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
