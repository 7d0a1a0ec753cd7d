//! Native client trait for inter-module communication
//!
//! This trait defines the API that other modules use to administer forms and
//! read submission logs. NO HTTP - direct function calls for performance.

use super::{
    error::FormsError,
    model::{ExportSelection, ExportedFile, FormDefinition, FormValueEntry, LoggedSubmission},
};
use async_trait::async_trait;

/// Form designer API for inter-module communication
#[async_trait]
pub trait FormsApi: Send + Sync {
    // ===== Definition Operations =====

    /// Validate and store a new definition; hashes are generated once
    async fn create_definition(&self, definition: FormDefinition) -> Result<FormDefinition, FormsError>;

    /// Validate and replace a definition, keeping its hashes
    async fn update_definition(&self, definition: FormDefinition) -> Result<FormDefinition, FormsError>;

    async fn get_definition(&self, id: i32) -> Result<FormDefinition, FormsError>;

    /// Look up by slug regardless of the hash requirement
    async fn find_definition_by_name(&self, name: &str) -> Result<FormDefinition, FormsError>;

    async fn list_definitions(&self) -> Result<Vec<FormDefinition>, FormsError>;

    /// Delete a definition with its fields and logs
    async fn delete_definition(&self, id: i32) -> Result<(), FormsError>;

    // ===== Log Operations =====

    /// A log reconciled against its definition's current fields
    async fn read_log(&self, log_id: i32) -> Result<LoggedSubmission, FormsError>;

    /// Every log of a definition, oldest first
    async fn list_logs(&self, definition_name: &str) -> Result<Vec<LoggedSubmission>, FormsError>;

    /// Replace all values of a log
    async fn record_values(&self, log_id: i32, values: Vec<FormValueEntry>) -> Result<(), FormsError>;

    // ===== Export Operations =====

    /// Names of the export formats enabled in this process
    fn available_exporters(&self) -> Vec<String>;

    async fn export(&self, format: &str, selection: ExportSelection) -> Result<ExportedFile, FormsError>;
}
