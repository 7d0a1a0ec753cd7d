//! Native client implementation - wraps domain service for in-process calls

use crate::contract::{
    ExportSelection, ExportedFile, FormDefinition, FormValueEntry, FormsApi, FormsError, LoggedSubmission,
};
use crate::domain::Service;
use async_trait::async_trait;
use std::sync::Arc;

/// Native client implementation that directly calls the domain service
///
/// Used for in-process communication without HTTP overhead.
#[derive(Clone)]
pub struct NativeClient {
    service: Arc<Service>,
}

impl NativeClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl FormsApi for NativeClient {
    async fn create_definition(&self, definition: FormDefinition) -> Result<FormDefinition, FormsError> {
        self.service.create_definition(definition).await
    }

    async fn update_definition(&self, definition: FormDefinition) -> Result<FormDefinition, FormsError> {
        self.service.update_definition(definition).await
    }

    async fn get_definition(&self, id: i32) -> Result<FormDefinition, FormsError> {
        self.service.get_definition(id).await
    }

    async fn find_definition_by_name(&self, name: &str) -> Result<FormDefinition, FormsError> {
        self.service.find_definition_by_name(name).await
    }

    async fn list_definitions(&self) -> Result<Vec<FormDefinition>, FormsError> {
        self.service.list_definitions().await
    }

    async fn delete_definition(&self, id: i32) -> Result<(), FormsError> {
        self.service.delete_definition(id).await
    }

    async fn read_log(&self, log_id: i32) -> Result<LoggedSubmission, FormsError> {
        self.service.read_log(log_id).await
    }

    async fn list_logs(&self, definition_name: &str) -> Result<Vec<LoggedSubmission>, FormsError> {
        self.service.list_logs(definition_name).await
    }

    async fn record_values(&self, log_id: i32, values: Vec<FormValueEntry>) -> Result<(), FormsError> {
        self.service.record_values(log_id, &values).await
    }

    fn available_exporters(&self) -> Vec<String> {
        self.service
            .available_exporters()
            .into_iter()
            .map(|format| format.name().to_string())
            .collect()
    }

    async fn export(&self, format: &str, selection: ExportSelection) -> Result<ExportedFile, FormsError> {
        self.service.export(format, selection).await
    }
}
