//! Domain service - business logic orchestration

use super::export::{export_logs, ExportFormat, ExportRow, ExporterRegistry};
use super::fields::FieldCompiler;
use super::form::{self, FormData, RuntimeForm};
use super::log_store::reconcile;
use super::mail::{MailTransport, TemplateResolver};
use super::repository::{DefinitionRepository, LogRepository};
use super::submission::{ProcessOptions, SubmissionOutcome, SubmissionProcessor, SubmissionRequest};
use super::uploads::{self, UploadedFile};
use super::validation::validate_definition;
use crate::config::Config;
use crate::contract::{
    ExportSelection, ExportedFile, FormDefinition, FormLog, FormValueEntry, FormsError, LoggedSubmission,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

const HASH_LENGTH: usize = 32;

/// Random hex token for definition URLs
pub fn random_hash() -> String {
    let mut seed = [0u8; 32];
    rand::rng().fill_bytes(&mut seed);
    let digest = hex::encode(Sha256::digest(seed));
    digest[..HASH_LENGTH].to_string()
}

/// Domain service for form definitions, submissions and logs
pub struct Service {
    definitions: Arc<dyn DefinitionRepository>,
    logs: Arc<dyn LogRepository>,
    fields: Arc<FieldCompiler>,
    processor: SubmissionProcessor,
    exporters: ExporterRegistry,
    choice_models: Vec<String>,
    temp_dir: PathBuf,
}

impl Service {
    /// Create a new service instance
    pub fn new(
        config: &Config,
        definitions: Arc<dyn DefinitionRepository>,
        logs: Arc<dyn LogRepository>,
        fields: FieldCompiler,
        templates: Arc<dyn TemplateResolver>,
        mailer: Arc<dyn MailTransport>,
    ) -> Result<Self, FormsError> {
        let settings = config
            .export_settings()
            .map_err(|e| FormsError::configuration(e.to_string()))?;
        let exporters = ExporterRegistry::new(&config.export.exporters, settings)?;
        let fields = Arc::new(fields);

        let processor = SubmissionProcessor {
            fields: fields.clone(),
            submit_flag_template: config.submit_flag_name.clone(),
            upload_policy: config.upload_policy(),
            storage_dir: config.uploads.storage_dir.clone(),
            templates,
            default_templates: (
                config.message_templates.text.clone(),
                config.message_templates.html.clone(),
            ),
            mailer,
            logs: logs.clone(),
            default_success_message: config.default_success_message.clone(),
            default_error_message: config.default_error_message.clone(),
        };

        Ok(Self {
            definitions,
            logs,
            fields,
            processor,
            exporters,
            choice_models: config.choice_models.clone(),
            temp_dir: config.uploads.temp_dir.clone(),
        })
    }

    // ===== Definition Operations =====

    /// Validate and insert a definition; hashes are generated here once
    pub async fn create_definition(&self, mut definition: FormDefinition) -> Result<FormDefinition, FormsError> {
        validate_definition(&definition, &self.fields, &self.choice_models)?;
        if self
            .definitions
            .find_by_name(&definition.name)
            .await
            .map_err(FormsError::storage)?
            .is_some()
        {
            return Err(FormsError::InvalidDefinition {
                errors: vec![crate::contract::FieldError::new(
                    "name",
                    "Form definition with this name already exists.",
                )],
            });
        }

        definition.id = 0;
        definition.private_hash = random_hash();
        definition.public_hash = random_hash();
        let created = self
            .definitions
            .create(&definition)
            .await
            .map_err(FormsError::storage)?;
        tracing::info!(name = %created.name, id = created.id, "Form definition created");
        Ok(created)
    }

    /// Validate and update a definition; stored hashes are kept
    pub async fn update_definition(&self, mut definition: FormDefinition) -> Result<FormDefinition, FormsError> {
        let existing = self.get_definition(definition.id).await?;
        validate_definition(&definition, &self.fields, &self.choice_models)?;
        if let Some(other) = self
            .definitions
            .find_by_name(&definition.name)
            .await
            .map_err(FormsError::storage)?
        {
            if other.id != definition.id {
                return Err(FormsError::InvalidDefinition {
                    errors: vec![crate::contract::FieldError::new(
                        "name",
                        "Form definition with this name already exists.",
                    )],
                });
            }
        }

        definition.private_hash = existing.private_hash;
        definition.public_hash = existing.public_hash;
        let updated = self
            .definitions
            .update(&definition)
            .await
            .map_err(FormsError::storage)?;
        tracing::info!(name = %updated.name, id = updated.id, "Form definition updated");
        Ok(updated)
    }

    pub async fn get_definition(&self, id: i32) -> Result<FormDefinition, FormsError> {
        self.definitions
            .find_by_id(id)
            .await
            .map_err(FormsError::storage)?
            .ok_or_else(|| FormsError::not_found("form definition", id))
    }

    /// Look up by slug; definitions requiring the hash are not reachable this way
    pub async fn get_definition_by_name(&self, name: &str) -> Result<FormDefinition, FormsError> {
        self.definitions
            .find_by_name(name)
            .await
            .map_err(FormsError::storage)?
            .filter(|definition| !definition.require_hash)
            .ok_or_else(|| FormsError::not_found("form definition", name))
    }

    pub async fn get_definition_by_hash(&self, hash: &str) -> Result<FormDefinition, FormsError> {
        self.definitions
            .find_by_public_hash(hash)
            .await
            .map_err(FormsError::storage)?
            .ok_or_else(|| FormsError::not_found("form definition", hash))
    }

    /// Look up by slug for administration, ignoring the hash requirement
    pub async fn find_definition_by_name(&self, name: &str) -> Result<FormDefinition, FormsError> {
        self.definitions
            .find_by_name(name)
            .await
            .map_err(FormsError::storage)?
            .ok_or_else(|| FormsError::not_found("form definition", name))
    }

    pub async fn list_definitions(&self) -> Result<Vec<FormDefinition>, FormsError> {
        self.definitions.list_all().await.map_err(FormsError::storage)
    }

    /// Delete a definition together with its fields and logs
    pub async fn delete_definition(&self, id: i32) -> Result<(), FormsError> {
        let definition = self.get_definition(id).await?;
        self.definitions.delete(id).await.map_err(FormsError::storage)?;
        tracing::info!(name = %definition.name, id, "Form definition deleted");
        Ok(())
    }

    // ===== Runtime Forms =====

    /// Compile a runtime form with the process-wide compiler
    pub fn compile_form(
        &self,
        definition: &FormDefinition,
        initial: Option<&FormData>,
    ) -> Result<RuntimeForm, FormsError> {
        self.processor
            .compile(form::form_compiler().as_ref(), definition, initial)
    }

    pub async fn process_submission(
        &self,
        definition: &FormDefinition,
        request: SubmissionRequest,
        options: ProcessOptions,
    ) -> Result<SubmissionOutcome, FormsError> {
        self.processor.process(definition, request, options).await
    }

    /// Write request bytes to temporary upload storage
    pub async fn spool_upload(
        &self,
        field_name: &str,
        file_name: &str,
        content_type: Option<String>,
        bytes: &[u8],
    ) -> Result<UploadedFile, FormsError> {
        uploads::spool(&self.temp_dir, field_name, file_name, content_type, bytes)
            .await
            .map_err(FormsError::storage)
    }

    // ===== Log Operations =====

    /// Replace every value of a log
    pub async fn record_values(&self, log_id: i32, values: &[FormValueEntry]) -> Result<(), FormsError> {
        self.find_log(log_id).await?;
        self.logs
            .replace_values(log_id, values)
            .await
            .map_err(FormsError::storage)?;
        tracing::debug!(log_id, count = values.len(), "Log values replaced");
        Ok(())
    }

    /// A log reconciled against its definition's current fields
    pub async fn read_log(&self, log_id: i32) -> Result<LoggedSubmission, FormsError> {
        let log = self.find_log(log_id).await?;
        let definition = self.get_definition(log.form_definition_id).await?;
        let data = reconcile(&definition.ordered_fields(), &log.values);
        Ok(LoggedSubmission { log, data })
    }

    /// Every log of a definition, oldest first, reconciled
    pub async fn list_logs(&self, definition_name: &str) -> Result<Vec<LoggedSubmission>, FormsError> {
        let definition = self.find_definition_by_name(definition_name).await?;
        let logs = self
            .logs
            .find_by_definition(definition.id)
            .await
            .map_err(FormsError::storage)?;
        let fields = definition.ordered_fields();
        Ok(logs
            .into_iter()
            .map(|log| {
                let data = reconcile(&fields, &log.values);
                LoggedSubmission { log, data }
            })
            .collect())
    }

    async fn find_log(&self, log_id: i32) -> Result<FormLog, FormsError> {
        self.logs
            .find_by_id(log_id)
            .await
            .map_err(FormsError::storage)?
            .ok_or_else(|| FormsError::not_found("form log", log_id))
    }

    // ===== Export =====

    /// Formats enabled in this process, in configured order
    pub fn available_exporters(&self) -> Vec<ExportFormat> {
        self.exporters.available().to_vec()
    }

    /// Export the selected logs in the named format
    pub async fn export(&self, format: &str, selection: ExportSelection) -> Result<ExportedFile, FormsError> {
        let format = self.exporters.select(format)?;

        let logs = match &selection {
            ExportSelection::Definition(name) => {
                let definition = self.find_definition_by_name(name).await?;
                self.logs.find_by_definition(definition.id).await
            }
            ExportSelection::Logs(ids) => self.logs.find_by_ids(ids).await,
            ExportSelection::All => self.logs.list_all().await,
        }
        .map_err(FormsError::storage)?;

        let mut definitions: HashMap<i32, FormDefinition> = HashMap::new();
        for log in &logs {
            if !definitions.contains_key(&log.form_definition_id) {
                let definition = self.get_definition(log.form_definition_id).await?;
                definitions.insert(definition.id, definition);
            }
        }

        let reconciled: Vec<(&FormDefinition, &FormLog, Vec<FormValueEntry>)> = logs
            .iter()
            .filter_map(|log| {
                let definition = definitions.get(&log.form_definition_id)?;
                let data = reconcile(&definition.ordered_fields(), &log.values);
                Some((definition, log, data))
            })
            .collect();
        let rows: Vec<ExportRow<'_>> = reconciled
            .iter()
            .map(|(definition, log, data)| ExportRow {
                definition,
                log,
                data,
            })
            .collect();

        let exporter = self.exporters.exporter(format)?;
        let file = export_logs(exporter, &rows, self.exporters.settings())?;
        tracing::info!(format = %format, rows = rows.len(), "Form logs exported");
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_hash_shape() {
        let a = random_hash();
        let b = random_hash();
        assert_eq!(a.len(), HASH_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
