//! Repository traits for data access
//!
//! These traits define the interface for data access operations.
//! Implementations are in infra/storage/repositories.rs

use crate::contract::{FormDefinition, FormLog, FormValueEntry, PendingLog};
use anyhow::Result;
use async_trait::async_trait;

/// Repository for form definitions and their fields
#[async_trait]
pub trait DefinitionRepository: Send + Sync {
    /// Insert a definition with its fields; returns it with identities assigned
    async fn create(&self, definition: &FormDefinition) -> Result<FormDefinition>;

    /// Replace a definition's attributes and field set
    async fn update(&self, definition: &FormDefinition) -> Result<FormDefinition>;

    async fn find_by_id(&self, id: i32) -> Result<Option<FormDefinition>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<FormDefinition>>;

    async fn find_by_public_hash(&self, hash: &str) -> Result<Option<FormDefinition>>;

    async fn list_all(&self) -> Result<Vec<FormDefinition>>;

    /// Delete a definition, its fields, and its logs with their values
    async fn delete(&self, id: i32) -> Result<()>;
}

/// Repository for submission logs and their values
#[async_trait]
pub trait LogRepository: Send + Sync {
    /// Save a pending log and its values in one transaction
    async fn save(&self, pending: &PendingLog) -> Result<FormLog>;

    /// Replace every value of a log in one transaction
    async fn replace_values(&self, log_id: i32, values: &[FormValueEntry]) -> Result<()>;

    async fn find_by_id(&self, id: i32) -> Result<Option<FormLog>>;

    /// Logs of one definition, oldest first
    async fn find_by_definition(&self, definition_id: i32) -> Result<Vec<FormLog>>;

    /// Logs with the given identities, in identity order; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<FormLog>>;

    /// Every log, oldest first
    async fn list_all(&self) -> Result<Vec<FormLog>>;
}
