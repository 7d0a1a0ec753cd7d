//! SeaORM repository implementations

use crate::contract::{FormDefinition, FormLog, FormValueEntry, PendingLog};
use crate::domain::repository::{DefinitionRepository, LogRepository};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;

use super::entity::{form_definition, form_definition_field, form_log, form_value};
use super::mapper;

// ===== Definition Repository =====

pub struct SeaOrmDefinitionRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmDefinitionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn assemble(&self, entity: form_definition::Model) -> Result<FormDefinition> {
        let fields = form_definition_field::Entity::find()
            .filter(form_definition_field::Column::FormDefinitionId.eq(entity.id))
            .order_by_asc(form_definition_field::Column::Position)
            .order_by_asc(form_definition_field::Column::Id)
            .all(&*self.db)
            .await?;
        mapper::definition_from_entities(entity, fields)
    }

    async fn assemble_optional(&self, entity: Option<form_definition::Model>) -> Result<Option<FormDefinition>> {
        match entity {
            Some(entity) => Ok(Some(self.assemble(entity).await?)),
            None => Ok(None),
        }
    }
}

async fn insert_fields<C: ConnectionTrait>(conn: &C, definition: &FormDefinition, definition_id: i32) -> Result<()> {
    for field in &definition.fields {
        mapper::field_active_model(definition_id, field)
            .insert(conn)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl DefinitionRepository for SeaOrmDefinitionRepository {
    async fn create(&self, definition: &FormDefinition) -> Result<FormDefinition> {
        let txn = self.db.begin().await?;
        let active: form_definition::ActiveModel = definition.into();
        let inserted = active.insert(&txn).await?;
        insert_fields(&txn, definition, inserted.id).await?;
        txn.commit().await?;

        self.find_by_id(inserted.id)
            .await?
            .ok_or_else(|| anyhow!("form definition {} vanished after insert", inserted.id))
    }

    async fn update(&self, definition: &FormDefinition) -> Result<FormDefinition> {
        let txn = self.db.begin().await?;
        let active: form_definition::ActiveModel = definition.into();
        active.update(&txn).await?;
        form_definition_field::Entity::delete_many()
            .filter(form_definition_field::Column::FormDefinitionId.eq(definition.id))
            .exec(&txn)
            .await?;
        insert_fields(&txn, definition, definition.id).await?;
        txn.commit().await?;

        self.find_by_id(definition.id)
            .await?
            .ok_or_else(|| anyhow!("form definition {} vanished after update", definition.id))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<FormDefinition>> {
        let entity = form_definition::Entity::find_by_id(id).one(&*self.db).await?;
        self.assemble_optional(entity).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<FormDefinition>> {
        let entity = form_definition::Entity::find()
            .filter(form_definition::Column::Name.eq(name))
            .one(&*self.db)
            .await?;
        self.assemble_optional(entity).await
    }

    async fn find_by_public_hash(&self, hash: &str) -> Result<Option<FormDefinition>> {
        let entity = form_definition::Entity::find()
            .filter(form_definition::Column::PublicHash.eq(hash))
            .one(&*self.db)
            .await?;
        self.assemble_optional(entity).await
    }

    async fn list_all(&self) -> Result<Vec<FormDefinition>> {
        let entities = form_definition::Entity::find()
            .order_by_asc(form_definition::Column::Name)
            .all(&*self.db)
            .await?;
        let mut definitions = Vec::with_capacity(entities.len());
        for entity in entities {
            definitions.push(self.assemble(entity).await?);
        }
        Ok(definitions)
    }

    async fn delete(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;
        let log_ids: Vec<i32> = form_log::Entity::find()
            .filter(form_log::Column::FormDefinitionId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|log| log.id)
            .collect();
        if !log_ids.is_empty() {
            form_value::Entity::delete_many()
                .filter(form_value::Column::FormLogId.is_in(log_ids))
                .exec(&txn)
                .await?;
        }
        form_log::Entity::delete_many()
            .filter(form_log::Column::FormDefinitionId.eq(id))
            .exec(&txn)
            .await?;
        form_definition_field::Entity::delete_many()
            .filter(form_definition_field::Column::FormDefinitionId.eq(id))
            .exec(&txn)
            .await?;
        form_definition::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

// ===== Log Repository =====

pub struct SeaOrmLogRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmLogRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Load values for a batch of logs, keeping persistence order
    async fn with_values(&self, logs: Vec<form_log::Model>) -> Result<Vec<FormLog>> {
        if logs.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = logs.iter().map(|log| log.id).collect();
        let values = form_value::Entity::find()
            .filter(form_value::Column::FormLogId.is_in(ids))
            .order_by_asc(form_value::Column::Id)
            .all(&*self.db)
            .await?;
        let mut by_log: HashMap<i32, Vec<form_value::Model>> = HashMap::new();
        for value in values {
            by_log.entry(value.form_log_id).or_default().push(value);
        }
        Ok(logs
            .into_iter()
            .map(|log| {
                let values = by_log.remove(&log.id).unwrap_or_default();
                mapper::log_from_entities(log, values)
            })
            .collect())
    }
}

async fn insert_values<C: ConnectionTrait>(
    conn: &C,
    log_id: i32,
    values: &[FormValueEntry],
) -> Result<Vec<form_value::Model>> {
    let mut inserted = Vec::with_capacity(values.len());
    for entry in values {
        let model = mapper::value_active_model(log_id, &entry.name, &entry.value)
            .insert(conn)
            .await?;
        inserted.push(model);
    }
    Ok(inserted)
}

#[async_trait]
impl LogRepository for SeaOrmLogRepository {
    async fn save(&self, pending: &PendingLog) -> Result<FormLog> {
        use sea_orm::ActiveValue::{NotSet, Set};

        let txn = self.db.begin().await?;
        let log = form_log::ActiveModel {
            id: NotSet,
            form_definition_id: Set(pending.form_definition_id),
            created_at: Set(chrono::Utc::now()),
            created_by: Set(pending.created_by.clone()),
        }
        .insert(&txn)
        .await?;
        let values = insert_values(&txn, log.id, &pending.values).await?;
        txn.commit().await?;

        Ok(mapper::log_from_entities(log, values))
    }

    async fn replace_values(&self, log_id: i32, values: &[FormValueEntry]) -> Result<()> {
        let txn = self.db.begin().await?;
        form_value::Entity::delete_many()
            .filter(form_value::Column::FormLogId.eq(log_id))
            .exec(&txn)
            .await?;
        insert_values(&txn, log_id, values).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<FormLog>> {
        let Some(log) = form_log::Entity::find_by_id(id).one(&*self.db).await? else {
            return Ok(None);
        };
        Ok(self.with_values(vec![log]).await?.pop())
    }

    async fn find_by_definition(&self, definition_id: i32) -> Result<Vec<FormLog>> {
        let logs = form_log::Entity::find()
            .filter(form_log::Column::FormDefinitionId.eq(definition_id))
            .order_by_asc(form_log::Column::CreatedAt)
            .order_by_asc(form_log::Column::Id)
            .all(&*self.db)
            .await?;
        self.with_values(logs).await
    }

    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<FormLog>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let logs = form_log::Entity::find()
            .filter(form_log::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(form_log::Column::Id)
            .all(&*self.db)
            .await?;
        self.with_values(logs).await
    }

    async fn list_all(&self) -> Result<Vec<FormLog>> {
        let logs = form_log::Entity::find()
            .order_by_asc(form_log::Column::CreatedAt)
            .order_by_asc(form_log::Column::Id)
            .all(&*self.db)
            .await?;
        self.with_values(logs).await
    }
}
