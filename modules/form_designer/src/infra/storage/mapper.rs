//! Entity to model mappers
//!
//! Conversions between SeaORM entities and contract models

use super::entity::{form_definition, form_definition_field, form_log, form_value};
use crate::contract::{FieldKind, FormDefinition, FormDefinitionField, FormLog, FormMethod, FormValue, WidgetKind};
use sea_orm::ActiveValue::{NotSet, Set};
use std::str::FromStr;

// ===== Definition Conversions =====

/// Assemble a definition from its row and field rows
pub fn definition_from_entities(
    entity: form_definition::Model,
    fields: Vec<form_definition_field::Model>,
) -> anyhow::Result<FormDefinition> {
    let fields = fields
        .into_iter()
        .map(FormDefinitionField::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(FormDefinition {
        id: entity.id,
        name: entity.name,
        require_hash: entity.require_hash,
        private_hash: entity.private_hash,
        public_hash: entity.public_hash,
        title: entity.title,
        body: entity.body,
        action: entity.action,
        mail_to: entity.mail_to,
        mail_from: entity.mail_from,
        mail_reply_to: entity.mail_reply_to,
        mail_subject: entity.mail_subject,
        mail_uploaded_files: entity.mail_uploaded_files,
        method: FormMethod::from_str(&entity.method).map_err(anyhow::Error::msg)?,
        success_message: entity.success_message,
        error_message: entity.error_message,
        submit_label: entity.submit_label,
        log_data: entity.log_data,
        save_uploaded_files: entity.save_uploaded_files,
        success_redirect: entity.success_redirect,
        success_clear: entity.success_clear,
        allow_get_initial: entity.allow_get_initial,
        message_template: entity.message_template,
        message_template_name: entity.message_template_name,
        form_template_name: entity.form_template_name,
        display_logged: entity.display_logged,
        html_default_template: entity.html_default_template,
        fields,
    })
}

impl From<&FormDefinition> for form_definition::ActiveModel {
    fn from(model: &FormDefinition) -> Self {
        Self {
            id: if model.id == 0 { NotSet } else { Set(model.id) },
            name: Set(model.name.clone()),
            require_hash: Set(model.require_hash),
            private_hash: Set(model.private_hash.clone()),
            public_hash: Set(model.public_hash.clone()),
            title: Set(model.title.clone()),
            body: Set(model.body.clone()),
            action: Set(model.action.clone()),
            mail_to: Set(model.mail_to.clone()),
            mail_from: Set(model.mail_from.clone()),
            mail_reply_to: Set(model.mail_reply_to.clone()),
            mail_subject: Set(model.mail_subject.clone()),
            mail_uploaded_files: Set(model.mail_uploaded_files),
            method: Set(model.method.as_str().to_string()),
            success_message: Set(model.success_message.clone()),
            error_message: Set(model.error_message.clone()),
            submit_label: Set(model.submit_label.clone()),
            log_data: Set(model.log_data),
            save_uploaded_files: Set(model.save_uploaded_files),
            success_redirect: Set(model.success_redirect),
            success_clear: Set(model.success_clear),
            allow_get_initial: Set(model.allow_get_initial),
            message_template: Set(model.message_template.clone()),
            message_template_name: Set(model.message_template_name.clone()),
            form_template_name: Set(model.form_template_name.clone()),
            display_logged: Set(model.display_logged),
            html_default_template: Set(model.html_default_template),
        }
    }
}

// ===== Field Conversions =====

fn to_u32(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

fn to_i32(value: Option<u32>) -> Option<i32> {
    value.and_then(|v| i32::try_from(v).ok())
}

impl TryFrom<form_definition_field::Model> for FormDefinitionField {
    type Error = anyhow::Error;

    fn try_from(entity: form_definition_field::Model) -> Result<Self, Self::Error> {
        let widget = entity
            .widget
            .as_deref()
            .filter(|w| !w.is_empty())
            .map(WidgetKind::from_str)
            .transpose()
            .map_err(anyhow::Error::msg)?;
        Ok(Self {
            id: entity.id,
            field_class: FieldKind::from_str(&entity.field_class).map_err(anyhow::Error::msg)?,
            position: entity.position,
            name: entity.name,
            label: entity.label,
            required: entity.required,
            include_result: entity.include_result,
            widget,
            initial: entity.initial,
            help_text: entity.help_text,
            choice_values: entity.choice_values,
            choice_labels: entity.choice_labels,
            max_length: to_u32(entity.max_length),
            min_length: to_u32(entity.min_length),
            max_value: entity.max_value,
            min_value: entity.min_value,
            max_digits: to_u32(entity.max_digits),
            decimal_places: to_u32(entity.decimal_places),
            regex: entity.regex,
            choice_model: entity.choice_model,
            choice_model_empty_label: entity.choice_model_empty_label,
        })
    }
}

/// Active model for a field row owned by `definition_id`
pub fn field_active_model(definition_id: i32, field: &FormDefinitionField) -> form_definition_field::ActiveModel {
    form_definition_field::ActiveModel {
        id: NotSet,
        form_definition_id: Set(definition_id),
        field_class: Set(field.field_class.as_str().to_string()),
        position: Set(field.position),
        name: Set(field.name.clone()),
        label: Set(field.label.clone()),
        required: Set(field.required),
        include_result: Set(field.include_result),
        widget: Set(field.widget.map(|w| w.as_str().to_string())),
        initial: Set(field.initial.clone()),
        help_text: Set(field.help_text.clone()),
        choice_values: Set(field.choice_values.clone()),
        choice_labels: Set(field.choice_labels.clone()),
        max_length: Set(to_i32(field.max_length)),
        min_length: Set(to_i32(field.min_length)),
        max_value: Set(field.max_value),
        min_value: Set(field.min_value),
        max_digits: Set(to_i32(field.max_digits)),
        decimal_places: Set(to_i32(field.decimal_places)),
        regex: Set(field.regex.clone()),
        choice_model: Set(field.choice_model.clone()),
        choice_model_empty_label: Set(field.choice_model_empty_label.clone()),
    }
}

// ===== Log Conversions =====

/// Assemble a log from its row and value rows (in persistence order)
pub fn log_from_entities(entity: form_log::Model, values: Vec<form_value::Model>) -> FormLog {
    FormLog {
        id: entity.id,
        form_definition_id: entity.form_definition_id,
        created_at: entity.created_at,
        created_by: entity.created_by,
        values: values.into_iter().map(FormValue::from).collect(),
    }
}

impl From<form_value::Model> for FormValue {
    fn from(entity: form_value::Model) -> Self {
        Self {
            field_name: entity.field_name,
            value: entity.value.unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Active model for a value row of `log_id`; JSON null is stored as SQL NULL
pub fn value_active_model(log_id: i32, field_name: &str, value: &serde_json::Value) -> form_value::ActiveModel {
    form_value::ActiveModel {
        id: NotSet,
        form_log_id: Set(log_id),
        field_name: Set(field_name.to_string()),
        value: Set(if value.is_null() { None } else { Some(value.clone()) }),
    }
}
