//! Mapper implementations for converting between DTOs and contract models
//!
//! This module contains all From/Into implementations for bidirectional
//! conversion between REST DTOs and transport-agnostic contract models.

use super::dto::*;
use crate::contract::{
    self, FieldKind, FormDefinition, FormDefinitionField, FormMethod, FormsError, WidgetKind,
};
use crate::domain::fields::{FieldSpec, InitialValue};
use crate::domain::form::RuntimeForm;
use crate::domain::submission::{FlashMessage, MessageLevel, SubmissionOutcome};
use crate::domain::export::ExportFormat;
use serde_json::Value;
use std::str::FromStr;

// ===== Definition conversions =====

impl From<FormDefinition> for FormDefinitionDto {
    fn from(definition: FormDefinition) -> Self {
        Self {
            id: definition.id,
            name: definition.name,
            require_hash: definition.require_hash,
            public_hash: definition.public_hash,
            title: definition.title,
            body: definition.body,
            action: definition.action,
            mail_to: definition.mail_to,
            mail_from: definition.mail_from,
            mail_reply_to: definition.mail_reply_to,
            mail_subject: definition.mail_subject,
            mail_uploaded_files: definition.mail_uploaded_files,
            method: definition.method.as_str().to_string(),
            success_message: definition.success_message,
            error_message: definition.error_message,
            submit_label: definition.submit_label,
            log_data: definition.log_data,
            save_uploaded_files: definition.save_uploaded_files,
            success_redirect: definition.success_redirect,
            success_clear: definition.success_clear,
            allow_get_initial: definition.allow_get_initial,
            message_template: definition.message_template,
            message_template_name: definition.message_template_name,
            form_template_name: definition.form_template_name,
            display_logged: definition.display_logged,
            html_default_template: definition.html_default_template,
            fields: definition.fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<FormDefinitionField> for FormDefinitionFieldDto {
    fn from(field: FormDefinitionField) -> Self {
        Self {
            id: field.id,
            field_class: field.field_class.as_str().to_string(),
            position: field.position,
            name: field.name,
            label: field.label,
            required: field.required,
            include_result: field.include_result,
            widget: field.widget.map(|w| w.as_str().to_string()),
            initial: field.initial,
            help_text: field.help_text,
            choice_values: field.choice_values,
            choice_labels: field.choice_labels,
            max_length: field.max_length,
            min_length: field.min_length,
            max_value: field.max_value,
            min_value: field.min_value,
            max_digits: field.max_digits,
            decimal_places: field.decimal_places,
            regex: field.regex,
            choice_model: field.choice_model,
            choice_model_empty_label: field.choice_model_empty_label,
        }
    }
}

impl TryFrom<FormDefinitionFieldDto> for FormDefinitionField {
    type Error = FormsError;

    fn try_from(dto: FormDefinitionFieldDto) -> Result<Self, Self::Error> {
        let field_class = FieldKind::from_str(&dto.field_class)
            .map_err(|message| FormsError::Validation { message })?;
        let widget = dto
            .widget
            .as_deref()
            .filter(|w| !w.is_empty())
            .map(WidgetKind::from_str)
            .transpose()
            .map_err(|message| FormsError::Validation { message })?;
        Ok(Self {
            id: dto.id,
            field_class,
            position: dto.position,
            name: dto.name,
            label: dto.label,
            required: dto.required,
            include_result: dto.include_result,
            widget,
            initial: dto.initial,
            help_text: dto.help_text,
            choice_values: dto.choice_values,
            choice_labels: dto.choice_labels,
            max_length: dto.max_length,
            min_length: dto.min_length,
            max_value: dto.max_value,
            min_value: dto.min_value,
            max_digits: dto.max_digits,
            decimal_places: dto.decimal_places,
            regex: dto.regex,
            choice_model: dto.choice_model,
            choice_model_empty_label: dto.choice_model_empty_label,
        })
    }
}

impl TryFrom<UpsertFormDefinitionRequest> for FormDefinition {
    type Error = FormsError;

    fn try_from(req: UpsertFormDefinitionRequest) -> Result<Self, Self::Error> {
        let method = FormMethod::from_str(&req.method)
            .map_err(|message| FormsError::Validation { message })?;
        let fields = req
            .fields
            .into_iter()
            .map(FormDefinitionField::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut definition = FormDefinition::new(req.name);
        definition.require_hash = req.require_hash;
        definition.title = req.title;
        definition.body = req.body;
        definition.action = req.action;
        definition.mail_to = req.mail_to;
        definition.mail_from = req.mail_from;
        definition.mail_reply_to = req.mail_reply_to;
        definition.mail_subject = req.mail_subject;
        definition.mail_uploaded_files = req.mail_uploaded_files;
        definition.method = method;
        definition.success_message = req.success_message;
        definition.error_message = req.error_message;
        definition.submit_label = req.submit_label;
        definition.log_data = req.log_data;
        definition.save_uploaded_files = req.save_uploaded_files;
        definition.success_redirect = req.success_redirect;
        definition.success_clear = req.success_clear;
        definition.allow_get_initial = req.allow_get_initial;
        definition.message_template = req.message_template;
        definition.message_template_name = req.message_template_name;
        definition.form_template_name = req.form_template_name;
        definition.display_logged = req.display_logged;
        definition.html_default_template = req.html_default_template;
        definition.fields = fields;
        Ok(definition)
    }
}

// ===== Log conversions =====

impl From<contract::FormValueEntry> for FormValueDto {
    fn from(entry: contract::FormValueEntry) -> Self {
        Self {
            name: entry.name,
            label: entry.label,
            value: entry.value,
        }
    }
}

impl From<contract::LoggedSubmission> for FormLogDto {
    fn from(logged: contract::LoggedSubmission) -> Self {
        Self {
            id: logged.log.id,
            form_definition_id: logged.log.form_definition_id,
            created_at: logged.log.created_at,
            created_by: logged.log.created_by,
            data: logged.data.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<RecordValueDto> for contract::FormValueEntry {
    fn from(dto: RecordValueDto) -> Self {
        Self::new(dto.name, dto.value, dto.label)
    }
}

// ===== Export conversions =====

impl From<ExportFormat> for ExporterDto {
    fn from(format: ExportFormat) -> Self {
        Self {
            name: format.name().to_string(),
            extension: format.extension().to_string(),
            content_type: format.content_type().to_string(),
        }
    }
}

impl ExportQuery {
    /// Selection covered by this query; everything when no filter is given
    pub fn selection(&self) -> Result<contract::ExportSelection, FormsError> {
        if let Some(ids) = self.ids.as_deref().filter(|ids| !ids.trim().is_empty()) {
            let ids = ids
                .split(',')
                .map(|id| id.trim().parse::<i32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| FormsError::Validation {
                    message: format!("invalid log id list '{}'", ids),
                })?;
            return Ok(contract::ExportSelection::Logs(ids));
        }
        Ok(match self.form.as_deref().filter(|form| !form.is_empty()) {
            Some(form) => contract::ExportSelection::Definition(form.to_string()),
            None => contract::ExportSelection::All,
        })
    }
}

// ===== Runtime form conversions =====

fn initial_json(initial: &InitialValue) -> Value {
    match initial {
        InitialValue::Single(value) => Value::String(value.clone()),
        InitialValue::Multi(values) => Value::from(values.clone()),
    }
}

fn runtime_field(form: &RuntimeForm, field: &FieldSpec) -> RuntimeFieldDto {
    let value = match &form.data {
        Some(data) if field.kind.is_multi_valued() => Some(Value::from(data.get_all(&field.name))),
        Some(data) => data.get(&field.name).map(|v| Value::String(v.to_string())),
        None => field.initial.as_ref().map(initial_json),
    };
    RuntimeFieldDto {
        name: field.name.clone(),
        kind: field.kind.as_str().to_string(),
        widget: field.widget.as_str().to_string(),
        label: field.label.clone(),
        required: field.required,
        help_text: field.help_text.clone(),
        value,
        choices: field
            .choices()
            .iter()
            .map(|choice| ChoiceDto {
                value: choice.value.clone(),
                label: choice.label.clone(),
            })
            .collect(),
        errors: form.errors.get(&field.name).cloned().unwrap_or_default(),
    }
}

/// Runtime form as shown to a client, together with the definition's presentation
pub fn runtime_form_dto(definition: &FormDefinition, form: &RuntimeForm) -> RuntimeFormDto {
    RuntimeFormDto {
        name: form.definition_name.clone(),
        submit_flag: form.submit_flag.clone(),
        title: definition.title.clone(),
        body: definition.body.clone(),
        submit_label: definition.submit_label.clone(),
        method: definition.method.as_str().to_string(),
        fields: form.fields.iter().map(|field| runtime_field(form, field)).collect(),
        non_field_errors: form.non_field_errors.clone(),
    }
}

impl From<FlashMessage> for FlashMessageDto {
    fn from(message: FlashMessage) -> Self {
        Self {
            level: match message.level {
                MessageLevel::Success => "success",
                MessageLevel::Error => "error",
            }
            .to_string(),
            text: message.text,
        }
    }
}

pub fn submission_response(definition: &FormDefinition, outcome: SubmissionOutcome) -> SubmissionResponse {
    SubmissionResponse {
        form_success: outcome.form_success,
        form_error: outcome.form_error,
        message: outcome.message,
        messages: outcome.messages.into_iter().map(Into::into).collect(),
        form: runtime_form_dto(definition, &outcome.form),
        log_id: outcome.log.map(|log| log.id),
        logs: outcome.logs.into_iter().map(Into::into).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_query_selection() {
        let query = ExportQuery {
            form: Some("contact".to_string()),
            ids: None,
        };
        assert_eq!(
            query.selection().unwrap(),
            contract::ExportSelection::Definition("contact".to_string())
        );

        let query = ExportQuery {
            form: Some("contact".to_string()),
            ids: Some("3, 1,2".to_string()),
        };
        assert_eq!(query.selection().unwrap(), contract::ExportSelection::Logs(vec![3, 1, 2]));

        assert_eq!(ExportQuery::default().selection().unwrap(), contract::ExportSelection::All);

        let query = ExportQuery {
            form: None,
            ids: Some("1,x".to_string()),
        };
        assert!(matches!(query.selection(), Err(FormsError::Validation { .. })));
    }

    #[test]
    fn test_upsert_request_rejects_unknown_field_kind() {
        let req: UpsertFormDefinitionRequest = serde_json::from_value(serde_json::json!({
            "name": "contact",
            "fields": [{"field_class": "signature", "name": "sig"}]
        }))
        .unwrap();
        let err = FormDefinition::try_from(req).unwrap_err();
        assert!(matches!(err, FormsError::Validation { .. }));
    }

    #[test]
    fn test_upsert_request_defaults() {
        let req: UpsertFormDefinitionRequest = serde_json::from_value(serde_json::json!({
            "name": "contact",
            "method": "get",
            "fields": [{"field_class": "email", "name": "email"}]
        }))
        .unwrap();
        let definition = FormDefinition::try_from(req).unwrap();
        assert_eq!(definition.method, FormMethod::Get);
        assert!(definition.log_data);
        assert!(definition.fields[0].required);
        assert_eq!(definition.fields[0].field_class, FieldKind::Email);
        assert!(definition.fields[0].widget.is_none());
    }
}
