//! Submission log values: extraction from a valid form and read-time reconciliation

use super::form::RuntimeForm;
use super::template::TemplateContext;
use crate::contract::{FormDefinition, FormDefinitionField, FormValue, FormValueEntry};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Reconcile persisted values against the current field set
///
/// Yields one entry per current field in definition order, labelled with the
/// field's label or name (null when the log has no value for it), followed by
/// values whose field no longer exists, in persistence order and without a
/// label.
pub fn reconcile(fields: &[&FormDefinitionField], values: &[FormValue]) -> Vec<FormValueEntry> {
    let by_name: HashMap<&str, &FormValue> = values
        .iter()
        .map(|value| (value.field_name.as_str(), value))
        .collect();

    let mut entries: Vec<FormValueEntry> = fields
        .iter()
        .map(|field| {
            let value = by_name
                .get(field.name.as_str())
                .map(|v| v.value.clone())
                .unwrap_or(Value::Null);
            FormValueEntry::new(field.name.clone(), value, Some(field.display_label().to_string()))
        })
        .collect();

    entries.extend(
        values
            .iter()
            .filter(|value| !fields.iter().any(|field| field.name == value.field_name))
            .map(|value| FormValueEntry::new(value.field_name.clone(), value.value.clone(), None)),
    );
    entries
}

/// Cleaned values of the fields flagged for inclusion, in form order
pub fn extract_form_data(definition: &FormDefinition, form: &RuntimeForm) -> Vec<FormValueEntry> {
    form.fields
        .iter()
        .filter_map(|spec| {
            let field = definition.field(&spec.name)?;
            if !field.include_result {
                return None;
            }
            let value = form.cleaned_data.get(&spec.name).cloned().unwrap_or(Value::Null);
            let label = if spec.label.is_empty() { None } else { Some(spec.label.clone()) };
            Some(FormValueEntry::new(spec.name.clone(), value, label))
        })
        .collect()
}

/// Flat name to value mapping used by placeholder substitution
pub fn form_data_context(entries: &[FormValueEntry]) -> TemplateContext {
    entries
        .iter()
        .map(|entry| (entry.name.clone(), entry.value.clone()))
        .collect()
}

/// Substitution context plus the ordered `data` list for message bodies
pub fn message_context(entries: &[FormValueEntry]) -> TemplateContext {
    let mut context = form_data_context(entries);
    let data = entries
        .iter()
        .map(|entry| {
            json!({
                "name": entry.name,
                "label": entry.label.clone().unwrap_or_else(|| entry.name.clone()),
                "value": entry.value,
            })
        })
        .collect();
    context.insert("data".to_string(), Value::Array(data));
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::FieldKind;

    fn field(name: &str, label: Option<&str>) -> FormDefinitionField {
        let mut field = FormDefinitionField::new(name, FieldKind::Char);
        field.label = label.map(str::to_string);
        field
    }

    fn value(name: &str, value: &str) -> FormValue {
        FormValue {
            field_name: name.to_string(),
            value: json!(value),
        }
    }

    #[test]
    fn test_reconcile_current_fields_in_order() {
        let a = field("a", Some("A"));
        let b = field("b", None);
        let values = vec![value("b", "y"), value("a", "x")];
        let entries = reconcile(&[&a, &b], &values);
        assert_eq!(
            entries,
            vec![
                FormValueEntry::new("a", json!("x"), Some("A".to_string())),
                FormValueEntry::new("b", json!("y"), Some("b".to_string())),
            ]
        );
    }

    #[test]
    fn test_removed_field_becomes_orphan() {
        let a = field("a", Some("A"));
        let values = vec![value("a", "x"), value("b", "y")];
        let entries = reconcile(&[&a], &values);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a");
        assert_eq!(entries[1], FormValueEntry::new("b", json!("y"), None));
    }

    #[test]
    fn test_added_field_becomes_null_placeholder() {
        let a = field("a", None);
        let c = field("c", Some("C"));
        let values = vec![value("a", "x"), value("old", "1"), value("older", "2")];
        let entries = reconcile(&[&a, &c], &values);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "old", "older"]);
        assert_eq!(entries[1].value, Value::Null);
        assert_eq!(entries[1].label.as_deref(), Some("C"));
    }

    #[test]
    fn test_message_context_has_data_list() {
        let entries = vec![
            FormValueEntry::new("name", json!("Ada"), Some("Your name".to_string())),
            FormValueEntry::new("email", json!("ada@example.com"), None),
        ];
        let context = message_context(&entries);
        assert_eq!(context["name"], json!("Ada"));
        assert_eq!(context["data"][0]["label"], json!("Your name"));
        assert_eq!(context["data"][1]["label"], json!("email"));
    }
}
