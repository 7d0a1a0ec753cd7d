//! Save-time validation of form definitions

use super::fields::FieldCompiler;
use crate::contract::{FieldError, FormDefinition, FormsError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

#[allow(clippy::unwrap_used)]
static SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

const MAX_NAME_LENGTH: usize = 255;

fn check_slug(errors: &mut Vec<FieldError>, key: &str, value: &str) {
    if value.is_empty() {
        errors.push(FieldError::new(key, "This field is required."));
    } else if value.len() > MAX_NAME_LENGTH {
        errors.push(FieldError::new(
            key,
            format!("Ensure this value has at most {} characters.", MAX_NAME_LENGTH),
        ));
    } else if !SLUG.is_match(value) {
        errors.push(FieldError::new(
            key,
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
        ));
    }
}

/// Validate a definition before it is saved
///
/// `choice_models` limits model references; empty accepts any model the
/// field compiler knows.
pub fn validate_definition(
    definition: &FormDefinition,
    fields: &FieldCompiler,
    choice_models: &[String],
) -> Result<(), FormsError> {
    let mut errors = Vec::new();
    check_slug(&mut errors, "name", &definition.name);

    let mut seen = HashSet::new();
    for (index, field) in definition.fields.iter().enumerate() {
        let key = |attr: &str| format!("fields.{}.{}", index, attr);

        check_slug(&mut errors, &key("name"), &field.name);
        if !field.name.is_empty() && !seen.insert(field.name.as_str()) {
            errors.push(FieldError::new(
                key("name"),
                format!("Field name '{}' is used more than once.", field.name),
            ));
        }

        if !fields.is_kind_enabled(field.field_class) {
            errors.push(FieldError::new(
                key("field_class"),
                format!("Field type '{}' is not enabled.", field.field_class),
            ));
        }
        if let Some(widget) = field.widget {
            if !fields.is_widget_enabled(widget) {
                errors.push(FieldError::new(
                    key("widget"),
                    format!("Widget '{}' is not enabled.", widget),
                ));
            }
        }

        if field.field_class.requires_regex() {
            match field.regex.as_deref().filter(|r| !r.is_empty()) {
                None => errors.push(FieldError::new(
                    key("regex"),
                    "This field class requires a regular expression.",
                )),
                Some(pattern) => {
                    if let Err(e) = Regex::new(pattern) {
                        errors.push(FieldError::new(
                            key("regex"),
                            format!("Invalid regular expression: {}", e),
                        ));
                    }
                }
            }
        }

        if field.field_class.requires_choice_model() {
            match field.choice_model.as_deref().filter(|m| !m.is_empty()) {
                None => errors.push(FieldError::new(
                    key("choice_model"),
                    "This field class requires a model.",
                )),
                Some(model) => {
                    let permitted = if choice_models.is_empty() {
                        fields.has_choice_model(model)
                    } else {
                        choice_models.iter().any(|m| m == model) && fields.has_choice_model(model)
                    };
                    if !permitted {
                        errors.push(FieldError::new(
                            key("choice_model"),
                            format!("Unknown choice model '{}'.", model),
                        ));
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(FormsError::InvalidDefinition { errors })
    }
}
