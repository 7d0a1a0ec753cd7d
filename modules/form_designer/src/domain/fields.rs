//! Field compiler: maps one definition field to a constrained input field
//!
//! Construction is table-driven. Each enabled [`FieldKind`] is registered with a
//! factory contributing the kind-specific parameters; common arguments
//! (required, label, initial, help text, widget) are shared.

use crate::contract::{FieldKind, FormDefinitionField, FormsError, WidgetKind};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;

pub const REQUIRED_MESSAGE: &str = "This field is required.";

#[allow(clippy::unwrap_used)]
static CHOICE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*").unwrap());

#[allow(clippy::unwrap_used)]
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@([A-Za-z0-9-]+\.)+[A-Za-z0-9-]{2,}$").unwrap());

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];
const DATE_TIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// One selectable (value, label) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// External data model offering choices to model-choice fields
pub trait ChoiceSource: Send + Sync {
    fn choices(&self) -> Vec<Choice>;
}

/// Fixed choice list, handy for wiring and tests
pub struct StaticChoices(pub Vec<Choice>);

impl ChoiceSource for StaticChoices {
    fn choices(&self) -> Vec<Choice> {
        self.0.clone()
    }
}

/// Initial value of a runtime field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialValue {
    Single(String),
    Multi(Vec<String>),
}

/// Kind-conditional parameter set of a compiled field
#[derive(Debug, Clone)]
pub enum FieldParams {
    /// No kind-specific parameters
    Basic,
    Text {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Pattern {
        min_length: Option<usize>,
        max_length: Option<usize>,
        regex: Regex,
    },
    Integer {
        min_value: Option<i64>,
        max_value: Option<i64>,
    },
    Decimal {
        min_value: Option<Decimal>,
        max_value: Option<Decimal>,
        max_digits: Option<u32>,
        decimal_places: Option<u32>,
    },
    Choices {
        choices: Vec<Choice>,
    },
    ModelChoices {
        model: String,
        choices: Vec<Choice>,
        empty_label: Option<String>,
    },
}

/// Fully configured input field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub label: String,
    pub initial: Option<InitialValue>,
    pub help_text: Option<String>,
    pub widget: WidgetKind,
    pub params: FieldParams,
}

/// Raw submitted input for one field
#[derive(Debug, Clone, Copy)]
pub struct RawInput<'a> {
    pub values: &'a [String],
    /// Uploaded file name and size, for file fields
    pub file: Option<(&'a str, u64)>,
}

type FieldFactory = fn(&FormDefinitionField, &FieldCompiler) -> Result<FieldParams, FormsError>;

fn kind_factory(kind: FieldKind) -> FieldFactory {
    match kind {
        FieldKind::Char | FieldKind::Email => text_params,
        FieldKind::Regex => pattern_params,
        FieldKind::Integer => integer_params,
        FieldKind::Decimal => decimal_params,
        FieldKind::Choice | FieldKind::MultipleChoice => choice_params,
        FieldKind::ModelChoice | FieldKind::ModelMultipleChoice => model_choice_params,
        FieldKind::Boolean
        | FieldKind::NullBoolean
        | FieldKind::Date
        | FieldKind::DateTime
        | FieldKind::Time
        | FieldKind::File
        | FieldKind::Float
        | FieldKind::Url => basic_params,
    }
}

/// Default widget for a kind when the definition names none
pub fn default_widget(kind: FieldKind) -> WidgetKind {
    match kind {
        FieldKind::Boolean => WidgetKind::CheckboxInput,
        FieldKind::NullBoolean => WidgetKind::NullBooleanSelect,
        FieldKind::Char | FieldKind::Regex => WidgetKind::TextInput,
        FieldKind::Email => WidgetKind::EmailInput,
        FieldKind::Url => WidgetKind::UrlInput,
        FieldKind::Integer | FieldKind::Decimal | FieldKind::Float => WidgetKind::NumberInput,
        FieldKind::Date => WidgetKind::DateInput,
        FieldKind::DateTime => WidgetKind::DateTimeInput,
        FieldKind::Time => WidgetKind::TimeInput,
        FieldKind::File => WidgetKind::FileInput,
        FieldKind::Choice | FieldKind::ModelChoice => WidgetKind::Select,
        FieldKind::MultipleChoice | FieldKind::ModelMultipleChoice => WidgetKind::SelectMultiple,
    }
}

/// Registration table of enabled field kinds, widgets and choice models
pub struct FieldCompiler {
    factories: HashMap<FieldKind, FieldFactory>,
    widgets: BTreeSet<WidgetKind>,
    choice_models: HashMap<String, Arc<dyn ChoiceSource>>,
}

impl Default for FieldCompiler {
    fn default() -> Self {
        Self::new(&FieldKind::ALL, &WidgetKind::ALL)
    }
}

impl FieldCompiler {
    /// Build the registry for the enabled kinds and widgets
    pub fn new(kinds: &[FieldKind], widgets: &[WidgetKind]) -> Self {
        Self {
            factories: kinds.iter().map(|kind| (*kind, kind_factory(*kind))).collect(),
            widgets: widgets.iter().copied().collect(),
            choice_models: HashMap::new(),
        }
    }

    /// Register an external data model under a name
    pub fn register_choice_model(&mut self, name: impl Into<String>, source: Arc<dyn ChoiceSource>) {
        self.choice_models.insert(name.into(), source);
    }

    pub fn is_kind_enabled(&self, kind: FieldKind) -> bool {
        self.factories.contains_key(&kind)
    }

    pub fn is_widget_enabled(&self, widget: WidgetKind) -> bool {
        self.widgets.contains(&widget)
    }

    pub fn has_choice_model(&self, name: &str) -> bool {
        self.choice_models.contains_key(name)
    }

    /// Compile one definition field
    ///
    /// `initial` overrides the definition's initial value (query prefill).
    pub fn compile(
        &self,
        field: &FormDefinitionField,
        initial: Option<InitialValue>,
    ) -> Result<FieldSpec, FormsError> {
        let factory = self.factories.get(&field.field_class).ok_or_else(|| {
            FormsError::configuration(format!(
                "field kind '{}' of field '{}' is not enabled",
                field.field_class, field.name
            ))
        })?;
        let params = factory(field, self)?;

        let widget = match field.widget {
            Some(widget) if self.widgets.contains(&widget) => widget,
            Some(widget) => {
                return Err(FormsError::configuration(format!(
                    "widget '{}' of field '{}' is not enabled",
                    widget, field.name
                )))
            }
            None => default_widget(field.field_class),
        };

        let initial = initial.or_else(|| definition_initial(field));

        Ok(FieldSpec {
            name: field.name.clone(),
            kind: field.field_class,
            required: field.required,
            label: field.label.clone().unwrap_or_default(),
            initial,
            help_text: field.help_text.clone(),
            widget,
            params,
        })
    }

    fn choice_source(&self, field: &FormDefinitionField) -> Result<(String, Vec<Choice>), FormsError> {
        let model = field
            .choice_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                FormsError::configuration(format!("field '{}' has no choice model", field.name))
            })?;
        let source = self.choice_models.get(model).ok_or_else(|| {
            FormsError::configuration(format!(
                "unknown choice model '{}' on field '{}'",
                model, field.name
            ))
        })?;
        Ok((model.to_string(), source.choices()))
    }
}

fn definition_initial(field: &FormDefinitionField) -> Option<InitialValue> {
    let initial = field.initial.as_deref().filter(|s| !s.is_empty())?;
    if field.field_class.is_multi_valued() {
        Some(InitialValue::Multi(split_lines(initial)))
    } else {
        Some(InitialValue::Single(initial.to_string()))
    }
}

fn to_usize(value: Option<u32>) -> Option<usize> {
    value.map(|v| v as usize)
}

fn basic_params(_field: &FormDefinitionField, _compiler: &FieldCompiler) -> Result<FieldParams, FormsError> {
    Ok(FieldParams::Basic)
}

fn text_params(field: &FormDefinitionField, _compiler: &FieldCompiler) -> Result<FieldParams, FormsError> {
    Ok(FieldParams::Text {
        min_length: to_usize(field.min_length),
        max_length: to_usize(field.max_length),
    })
}

fn pattern_params(field: &FormDefinitionField, _compiler: &FieldCompiler) -> Result<FieldParams, FormsError> {
    let pattern = field.regex.as_deref().unwrap_or_default();
    let regex = Regex::new(pattern).map_err(|e| {
        FormsError::configuration(format!("invalid regex on field '{}': {}", field.name, e))
    })?;
    Ok(FieldParams::Pattern {
        min_length: to_usize(field.min_length),
        max_length: to_usize(field.max_length),
        regex,
    })
}

fn integer_params(field: &FormDefinitionField, _compiler: &FieldCompiler) -> Result<FieldParams, FormsError> {
    Ok(FieldParams::Integer {
        min_value: field.min_value.map(|v| v.trunc() as i64),
        max_value: field.max_value.map(|v| v.trunc() as i64),
    })
}

fn decimal_params(field: &FormDefinitionField, _compiler: &FieldCompiler) -> Result<FieldParams, FormsError> {
    let to_decimal = |value: Option<f64>| -> Result<Option<Decimal>, FormsError> {
        value
            .map(|v| {
                Decimal::from_str(&v.to_string()).map_err(|e| {
                    FormsError::configuration(format!("bound {} on field '{}': {}", v, field.name, e))
                })
            })
            .transpose()
    };
    Ok(FieldParams::Decimal {
        min_value: to_decimal(field.min_value)?,
        max_value: to_decimal(field.max_value)?,
        max_digits: field.max_digits,
        decimal_places: field.decimal_places,
    })
}

fn choice_params(field: &FormDefinitionField, _compiler: &FieldCompiler) -> Result<FieldParams, FormsError> {
    Ok(FieldParams::Choices {
        choices: build_choices(field.choice_values.as_deref(), field.choice_labels.as_deref()),
    })
}

fn model_choice_params(field: &FormDefinitionField, compiler: &FieldCompiler) -> Result<FieldParams, FormsError> {
    let (model, choices) = compiler.choice_source(field)?;
    let empty_label = match field.field_class {
        FieldKind::ModelChoice => field.choice_model_empty_label.clone(),
        _ => None,
    };
    Ok(FieldParams::ModelChoices {
        model,
        choices,
        empty_label,
    })
}

fn split_lines(text: &str) -> Vec<String> {
    CHOICE_SEPARATOR
        .split(text.trim())
        .map(str::to_string)
        .collect()
}

/// Integer text, also accepting a zero fraction such as `42.0`
fn parse_whole_number(value: &str) -> Option<i64> {
    if let Ok(number) = value.parse::<i64>() {
        return Some(number);
    }
    let (whole, fraction) = value.split_once('.')?;
    if whole.is_empty() || !fraction.chars().all(|c| c == '0') {
        return None;
    }
    whole.parse::<i64>().ok()
}

/// Pair newline separated values and labels by position
///
/// Values without a matching label use themselves as label.
pub fn build_choices(values: Option<&str>, labels: Option<&str>) -> Vec<Choice> {
    let Some(values) = values.filter(|v| !v.trim().is_empty()) else {
        return Vec::new();
    };
    let labels = labels
        .filter(|l| !l.trim().is_empty())
        .map(split_lines)
        .unwrap_or_default();
    split_lines(values)
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let label = labels.get(index).cloned().unwrap_or_else(|| value.clone());
            Choice { value, label }
        })
        .collect()
}

impl FieldSpec {
    pub fn choices(&self) -> &[Choice] {
        match &self.params {
            FieldParams::Choices { choices } | FieldParams::ModelChoices { choices, .. } => choices,
            _ => &[],
        }
    }

    /// Validate raw input, producing the cleaned value or an error message
    pub fn clean(&self, input: RawInput<'_>) -> Result<Value, String> {
        if self.kind.is_multi_valued() {
            return self.clean_multi(input.values);
        }
        if self.kind.is_file() {
            return match input.file {
                Some((name, size)) => Ok(json!({ "name": name, "size": size })),
                None if self.required => Err(REQUIRED_MESSAGE.to_string()),
                None => Ok(Value::Null),
            };
        }

        let raw = input.values.last().map(String::as_str).unwrap_or_default();
        match self.kind {
            FieldKind::Boolean => {
                let checked = !matches!(
                    raw.trim().to_ascii_lowercase().as_str(),
                    "" | "false" | "0" | "off"
                );
                if self.required && !checked {
                    return Err(REQUIRED_MESSAGE.to_string());
                }
                Ok(Value::Bool(checked))
            }
            FieldKind::NullBoolean => Ok(match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "2" | "on" => Value::Bool(true),
                "false" | "0" | "3" => Value::Bool(false),
                _ => Value::Null,
            }),
            _ => {
                let value = raw.trim();
                if value.is_empty() {
                    return if self.required {
                        Err(REQUIRED_MESSAGE.to_string())
                    } else {
                        Ok(self.empty_value())
                    };
                }
                self.clean_scalar(value)
            }
        }
    }

    fn empty_value(&self) -> Value {
        match self.kind {
            FieldKind::Char
            | FieldKind::Email
            | FieldKind::Regex
            | FieldKind::Url
            | FieldKind::Choice => Value::String(String::new()),
            _ => Value::Null,
        }
    }

    fn clean_scalar(&self, value: &str) -> Result<Value, String> {
        match (&self.params, self.kind) {
            (FieldParams::Text { min_length, max_length }, FieldKind::Email) => {
                check_length(value, *min_length, *max_length)?;
                if !EMAIL.is_match(value) {
                    return Err("Enter a valid email address.".to_string());
                }
                Ok(Value::String(value.to_string()))
            }
            (FieldParams::Text { min_length, max_length }, _) => {
                check_length(value, *min_length, *max_length)?;
                Ok(Value::String(value.to_string()))
            }
            (FieldParams::Pattern { min_length, max_length, regex }, _) => {
                check_length(value, *min_length, *max_length)?;
                if !regex.is_match(value) {
                    return Err("Enter a valid value.".to_string());
                }
                Ok(Value::String(value.to_string()))
            }
            (FieldParams::Integer { min_value, max_value }, _) => {
                let number = parse_whole_number(value).ok_or_else(|| "Enter a whole number.".to_string())?;
                check_bounds(number, *min_value, *max_value)?;
                Ok(json!(number))
            }
            (
                FieldParams::Decimal {
                    min_value,
                    max_value,
                    max_digits,
                    decimal_places,
                },
                _,
            ) => {
                let number = Decimal::from_str(value).map_err(|_| "Enter a number.".to_string())?;
                check_bounds(number, *min_value, *max_value)?;
                check_digits(number, *max_digits, *decimal_places)?;
                Ok(Value::String(number.to_string()))
            }
            (FieldParams::Choices { choices }, _) => {
                if !choices.iter().any(|c| c.value == value) {
                    return Err(format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        value
                    ));
                }
                Ok(Value::String(value.to_string()))
            }
            (FieldParams::ModelChoices { choices, .. }, _) => {
                if !choices.iter().any(|c| c.value == value) {
                    return Err(
                        "Select a valid choice. That choice is not one of the available choices."
                            .to_string(),
                    );
                }
                Ok(Value::String(value.to_string()))
            }
            (FieldParams::Basic, FieldKind::Float) => match value.parse::<f64>() {
                Ok(number) if number.is_finite() => Ok(json!(number)),
                _ => Err("Enter a number.".to_string()),
            },
            (FieldParams::Basic, FieldKind::Url) => clean_url(value),
            (FieldParams::Basic, FieldKind::Date) => DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                .ok_or_else(|| "Enter a valid date.".to_string()),
            (FieldParams::Basic, FieldKind::DateTime) => DATE_TIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(value, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                })
                .map(|dt| Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
                .ok_or_else(|| "Enter a valid date/time.".to_string()),
            (FieldParams::Basic, FieldKind::Time) => TIME_FORMATS
                .iter()
                .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
                .map(|time| Value::String(time.format("%H:%M:%S").to_string()))
                .ok_or_else(|| "Enter a valid time.".to_string()),
            (FieldParams::Basic, _) => Ok(Value::String(value.to_string())),
        }
    }

    fn clean_multi(&self, values: &[String]) -> Result<Value, String> {
        let values: Vec<&str> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            return if self.required {
                Err(REQUIRED_MESSAGE.to_string())
            } else {
                Ok(Value::Array(Vec::new()))
            };
        }
        let choices = self.choices();
        if let Some(invalid) = values.iter().find(|v| !choices.iter().any(|c| c.value == **v)) {
            return Err(format!(
                "Select a valid choice. {} is not one of the available choices.",
                invalid
            ));
        }
        Ok(Value::Array(
            values.into_iter().map(|v| Value::String(v.to_string())).collect(),
        ))
    }
}

fn check_length(value: &str, min: Option<usize>, max: Option<usize>) -> Result<(), String> {
    let length = value.chars().count();
    if let Some(max) = max {
        if length > max {
            return Err(format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, length
            ));
        }
    }
    if let Some(min) = min {
        if length < min {
            return Err(format!(
                "Ensure this value has at least {} characters (it has {}).",
                min, length
            ));
        }
    }
    Ok(())
}

fn check_bounds<T: PartialOrd + std::fmt::Display>(
    value: T,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), String> {
    if let Some(max) = max {
        if value > max {
            return Err(format!("Ensure this value is less than or equal to {}.", max));
        }
    }
    if let Some(min) = min {
        if value < min {
            return Err(format!("Ensure this value is greater than or equal to {}.", min));
        }
    }
    Ok(())
}

fn check_digits(
    value: Decimal,
    max_digits: Option<u32>,
    decimal_places: Option<u32>,
) -> Result<(), String> {
    let mantissa_digits = value.mantissa().unsigned_abs().to_string().len() as u32;
    let scale = value.scale();
    let (digits, decimals) = if scale == 0 {
        (mantissa_digits, 0)
    } else if scale > mantissa_digits {
        (scale, scale)
    } else {
        (mantissa_digits, scale)
    };
    let whole_digits = digits - decimals;

    if let Some(max_digits) = max_digits {
        if digits > max_digits {
            return Err(format!(
                "Ensure that there are no more than {} digits in total.",
                max_digits
            ));
        }
    }
    if let Some(decimal_places) = decimal_places {
        if decimals > decimal_places {
            return Err(format!(
                "Ensure that there are no more than {} decimal places.",
                decimal_places
            ));
        }
    }
    if let (Some(max_digits), Some(decimal_places)) = (max_digits, decimal_places) {
        let max_whole = max_digits.saturating_sub(decimal_places);
        if whole_digits > max_whole {
            return Err(format!(
                "Ensure that there are no more than {} digits before the decimal point.",
                max_whole
            ));
        }
    }
    Ok(())
}

fn clean_url(value: &str) -> Result<Value, String> {
    let candidate = if value.contains("://") {
        value.to_string()
    } else {
        format!("http://{}", value)
    };
    match url::Url::parse(&candidate) {
        Ok(parsed)
            if matches!(parsed.scheme(), "http" | "https" | "ftp" | "ftps")
                && parsed.host_str().is_some_and(|host| host.contains('.') || host == "localhost") =>
        {
            Ok(Value::String(parsed.to_string()))
        }
        _ => Err("Enter a valid URL.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(field: &FormDefinitionField) -> FieldSpec {
        FieldCompiler::default().compile(field, None).unwrap()
    }

    fn clean(spec: &FieldSpec, value: &str) -> Result<Value, String> {
        let values = vec![value.to_string()];
        spec.clean(RawInput {
            values: &values,
            file: None,
        })
    }

    #[test]
    fn test_choices_pair_labels_by_position() {
        let choices = build_choices(Some("a\nb\n c "), Some("Alpha\nBeta"));
        assert_eq!(
            choices,
            vec![
                Choice::new("a", "Alpha"),
                Choice::new("b", "Beta"),
                Choice::new("c", "c"),
            ]
        );
        assert!(build_choices(None, Some("x")).is_empty());
        assert_eq!(build_choices(Some("x\ny"), None)[1], Choice::new("y", "y"));
    }

    #[test]
    fn test_char_length_bounds() {
        let mut field = FormDefinitionField::new("nick", FieldKind::Char);
        field.min_length = Some(2);
        field.max_length = Some(4);
        let spec = compile(&field);
        assert_eq!(clean(&spec, "abc").unwrap(), json!("abc"));
        assert!(clean(&spec, "a").unwrap_err().contains("at least 2"));
        assert!(clean(&spec, "abcde").unwrap_err().contains("at most 4"));
    }

    #[test]
    fn test_required_and_optional_empty() {
        let mut field = FormDefinitionField::new("nick", FieldKind::Char);
        assert_eq!(clean(&compile(&field), "  ").unwrap_err(), REQUIRED_MESSAGE);
        field.required = false;
        assert_eq!(clean(&compile(&field), "").unwrap(), json!(""));
        let mut number = FormDefinitionField::new("n", FieldKind::Integer);
        number.required = false;
        assert_eq!(clean(&compile(&number), "").unwrap(), Value::Null);
    }

    #[test]
    fn test_email() {
        let spec = compile(&FormDefinitionField::new("email", FieldKind::Email));
        assert!(clean(&spec, "ada@example.com").is_ok());
        assert_eq!(clean(&spec, "not-an-email").unwrap_err(), "Enter a valid email address.");
    }

    #[test]
    fn test_integer_bounds() {
        let mut field = FormDefinitionField::new("age", FieldKind::Integer);
        field.min_value = Some(18.0);
        field.max_value = Some(99.9);
        let spec = compile(&field);
        assert_eq!(clean(&spec, "42").unwrap(), json!(42));
        assert_eq!(clean(&spec, "42.0").unwrap(), json!(42));
        assert!(clean(&spec, "17").unwrap_err().contains("greater than or equal to 18"));
        assert!(clean(&spec, "100").unwrap_err().contains("less than or equal to 99"));
        assert_eq!(clean(&spec, "4.5").unwrap_err(), "Enter a whole number.");
    }

    #[test]
    fn test_integer_out_of_range_is_rejected() {
        let spec = compile(&FormDefinitionField::new("count", FieldKind::Integer));
        assert_eq!(clean(&spec, "9999999999999999999").unwrap_err(), "Enter a whole number.");
        assert_eq!(clean(&spec, "-9999999999999999999.0").unwrap_err(), "Enter a whole number.");
        assert_eq!(clean(&spec, "1e3").unwrap_err(), "Enter a whole number.");
        assert_eq!(clean(&spec, "-7.00").unwrap(), json!(-7));
        assert_eq!(clean(&spec, "9223372036854775807").unwrap(), json!(i64::MAX));
    }

    #[test]
    fn test_float() {
        let spec = compile(&FormDefinitionField::new("ratio", FieldKind::Float));
        assert_eq!(clean(&spec, "0.25").unwrap(), json!(0.25));
        assert_eq!(clean(&spec, "3").unwrap(), json!(3.0));
        assert_eq!(clean(&spec, "abc").unwrap_err(), "Enter a number.");
        assert_eq!(clean(&spec, "inf").unwrap_err(), "Enter a number.");
    }

    #[test]
    fn test_decimal_digits() {
        let mut field = FormDefinitionField::new("price", FieldKind::Decimal);
        field.max_digits = Some(5);
        field.decimal_places = Some(2);
        field.min_value = Some(0.0);
        let spec = compile(&field);
        assert_eq!(clean(&spec, "123.45").unwrap(), json!("123.45"));
        assert!(clean(&spec, "1.234").unwrap_err().contains("2 decimal places"));
        assert!(clean(&spec, "1234.5").unwrap_err().contains("3 digits before"));
        assert!(clean(&spec, "123456").unwrap_err().contains("5 digits in total"));
        assert!(clean(&spec, "-1").unwrap_err().contains("greater than or equal to 0"));
        assert_eq!(clean(&spec, "abc").unwrap_err(), "Enter a number.");
    }

    #[test]
    fn test_regex_requires_match() {
        let mut field = FormDefinitionField::new("zip", FieldKind::Regex);
        field.regex = Some(r"^\d{5}$".to_string());
        let spec = compile(&field);
        assert!(clean(&spec, "12345").is_ok());
        assert_eq!(clean(&spec, "1234x").unwrap_err(), "Enter a valid value.");
    }

    #[test]
    fn test_invalid_regex_is_configuration_error() {
        let mut field = FormDefinitionField::new("zip", FieldKind::Regex);
        field.regex = Some("(".to_string());
        let err = FieldCompiler::default().compile(&field, None).unwrap_err();
        assert!(matches!(err, FormsError::Configuration { .. }));
    }

    #[test]
    fn test_choice_and_multiple_choice() {
        let mut field = FormDefinitionField::new("color", FieldKind::Choice);
        field.choice_values = Some("red\ngreen".to_string());
        let spec = compile(&field);
        assert_eq!(clean(&spec, "red").unwrap(), json!("red"));
        assert!(clean(&spec, "blue").unwrap_err().starts_with("Select a valid choice."));

        field.field_class = FieldKind::MultipleChoice;
        let spec = compile(&field);
        let picked = vec!["red".to_string(), "green".to_string()];
        let cleaned = spec
            .clean(RawInput {
                values: &picked,
                file: None,
            })
            .unwrap();
        assert_eq!(cleaned, json!(["red", "green"]));
        assert_eq!(
            spec.clean(RawInput { values: &[], file: None }).unwrap_err(),
            REQUIRED_MESSAGE
        );
    }

    #[test]
    fn test_model_choice_uses_registered_source() {
        let mut compiler = FieldCompiler::default();
        compiler.register_choice_model(
            "countries",
            Arc::new(StaticChoices(vec![Choice::new("ch", "Switzerland")])),
        );
        let mut field = FormDefinitionField::new("country", FieldKind::ModelChoice);
        field.choice_model = Some("countries".to_string());
        field.choice_model_empty_label = Some("---".to_string());
        let spec = compiler.compile(&field, None).unwrap();
        assert_eq!(spec.choices().len(), 1);
        assert!(matches!(
            &spec.params,
            FieldParams::ModelChoices { empty_label: Some(label), .. } if label == "---"
        ));
        assert!(clean(&spec, "ch").is_ok());
        assert!(clean(&spec, "de").is_err());

        field.choice_model = Some("planets".to_string());
        assert!(matches!(
            compiler.compile(&field, None),
            Err(FormsError::Configuration { .. })
        ));
    }

    #[test]
    fn test_boolean_and_null_boolean() {
        let mut field = FormDefinitionField::new("agree", FieldKind::Boolean);
        let spec = compile(&field);
        assert_eq!(clean(&spec, "on").unwrap(), json!(true));
        assert_eq!(clean(&spec, "").unwrap_err(), REQUIRED_MESSAGE);
        field.required = false;
        assert_eq!(clean(&compile(&field), "false").unwrap(), json!(false));

        let spec = compile(&FormDefinitionField::new("maybe", FieldKind::NullBoolean));
        assert_eq!(clean(&spec, "").unwrap(), Value::Null);
        assert_eq!(clean(&spec, "3").unwrap(), json!(false));
    }

    #[test]
    fn test_dates_times_and_urls() {
        let date = compile(&FormDefinitionField::new("d", FieldKind::Date));
        assert_eq!(clean(&date, "12/31/2024").unwrap(), json!("2024-12-31"));
        assert!(clean(&date, "2024-13-01").is_err());
        let dt = compile(&FormDefinitionField::new("dt", FieldKind::DateTime));
        assert_eq!(clean(&dt, "2024-01-02T03:04").unwrap(), json!("2024-01-02 03:04:00"));
        let time = compile(&FormDefinitionField::new("t", FieldKind::Time));
        assert_eq!(clean(&time, "7:30").unwrap(), json!("07:30:00"));
        let url = compile(&FormDefinitionField::new("u", FieldKind::Url));
        assert_eq!(clean(&url, "example.com").unwrap(), json!("http://example.com/"));
        assert_eq!(clean(&url, "not a url").unwrap_err(), "Enter a valid URL.");
    }

    #[test]
    fn test_file_field() {
        let spec = compile(&FormDefinitionField::new("cv", FieldKind::File));
        let cleaned = spec
            .clean(RawInput {
                values: &[],
                file: Some(("cv.pdf", 10)),
            })
            .unwrap();
        assert_eq!(cleaned["name"], json!("cv.pdf"));
        assert_eq!(
            spec.clean(RawInput { values: &[], file: None }).unwrap_err(),
            REQUIRED_MESSAGE
        );
    }

    #[test]
    fn test_disabled_kind_and_widget() {
        let compiler = FieldCompiler::new(&[FieldKind::Char], &[WidgetKind::TextInput]);
        let err = compiler
            .compile(&FormDefinitionField::new("n", FieldKind::Integer), None)
            .unwrap_err();
        assert!(matches!(err, FormsError::Configuration { .. }));

        let mut field = FormDefinitionField::new("n", FieldKind::Char);
        field.widget = Some(WidgetKind::Textarea);
        assert!(compiler.compile(&field, None).is_err());
        field.widget = None;
        assert_eq!(compiler.compile(&field, None).unwrap().widget, WidgetKind::TextInput);
    }

    #[test]
    fn test_initial_values() {
        let mut field = FormDefinitionField::new("n", FieldKind::Char);
        field.initial = Some("hello".to_string());
        let spec = compile(&field);
        assert_eq!(spec.initial, Some(InitialValue::Single("hello".to_string())));
        let spec = FieldCompiler::default()
            .compile(&field, Some(InitialValue::Single("query".to_string())))
            .unwrap();
        assert_eq!(spec.initial, Some(InitialValue::Single("query".to_string())));
    }
}
