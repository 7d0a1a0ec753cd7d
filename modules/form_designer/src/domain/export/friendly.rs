//! Human-readable text for exported values

use serde_json::Value;

/// Labels used when flattening values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Friendliness {
    pub null_value: String,
    pub yes_label: String,
    pub no_label: String,
}

impl Default for Friendliness {
    fn default() -> Self {
        Self {
            null_value: String::new(),
            yes_label: "yes".to_string(),
            no_label: "no".to_string(),
        }
    }
}

impl Friendliness {
    pub fn render(&self, value: &Value) -> String {
        match value {
            Value::Null => self.null_value.clone(),
            Value::Bool(true) => self.yes_label.clone(),
            Value::Bool(false) => self.no_label.clone(),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Array(items) => items
                .iter()
                .map(|item| self.render(item))
                .collect::<Vec<_>>()
                .join(", "),
            Value::Object(map) => match map.get("url").and_then(Value::as_str) {
                Some(url) => url.to_string(),
                None => value.to_string(),
            },
        }
    }
}
