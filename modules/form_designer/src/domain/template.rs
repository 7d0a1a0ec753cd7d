//! `{{ field }}` placeholder substitution for mail headers and bodies
//!
//! Substitution is fail-open: any syntax problem returns the input text
//! unchanged, so a broken template never blocks a submission.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Flat mapping of field name to submitted value
pub type TemplateContext = Map<String, Value>;

/// Whether substituted values must be HTML-escaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateMode {
    Plain,
    Html,
}

#[allow(clippy::unwrap_used)]
static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[,;]+\s*").unwrap());

#[allow(clippy::unwrap_used)]
static VARIABLE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z0-9_]+)*$").unwrap());

#[derive(Debug, PartialEq, Eq)]
struct SyntaxError(String);

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Literal(&'a str),
    Variable(Expression<'a>),
}

#[derive(Debug, PartialEq)]
struct Expression<'a> {
    path: Vec<&'a str>,
    filters: Vec<Filter>,
}

#[derive(Debug, PartialEq)]
enum Filter {
    Default(String),
    Upper,
    Lower,
    Join(String),
    YesNo,
}

/// Substitute placeholders, returning the original text on any syntax error
pub fn try_substitute(text: &str, context: &TemplateContext, mode: TemplateMode) -> String {
    match substitute(text, context, mode) {
        Ok(rendered) => rendered,
        Err(SyntaxError(reason)) => {
            tracing::debug!(reason = %reason, "Template substitution failed, using literal text");
            text.to_string()
        }
    }
}

/// Split a comma-or-semicolon separated template and substitute every piece
///
/// Absent or blank input yields an empty list; blank pieces are dropped.
pub fn try_substitute_list(input: Option<&str>, context: &TemplateContext) -> Vec<String> {
    let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };
    LIST_SEPARATOR
        .split(input)
        .map(|piece| try_substitute(piece, context, TemplateMode::Plain))
        .map(|piece| piece.trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn substitute(text: &str, context: &TemplateContext, mode: TemplateMode) -> Result<String, SyntaxError> {
    let segments = parse(text)?;
    let mut out = String::with_capacity(text.len());
    for segment in segments {
        match segment {
            Segment::Literal(literal) => out.push_str(literal),
            Segment::Variable(expression) => {
                let rendered = evaluate(&expression, context);
                match mode {
                    TemplateMode::Plain => out.push_str(&rendered),
                    TemplateMode::Html => out.push_str(&escape_html(&rendered)),
                }
            }
        }
    }
    Ok(out)
}

fn parse(text: &str) -> Result<Vec<Segment<'_>>, SyntaxError> {
    if text.contains("{%") {
        return Err(SyntaxError("block tags are not supported".to_string()));
    }
    let mut segments = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }
        let after_open = &rest[start + 2..];
        let end = after_open
            .find("}}")
            .ok_or_else(|| SyntaxError("unclosed variable tag".to_string()))?;
        let inner = &after_open[..end];
        if inner.contains("{{") {
            return Err(SyntaxError("nested variable tag".to_string()));
        }
        segments.push(Segment::Variable(parse_expression(inner)?));
        rest = &after_open[end + 2..];
    }
    if rest.contains("}}") {
        return Err(SyntaxError("unopened variable tag".to_string()));
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

fn parse_expression(inner: &str) -> Result<Expression<'_>, SyntaxError> {
    let mut parts = inner.split('|');
    let path = parts.next().unwrap_or_default().trim();
    if path.is_empty() {
        return Err(SyntaxError("empty variable tag".to_string()));
    }
    if !VARIABLE_PATH.is_match(path) {
        return Err(SyntaxError(format!("invalid variable '{}'", path)));
    }
    let filters = parts.map(parse_filter).collect::<Result<Vec<_>, _>>()?;
    Ok(Expression {
        path: path.split('.').collect(),
        filters,
    })
}

fn parse_filter(raw: &str) -> Result<Filter, SyntaxError> {
    let raw = raw.trim();
    let (name, argument) = match raw.split_once(':') {
        Some((name, argument)) => (name.trim(), Some(parse_literal(argument.trim())?)),
        None => (raw, None),
    };
    match (name, argument) {
        ("default", Some(argument)) => Ok(Filter::Default(argument)),
        ("join", Some(argument)) => Ok(Filter::Join(argument)),
        ("upper", None) => Ok(Filter::Upper),
        ("lower", None) => Ok(Filter::Lower),
        ("yesno", None) => Ok(Filter::YesNo),
        _ => Err(SyntaxError(format!("invalid filter '{}'", raw))),
    }
}

fn parse_literal(raw: &str) -> Result<String, SyntaxError> {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return Ok(raw[1..raw.len() - 1].to_string());
        }
    }
    Err(SyntaxError(format!("filter argument {} must be quoted", raw)))
}

fn lookup<'a>(path: &[&str], context: &'a TemplateContext) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = context.get(*first)?;
    for key in rest {
        current = match current {
            Value::Object(map) => map.get(*key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn evaluate(expression: &Expression<'_>, context: &TemplateContext) -> String {
    let value = lookup(&expression.path, context);
    let mut rendered = value.map(render_value).unwrap_or_default();
    for filter in &expression.filters {
        rendered = match filter {
            Filter::Default(fallback) => {
                if is_falsy(value) {
                    fallback.clone()
                } else {
                    rendered
                }
            }
            Filter::Upper => rendered.to_uppercase(),
            Filter::Lower => rendered.to_lowercase(),
            Filter::Join(separator) => match value {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(render_value)
                    .collect::<Vec<_>>()
                    .join(separator),
                _ => rendered,
            },
            Filter::YesNo => match value {
                Some(Value::Null) | None => "maybe".to_string(),
                _ if is_falsy(value) => "no".to_string(),
                _ => "yes".to_string(),
            },
        };
    }
    rendered
}

fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
    }
}

/// Text form of a submitted value
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(", "),
        Value::Object(map) => match map.get("url").and_then(Value::as_str) {
            Some(url) => url.to_string(),
            None => value.to_string(),
        },
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
