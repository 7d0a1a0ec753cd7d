//! Notification mail assembly and the mail transport seam

use super::log_store::{form_data_context, message_context};
use super::template::{escape_html, render_value, try_substitute, try_substitute_list, TemplateContext, TemplateMode};
use super::uploads::UploadedFile;
use crate::contract::{FormDefinition, FormValueEntry, FormsError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

#[allow(clippy::unwrap_used)]
static OPENING_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

#[allow(clippy::unwrap_used)]
static CLOSING_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</[^>]+>").unwrap());

pub const DEFAULT_TEXT_TEMPLATE: &str = "txt/formdefinition/data_message.txt";
pub const DEFAULT_HTML_TEMPLATE: &str = "html/formdefinition/data_table_message.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Plain,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: Option<String>,
    pub path: PathBuf,
}

/// Assembled notification, handed to a [`MailTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub subject: String,
    pub body: String,
    /// None uses the transport's default sender
    pub from: Option<String>,
    pub to: Vec<String>,
    pub reply_to: Vec<String>,
    pub content_kind: ContentKind,
    pub attachments: Vec<Attachment>,
}

/// Mail sending collaborator
///
/// Errors are delivery failures; the caller does not retry.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> anyhow::Result<()>;
}

/// Transport that only logs outgoing messages
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, message: &MailMessage) -> anyhow::Result<()> {
        tracing::info!(
            to = ?message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "Form mail (log transport)"
        );
        Ok(())
    }
}

/// Resolver for named message templates
pub trait TemplateResolver: Send + Sync {
    /// Render a named template; None when the name is unknown
    fn render(&self, name: &str, context: &TemplateContext) -> Option<String>;
}

/// Built-in default templates plus templates registered by name
#[derive(Debug, Clone)]
pub struct BuiltinTemplates {
    text_name: String,
    html_name: String,
    named: HashMap<String, String>,
}

impl Default for BuiltinTemplates {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_TEMPLATE, DEFAULT_HTML_TEMPLATE)
    }
}

impl BuiltinTemplates {
    pub fn new(text_name: impl Into<String>, html_name: impl Into<String>) -> Self {
        Self {
            text_name: text_name.into(),
            html_name: html_name.into(),
            named: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.named.insert(name.into(), source.into());
    }
}

impl TemplateResolver for BuiltinTemplates {
    fn render(&self, name: &str, context: &TemplateContext) -> Option<String> {
        if name == self.text_name {
            return Some(render_text_table(context));
        }
        if name == self.html_name {
            return Some(render_html_table(context));
        }
        let source = self.named.get(name)?;
        let mode = if name.ends_with(".html") { TemplateMode::Html } else { TemplateMode::Plain };
        Some(try_substitute(source, context, mode))
    }
}

fn data_rows(context: &TemplateContext) -> Vec<(String, String)> {
    context
        .get("data")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    let label = row.get("label").map(render_value).unwrap_or_default();
                    let value = row.get("value").map(render_value).unwrap_or_default();
                    (label, value)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn render_text_table(context: &TemplateContext) -> String {
    data_rows(context)
        .into_iter()
        .map(|(label, value)| format!("{}: {}\n", label, value))
        .collect()
}

fn render_html_table(context: &TemplateContext) -> String {
    let mut out = String::from("<table>\n");
    for (label, value) in data_rows(context) {
        out.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            escape_html(&label),
            escape_html(&value)
        ));
    }
    out.push_str("</table>\n");
    out
}

/// Whether the effective message body is HTML
pub fn is_template_html(definition: &FormDefinition) -> bool {
    let inline = definition.message_template.as_deref().filter(|t| !t.is_empty());
    let named = definition.message_template_name.as_deref().filter(|t| !t.is_empty());
    match (named, inline) {
        (Some(name), _) => name.ends_with(".html"),
        (None, Some(text)) => OPENING_TAG.is_match(text) && CLOSING_TAG.is_match(text),
        (None, None) => definition.html_default_template,
    }
}

/// Render the message body
///
/// Resolution order: named template, inline template, then the default text
/// or HTML template.
pub fn compile_message(
    definition: &FormDefinition,
    entries: &[FormValueEntry],
    templates: &dyn TemplateResolver,
    default_names: (&str, &str),
) -> Result<String, FormsError> {
    let context = message_context(entries);
    let named = definition.message_template_name.as_deref().filter(|t| !t.is_empty());
    let inline = definition.message_template.as_deref().filter(|t| !t.is_empty());

    if let Some(text) = inline.filter(|_| named.is_none()) {
        let mode = if is_template_html(definition) { TemplateMode::Html } else { TemplateMode::Plain };
        return Ok(try_substitute(text, &context, mode));
    }

    let name = named.unwrap_or(if definition.html_default_template {
        default_names.1
    } else {
        default_names.0
    });
    templates
        .render(name, &context)
        .ok_or_else(|| FormsError::configuration(format!("unknown message template '{}'", name)))
}

/// Assemble the notification for a submission
///
/// Returns None when the recipient template resolves to no address.
pub fn build_form_mail(
    definition: &FormDefinition,
    entries: &[FormValueEntry],
    uploads: &[UploadedFile],
    templates: &dyn TemplateResolver,
    default_names: (&str, &str),
) -> Result<Option<MailMessage>, FormsError> {
    let context = form_data_context(entries);
    let to = try_substitute_list(definition.mail_to.as_deref(), &context);
    if to.is_empty() {
        return Ok(None);
    }

    let body = compile_message(definition, entries, templates, default_names)?;
    let from = definition
        .mail_from
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| try_substitute(s, &context, TemplateMode::Plain).trim().to_string());
    let reply_to = try_substitute_list(definition.mail_reply_to.as_deref(), &context);
    let subject_template = definition
        .mail_subject
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(definition.title.as_deref())
        .unwrap_or_default();
    let subject = try_substitute(subject_template, &context, TemplateMode::Plain);

    let attachments = if definition.mail_uploaded_files {
        uploads
            .iter()
            .map(|file| Attachment {
                file_name: file.file_name.clone(),
                content_type: file.content_type.clone(),
                path: file.path.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(Some(MailMessage {
        subject,
        body,
        from,
        to,
        reply_to,
        content_kind: if is_template_html(definition) { ContentKind::Html } else { ContentKind::Plain },
        attachments,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEFAULTS: (&str, &str) = (DEFAULT_TEXT_TEMPLATE, DEFAULT_HTML_TEMPLATE);

    fn entries() -> Vec<FormValueEntry> {
        vec![
            FormValueEntry::new("name", json!("Ada"), Some("Name".to_string())),
            FormValueEntry::new("email", json!("ada@example.com"), None),
        ]
    }

    fn definition() -> FormDefinition {
        let mut def = FormDefinition::new("contact");
        def.title = Some("Contact".to_string());
        def.mail_to = Some("admin@example.com; {{ email }}".to_string());
        def
    }

    #[test]
    fn test_no_recipients_means_no_mail() {
        let mut def = definition();
        def.mail_to = Some("{{ missing }}".to_string());
        let mail = build_form_mail(&def, &entries(), &[], &BuiltinTemplates::default(), DEFAULTS).unwrap();
        assert!(mail.is_none());
    }

    #[test]
    fn test_headers_are_substituted() {
        let mut def = definition();
        def.mail_from = Some("{{ name }} <noreply@example.com>".to_string());
        def.mail_reply_to = Some("{{ email }}".to_string());
        def.mail_subject = Some("Message from {{ name }}".to_string());
        let mail = build_form_mail(&def, &entries(), &[], &BuiltinTemplates::default(), DEFAULTS)
            .unwrap()
            .unwrap();
        assert_eq!(mail.to, vec!["admin@example.com", "ada@example.com"]);
        assert_eq!(mail.from.as_deref(), Some("Ada <noreply@example.com>"));
        assert_eq!(mail.reply_to, vec!["ada@example.com"]);
        assert_eq!(mail.subject, "Message from Ada");
        assert_eq!(mail.content_kind, ContentKind::Plain);
        assert_eq!(mail.body, "Name: Ada\nemail: ada@example.com\n");
    }

    #[test]
    fn test_subject_falls_back_to_title() {
        let mail = build_form_mail(&definition(), &entries(), &[], &BuiltinTemplates::default(), DEFAULTS)
            .unwrap()
            .unwrap();
        assert_eq!(mail.subject, "Contact");
    }

    #[test]
    fn test_html_default_template() {
        let mut def = definition();
        def.html_default_template = true;
        let mail = build_form_mail(&def, &entries(), &[], &BuiltinTemplates::default(), DEFAULTS)
            .unwrap()
            .unwrap();
        assert_eq!(mail.content_kind, ContentKind::Html);
        assert!(mail.body.contains("<tr><th>Name</th><td>Ada</td></tr>"));
    }

    #[test]
    fn test_inline_template_and_html_detection() {
        let mut def = definition();
        def.message_template = Some("Hello {{ name }}".to_string());
        assert!(!is_template_html(&def));
        let body = compile_message(&def, &entries(), &BuiltinTemplates::default(), DEFAULTS).unwrap();
        assert_eq!(body, "Hello Ada");

        def.message_template = Some("<p>{{ name }}</p>".to_string());
        assert!(is_template_html(&def));
        def.message_template = Some("a < b".to_string());
        def.html_default_template = true;
        assert!(!is_template_html(&def));
    }

    #[test]
    fn test_named_template_wins() {
        let mut templates = BuiltinTemplates::default();
        templates.register("mail/custom.txt", "Custom for {{ name }}");
        let mut def = definition();
        def.message_template = Some("inline".to_string());
        def.message_template_name = Some("mail/custom.txt".to_string());
        let body = compile_message(&def, &entries(), &templates, DEFAULTS).unwrap();
        assert_eq!(body, "Custom for Ada");

        def.message_template_name = Some("mail/missing.txt".to_string());
        assert!(matches!(
            compile_message(&def, &entries(), &templates, DEFAULTS),
            Err(FormsError::Configuration { .. })
        ));
    }

    #[test]
    fn test_attachments_follow_flag() {
        let upload = UploadedFile {
            field_name: "cv".to_string(),
            file_name: "cv.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            size: 3,
            path: PathBuf::from("/tmp/cv.pdf"),
            stored_location: None,
        };
        let mut def = definition();
        let mail = build_form_mail(&def, &entries(), &[upload.clone()], &BuiltinTemplates::default(), DEFAULTS)
            .unwrap()
            .unwrap();
        assert_eq!(mail.attachments.len(), 1);
        def.mail_uploaded_files = false;
        let mail = build_form_mail(&def, &entries(), &[upload], &BuiltinTemplates::default(), DEFAULTS)
            .unwrap()
            .unwrap();
        assert!(mail.attachments.is_empty());
    }
}
