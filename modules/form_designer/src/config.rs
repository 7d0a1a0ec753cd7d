//! Configuration for the form designer module

use crate::contract::{FieldKind, WidgetKind};
use crate::domain::export::{ExportFormat, ExportSettings, Friendliness};
use crate::domain::uploads::UploadPolicy;
use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Form designer configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database connection string
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Submission marker name; `%s` is replaced by the definition name
    #[serde(default = "default_submit_flag_name")]
    pub submit_flag_name: String,

    /// Enabled field kinds
    #[serde(default = "default_field_kinds")]
    pub field_kinds: Vec<String>,

    /// Enabled widgets
    #[serde(default = "default_widgets")]
    pub widgets: Vec<String>,

    /// Choice models definitions may reference; empty allows every registered model
    #[serde(default)]
    pub choice_models: Vec<String>,

    /// Named templates for the default plain and HTML message bodies
    #[serde(default)]
    pub message_templates: MessageTemplatesConfig,

    #[serde(default = "default_success_message")]
    pub default_success_message: String,

    #[serde(default = "default_error_message")]
    pub default_error_message: String,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub uploads: UploadsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageTemplatesConfig {
    #[serde(default = "default_text_template")]
    pub text: String,

    #[serde(default = "default_html_template")]
    pub html: String,
}

/// Export column and formatting options
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    #[serde(default = "default_true")]
    pub include_header: bool,

    #[serde(default = "default_true")]
    pub include_created: bool,

    #[serde(default = "default_true")]
    pub include_pk: bool,

    #[serde(default = "default_true")]
    pub include_form: bool,

    /// Text written for empty values
    #[serde(default)]
    pub null_value: String,

    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Enabled export formats, in display order
    #[serde(default = "default_exporters")]
    pub exporters: Vec<String>,

    #[serde(default = "default_yes_label")]
    pub yes_label: String,

    #[serde(default = "default_no_label")]
    pub no_label: String,
}

/// Upload policy and storage locations
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadsConfig {
    /// Permanent storage for saved uploads
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Where request uploads are spooled before validation
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Lower-case extensions; empty allows any type
    #[serde(default)]
    pub allowed_file_types: Vec<String>,

    /// Per-file limit in bytes
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,

    /// Limit for all files of one submission, in bytes
    #[serde(default = "default_max_upload_total_size")]
    pub max_upload_total_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            submit_flag_name: default_submit_flag_name(),
            field_kinds: default_field_kinds(),
            widgets: default_widgets(),
            choice_models: Vec::new(),
            message_templates: MessageTemplatesConfig::default(),
            default_success_message: default_success_message(),
            default_error_message: default_error_message(),
            export: ExportConfig::default(),
            uploads: UploadsConfig::default(),
        }
    }
}

impl Default for MessageTemplatesConfig {
    fn default() -> Self {
        Self {
            text: default_text_template(),
            html: default_html_template(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_header: true,
            include_created: true,
            include_pk: true,
            include_form: true,
            null_value: String::new(),
            delimiter: default_delimiter(),
            encoding: default_encoding(),
            exporters: default_exporters(),
            yes_label: default_yes_label(),
            no_label: default_no_label(),
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            temp_dir: default_temp_dir(),
            allowed_file_types: Vec::new(),
            max_upload_size: default_max_upload_size(),
            max_upload_total_size: default_max_upload_total_size(),
        }
    }
}

impl Config {
    /// Load from an optional YAML file overlaid with `FORM_DESIGNER_*` variables
    ///
    /// Nested keys use a double underscore, e.g. `FORM_DESIGNER_EXPORT__DELIMITER`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed("FORM_DESIGNER_").split("__"))
            .extract()
            .context("failed to load form designer configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject unknown names and unsupported options
    pub fn validate(&self) -> Result<()> {
        self.enabled_field_kinds()?;
        self.enabled_widgets()?;
        self.enabled_export_formats()?;
        self.export_delimiter()?;
        if !matches!(self.export.encoding.to_ascii_lowercase().as_str(), "utf-8" | "utf8") {
            bail!("unsupported export encoding '{}'", self.export.encoding);
        }
        Ok(())
    }

    pub fn enabled_field_kinds(&self) -> Result<Vec<FieldKind>> {
        self.field_kinds
            .iter()
            .map(|name| FieldKind::from_str(name).map_err(anyhow::Error::msg))
            .collect()
    }

    pub fn enabled_widgets(&self) -> Result<Vec<WidgetKind>> {
        self.widgets
            .iter()
            .map(|name| WidgetKind::from_str(name).map_err(anyhow::Error::msg))
            .collect()
    }

    pub fn enabled_export_formats(&self) -> Result<Vec<ExportFormat>> {
        self.export
            .exporters
            .iter()
            .map(|name| ExportFormat::from_str(name).map_err(anyhow::Error::msg))
            .collect()
    }

    pub fn export_delimiter(&self) -> Result<u8> {
        match self.export.delimiter.as_bytes() {
            [byte] => Ok(*byte),
            _ => bail!(
                "export delimiter must be a single ASCII character, got '{}'",
                self.export.delimiter
            ),
        }
    }

    pub fn export_settings(&self) -> Result<ExportSettings> {
        Ok(ExportSettings {
            include_header: self.export.include_header,
            include_created: self.export.include_created,
            include_pk: self.export.include_pk,
            include_form: self.export.include_form,
            delimiter: self.export_delimiter()?,
            friendliness: Friendliness {
                null_value: self.export.null_value.clone(),
                yes_label: self.export.yes_label.clone(),
                no_label: self.export.no_label.clone(),
            },
        })
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            allowed_file_types: self
                .uploads
                .allowed_file_types
                .iter()
                .map(|t| t.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_upload_size: self.uploads.max_upload_size,
            max_upload_total_size: self.uploads.max_upload_total_size,
        }
    }
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_submit_flag_name() -> String {
    "submit__%s".to_string()
}

fn default_field_kinds() -> Vec<String> {
    FieldKind::ALL.iter().map(|k| k.as_str().to_string()).collect()
}

fn default_widgets() -> Vec<String> {
    WidgetKind::ALL.iter().map(|w| w.as_str().to_string()).collect()
}

fn default_text_template() -> String {
    crate::domain::mail::DEFAULT_TEXT_TEMPLATE.to_string()
}

fn default_html_template() -> String {
    crate::domain::mail::DEFAULT_HTML_TEMPLATE.to_string()
}

fn default_success_message() -> String {
    crate::domain::submission::DEFAULT_SUCCESS_MESSAGE.to_string()
}

fn default_error_message() -> String {
    crate::domain::submission::DEFAULT_ERROR_MESSAGE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_exporters() -> Vec<String> {
    ExportFormat::ALL.iter().map(|f| f.name().to_string()).collect()
}

fn default_yes_label() -> String {
    "yes".to_string()
}

fn default_no_label() -> String {
    "no".to_string()
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("uploads/form_designer")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("form_designer")
}

fn default_max_upload_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_max_upload_total_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.enabled_field_kinds().unwrap().len(), FieldKind::ALL.len());
        assert_eq!(config.export_delimiter().unwrap(), b',');
        assert_eq!(config.submit_flag_name, "submit__%s");
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r#"
submit_flag_name: "sent_%s"
field_kinds: ["char", "email"]
export:
  delimiter: ";"
  exporters: ["CSV"]
  null_value: "-"
uploads:
  allowed_file_types: [".PDF"]
"#;
        let config: Config = Figment::new().merge(Yaml::string(yaml)).extract().unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.enabled_field_kinds().unwrap(), vec![FieldKind::Char, FieldKind::Email]);
        assert_eq!(config.export_settings().unwrap().delimiter, b';');
        assert_eq!(config.upload_policy().allowed_file_types, vec!["pdf".to_string()]);
        assert!(config.export.include_header);
    }

    #[test]
    fn test_rejects_unknown_names() {
        let config = Config {
            field_kinds: vec!["signature".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.export.exporters = vec!["PDF".to_string()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.export.encoding = "latin-1".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: Result<Config, _> = Figment::new()
            .merge(Serialized::default("no_such_option", true))
            .extract();
        assert!(result.is_err());
    }
}
