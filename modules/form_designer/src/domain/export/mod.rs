//! Log exporters and the shared export driver
//!
//! Each format implements [`LogExporter`]; [`export_logs`] drives any of them
//! over a set of reconciled logs. Formats are enabled through an
//! [`ExporterRegistry`] built once at startup.

mod csv_exporter;
pub mod friendly;
#[cfg(feature = "xlsx")]
mod xlsx_exporter;

pub use csv_exporter::CsvExporter;
pub use friendly::Friendliness;
#[cfg(feature = "xlsx")]
pub use xlsx_exporter::XlsxExporter;

use crate::contract::{ExportedFile, FormDefinition, FormValueEntry, FormsError, FormLog};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

const EXPORT_FILE_STEM: &str = "form logs";

/// Known export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [Self::Csv, Self::Xlsx];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Xlsx => "XLSX",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// Whether this build carries the writer for the format
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Csv => true,
            Self::Xlsx => cfg!(feature = "xlsx"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown export format '{}'", s))
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Response metadata set up before writing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResponse {
    pub content_type: String,
    pub file_name: String,
}

/// One tabular output format
pub trait LogExporter: Send {
    fn init_response(&mut self) -> ExportResponse;

    fn init_writer(&mut self) -> anyhow::Result<()>;

    fn write_row(&mut self, row: &[String]) -> anyhow::Result<()>;

    /// Finish the document and return its bytes
    fn close(self: Box<Self>) -> anyhow::Result<Vec<u8>>;
}

/// Column inclusion and value rendering options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub include_header: bool,
    pub include_created: bool,
    pub include_pk: bool,
    pub include_form: bool,
    pub delimiter: u8,
    pub friendliness: Friendliness,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            include_header: true,
            include_created: true,
            include_pk: true,
            include_form: true,
            delimiter: b',',
            friendliness: Friendliness::default(),
        }
    }
}

/// A log with its definition and reconciled values, ready for export
#[derive(Debug, Clone, Copy)]
pub struct ExportRow<'a> {
    pub definition: &'a FormDefinition,
    pub log: &'a FormLog,
    pub data: &'a [FormValueEntry],
}

/// Ordered set of formats enabled for this process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterRegistry {
    formats: Vec<ExportFormat>,
    settings: ExportSettings,
}

impl ExporterRegistry {
    /// Build from configured format names
    ///
    /// Unknown names are configuration errors; formats this build cannot write
    /// are left out.
    pub fn new(names: &[String], settings: ExportSettings) -> Result<Self, FormsError> {
        let mut formats = Vec::new();
        for name in names {
            let format = ExportFormat::from_str(name).map_err(FormsError::configuration)?;
            if !format.is_enabled() {
                tracing::info!(format = %format, "Export format disabled in this build");
                continue;
            }
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        tracing::debug!(formats = ?formats, "Exporter registry built");
        Ok(Self { formats, settings })
    }

    pub fn available(&self) -> &[ExportFormat] {
        &self.formats
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Look up an enabled format by name (case-insensitive)
    pub fn select(&self, name: &str) -> Result<ExportFormat, FormsError> {
        self.formats
            .iter()
            .copied()
            .find(|format| format.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| FormsError::ExportFormatUnavailable {
                format: name.to_string(),
            })
    }

    pub fn exporter(&self, format: ExportFormat) -> Result<Box<dyn LogExporter>, FormsError> {
        match format {
            ExportFormat::Csv => Ok(Box::new(CsvExporter::new(self.settings.delimiter))),
            #[cfg(feature = "xlsx")]
            ExportFormat::Xlsx => Ok(Box::new(XlsxExporter::new())),
            #[cfg(not(feature = "xlsx"))]
            ExportFormat::Xlsx => Err(FormsError::ExportFormatUnavailable {
                format: format.name().to_string(),
            }),
        }
    }
}

pub(crate) fn export_file_name(format: ExportFormat) -> String {
    format!("{}.{}", EXPORT_FILE_STEM, format.extension())
}

/// Write logs through an exporter
///
/// A header row is written only when every log belongs to one definition; the
/// Form column only when they span several. Each row lists its own
/// definition's current fields in order.
pub fn export_logs(
    mut exporter: Box<dyn LogExporter>,
    rows: &[ExportRow<'_>],
    settings: &ExportSettings,
) -> Result<ExportedFile, FormsError> {
    let response = exporter.init_response();
    exporter.init_writer().map_err(FormsError::storage)?;

    let distinct: BTreeSet<i32> = rows.iter().map(|row| row.log.form_definition_id).collect();
    let include_header = settings.include_header && distinct.len() == 1;
    let include_form = settings.include_form && distinct.len() > 1;

    if let Some(first) = rows.first() {
        if include_header {
            let mut header = Vec::new();
            if include_form {
                header.push("Form".to_string());
            }
            if settings.include_created {
                header.push("Created".to_string());
            }
            if settings.include_pk {
                header.push("ID".to_string());
            }
            header.extend(
                first
                    .definition
                    .ordered_fields()
                    .into_iter()
                    .map(|field| field.display_label().to_string()),
            );
            exporter.write_row(&header).map_err(FormsError::storage)?;
        }

        for row in rows {
            let mut cells = Vec::new();
            if include_form {
                cells.push(row.definition.display_name().to_string());
            }
            if settings.include_created {
                cells.push(row.log.created_at.format("%Y-%m-%d %H:%M:%S").to_string());
            }
            if settings.include_pk {
                cells.push(row.log.id.to_string());
            }
            let by_name: HashMap<&str, &serde_json::Value> = row
                .data
                .iter()
                .map(|entry| (entry.name.as_str(), &entry.value))
                .collect();
            for field in row.definition.ordered_fields() {
                let cell = match by_name.get(field.name.as_str()) {
                    Some(value) => settings.friendliness.render(value),
                    None => settings.friendliness.null_value.clone(),
                };
                cells.push(cell);
            }
            exporter.write_row(&cells).map_err(FormsError::storage)?;
        }
    }

    let body = exporter.close().map_err(FormsError::storage)?;
    Ok(ExportedFile {
        content_type: response.content_type,
        file_name: response.file_name,
        body,
    })
}
