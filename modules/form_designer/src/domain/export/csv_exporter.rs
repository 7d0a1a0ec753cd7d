//! Delimited-text exporter

use super::{export_file_name, ExportFormat, ExportResponse, LogExporter};

pub struct CsvExporter {
    delimiter: u8,
    writer: Option<::csv::Writer<Vec<u8>>>,
}

impl CsvExporter {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            writer: None,
        }
    }
}

impl LogExporter for CsvExporter {
    fn init_response(&mut self) -> ExportResponse {
        ExportResponse {
            content_type: ExportFormat::Csv.content_type().to_string(),
            file_name: export_file_name(ExportFormat::Csv),
        }
    }

    fn init_writer(&mut self) -> anyhow::Result<()> {
        self.writer = Some(
            ::csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .flexible(true)
                .from_writer(Vec::new()),
        );
        Ok(())
    }

    fn write_row(&mut self, row: &[String]) -> anyhow::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("CSV writer not initialized"))?;
        writer.write_record(row)?;
        Ok(())
    }

    fn close(self: Box<Self>) -> anyhow::Result<Vec<u8>> {
        match self.writer {
            Some(writer) => Ok(writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e.error()))?),
            None => Ok(Vec::new()),
        }
    }
}
