//! Spreadsheet exporter, available with the `xlsx` feature

use super::{export_file_name, ExportFormat, ExportResponse, LogExporter};
use rust_xlsxwriter::{Workbook, Worksheet};

pub struct XlsxExporter {
    worksheet: Option<Worksheet>,
    row: u32,
}

impl XlsxExporter {
    pub fn new() -> Self {
        Self {
            worksheet: None,
            row: 0,
        }
    }
}

impl Default for XlsxExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl LogExporter for XlsxExporter {
    fn init_response(&mut self) -> ExportResponse {
        ExportResponse {
            content_type: ExportFormat::Xlsx.content_type().to_string(),
            file_name: export_file_name(ExportFormat::Xlsx),
        }
    }

    fn init_writer(&mut self) -> anyhow::Result<()> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name("form logs")?;
        self.worksheet = Some(worksheet);
        self.row = 0;
        Ok(())
    }

    fn write_row(&mut self, row: &[String]) -> anyhow::Result<()> {
        let worksheet = self
            .worksheet
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("XLSX worksheet not initialized"))?;
        for (col, cell) in row.iter().enumerate() {
            let col = u16::try_from(col)?;
            worksheet.write_string(self.row, col, cell)?;
        }
        self.row += 1;
        Ok(())
    }

    fn close(self: Box<Self>) -> anyhow::Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        workbook.push_worksheet(self.worksheet.unwrap_or_else(Worksheet::new));
        Ok(workbook.save_to_buffer()?)
    }
}
