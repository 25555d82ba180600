//! Report export: CSV (two titled sections) and Excel workbook.

use chrono::{DateTime, Local, NaiveDate, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::format::{local_datetime, yes_no};
use crate::models::{Delivery, Visitor};

const BOM: &str = "\u{feff}";
const CRLF: &str = "\r\n";

pub const VISITOR_TITLE: &str = "REGISTRO DE VISITANTES";
pub const DELIVERY_TITLE: &str = "REGISTRO DE ENTREGAS";

pub const VISITOR_HEADERS: [&str; 14] = [
    "ID",
    "Nome",
    "Documento",
    "Empresa/Origem",
    "Motivo da Visita",
    "Pessoa Visitada",
    "Horário de Entrada",
    "Horário de Saída",
    "Capacete",
    "Bota",
    "Óculos",
    "Veículo",
    "Cor",
    "Placa",
];

pub const DELIVERY_HEADERS: [&str; 8] = [
    "ID",
    "Fornecedor",
    "Motorista",
    "Documento do Motorista",
    "Nº da NF",
    "Placa",
    "Horário de Entrada",
    "Horário de Saída",
];

/// Output format chosen in the reports view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
        }
    }

    fn filter_name(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "Planilha CSV",
            ExportFormat::Excel => "Planilha Excel",
        }
    }
}

/// One exported value. Only the record id is numeric; everything else is text.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Id(i64),
    Text(String),
    Blank,
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn exit(value: Option<&DateTime<Utc>>) -> Self {
        value.map_or(Cell::Blank, |at| Cell::Text(local_datetime(at)))
    }

    /// CSV form: text is always quoted so numeric-looking values keep their zeros.
    fn to_csv(&self) -> String {
        match self {
            Cell::Id(id) => id.to_string(),
            Cell::Text(text) => format!("\"{}\"", text.replace('"', "\"\"")),
            Cell::Blank => String::new(),
        }
    }
}

fn visitor_row(v: &Visitor) -> Vec<Cell> {
    vec![
        Cell::Id(v.id),
        Cell::text(&v.name),
        Cell::text(&v.document),
        Cell::text(&v.company),
        Cell::text(&v.visit_reason),
        Cell::text(&v.person_visited),
        Cell::text(local_datetime(&v.entry_time)),
        Cell::exit(v.exit_time.as_ref()),
        Cell::text(yes_no(v.epi.helmet)),
        Cell::text(yes_no(v.epi.boots)),
        Cell::text(yes_no(v.epi.glasses)),
        Cell::text(&v.vehicle.model),
        Cell::text(&v.vehicle.color),
        Cell::text(&v.vehicle.plate),
    ]
}

fn delivery_row(d: &Delivery) -> Vec<Cell> {
    vec![
        Cell::Id(d.id),
        Cell::text(&d.supplier),
        Cell::text(&d.driver_name),
        Cell::text(&d.driver_document),
        Cell::text(&d.invoice_number),
        Cell::text(&d.license_plate),
        Cell::text(local_datetime(&d.entry_time)),
        Cell::exit(d.exit_time.as_ref()),
    ]
}

/// Title line, bare header row, then data rows with every text field quoted.
fn write_section(out: &mut String, title: &str, headers: &[&str], rows: Vec<Vec<Cell>>) -> Result<()> {
    out.push_str(title);
    out.push_str(CRLF);

    let mut header = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());
    header.write_record(headers).map_err(csv_error)?;
    out.push_str(&finish(header)?);

    for row in rows {
        let line: Vec<String> = row.iter().map(Cell::to_csv).collect();
        out.push_str(&line.join(","));
        out.push_str(CRLF);
    }
    Ok(())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer.into_inner().map_err(|e| AppError::export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::export(e.to_string()))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::export(e.to_string())
}

/// Whole report as one UTF-8 string with a leading BOM.
///
/// Both sections are always present, even without rows.
pub fn render_csv(visitors: &[Visitor], deliveries: &[Delivery]) -> Result<String> {
    let mut out = String::from(BOM);
    write_section(&mut out, VISITOR_TITLE, &VISITOR_HEADERS, visitors.iter().map(visitor_row).collect())?;
    out.push_str(CRLF);
    out.push_str(CRLF);
    write_section(&mut out, DELIVERY_TITLE, &DELIVERY_HEADERS, deliveries.iter().map(delivery_row).collect())?;
    Ok(out)
}

/// Export both registers to an Excel file, one sheet each.
pub fn export_to_excel(visitors: &[Visitor], deliveries: &[Delivery], path: &Path) -> std::result::Result<(), XlsxError> {
    let mut workbook = Workbook::new();

    // Header format
    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF2A900))
        .set_font_color(Color::Black)
        .set_border(FormatBorder::Thin);

    let sheet = workbook.add_worksheet();
    sheet.set_name("Visitantes")?;
    write_sheet(sheet, &VISITOR_HEADERS, visitors.iter().map(visitor_row), &header_format)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name("Entregas")?;
    write_sheet(sheet, &DELIVERY_HEADERS, deliveries.iter().map(delivery_row), &header_format)?;

    workbook.save(path)?;
    Ok(())
}

fn write_sheet(
    sheet: &mut Worksheet,
    headers: &[&str],
    rows: impl Iterator<Item = Vec<Cell>>,
    header_format: &Format,
) -> std::result::Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, header_format)?;
        sheet.set_column_width(col as u16, if col == 0 { 8 } else { 22 })?;
    }

    let mut last_row = 0u32;
    for (idx, row) in rows.enumerate() {
        last_row = (idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            // IDs as numbers so the sheet sorts them properly
            match cell {
                Cell::Id(id) => {
                    sheet.write_number(last_row, col as u16, *id as f64)?;
                }
                Cell::Text(text) => {
                    sheet.write_string(last_row, col as u16, text)?;
                }
                Cell::Blank => {}
            }
        }
    }

    if last_row > 0 {
        sheet.autofilter(0, 0, last_row, (headers.len() - 1) as u16)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// `relatorio_portaria_<date>.<ext>`.
pub fn export_filename(date: NaiveDate, format: ExportFormat) -> String {
    format!("relatorio_portaria_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

/// Default filename for today.
pub fn default_export_filename(format: ExportFormat) -> String {
    export_filename(Local::now().date_naive(), format)
}

/// Open save file dialog and return selected path.
pub fn show_save_dialog(format: ExportFormat, directory: Option<&Path>) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new()
        .set_title("Exportar relatório")
        .set_file_name(default_export_filename(format))
        .add_filter(format.filter_name(), &[format.extension()]);
    if let Some(dir) = directory {
        dialog = dialog.set_directory(dir);
    }
    dialog.save_file()
}

/// Write the report in `format` to `path`.
pub fn export(format: ExportFormat, visitors: &[Visitor], deliveries: &[Delivery], path: &Path) -> Result<()> {
    match format {
        ExportFormat::Csv => std::fs::write(path, render_csv(visitors, deliveries)?)?,
        ExportFormat::Excel => export_to_excel(visitors, deliveries, path).map_err(|e| AppError::export(e.to_string()))?,
    }
    tracing::info!(
        "Exported {} visitors and {} deliveries to {}",
        visitors.len(),
        deliveries.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::delivery::tests::sample_delivery;
    use crate::models::visitor::tests::sample_visitor;

    #[test]
    fn test_empty_export_has_both_sections() {
        let csv = render_csv(&[], &[]).unwrap();
        assert!(csv.starts_with('\u{feff}'));

        let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').split("\r\n").collect();
        assert_eq!(lines[0], VISITOR_TITLE);
        assert_eq!(lines[1], VISITOR_HEADERS.join(","));
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], DELIVERY_TITLE);
        assert_eq!(lines[5], DELIVERY_HEADERS.join(","));
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[6], "");
    }

    #[test]
    fn test_rows_are_quoted_and_localised() {
        let mut visitor = sample_visitor(7);
        visitor.company = "ACME \"FILIAL\", SP".to_string();
        let csv = render_csv(&[visitor.clone()], &[sample_delivery(3)]).unwrap();

        assert!(csv.contains("7,\"JOÃO SILVA\",\"123.456.789-09\",\"ACME \"\"FILIAL\"\", SP\""));
        assert!(csv.contains("\"Sim\",\"Sim\",\"Não\""));
        assert!(csv.contains(&format!("\"{}\"", local_datetime(&visitor.entry_time))));
        assert!(csv.contains("3,\"CIMENTOS SA\",\"CARLOS\""));
        assert!(!csv.contains("\n\n\n"));
    }

    #[test]
    fn test_numeric_text_keeps_quotes() {
        let mut delivery = sample_delivery(3);
        delivery.invoice_number = "000123".to_string();
        delivery.driver_document = "12".to_string();
        let csv = render_csv(&[], &[delivery.clone()]).unwrap();

        let expected = format!(
            "3,\"CIMENTOS SA\",\"CARLOS\",\"12\",\"000123\",\"XYZ9A87\",\"{}\",\r\n",
            local_datetime(&delivery.entry_time)
        );
        assert!(csv.contains(&expected), "{csv}");
    }

    #[test]
    fn test_missing_exit_is_bare_empty_field() {
        let mut visitor = sample_visitor(2);
        visitor.exit_time = None;
        let csv = render_csv(&[visitor.clone()], &[]).unwrap();
        assert!(csv.contains(&format!("\"{}\",,\"", local_datetime(&visitor.entry_time))));
        assert!(!csv.contains(",\"\","));

        let exited = Some(visitor.entry_time + chrono::Duration::hours(2));
        visitor.exit_time = exited;
        let csv = render_csv(&[visitor], &[]).unwrap();
        assert!(csv.contains(&format!(",\"{}\",", local_datetime(&exited.unwrap()))));
    }

    #[test]
    fn test_sections_separated_by_two_blank_lines() {
        let csv = render_csv(&[sample_visitor(1)], &[]).unwrap();
        assert!(csv.contains("\"ABC1D23\"\r\n\r\n\r\nREGISTRO DE ENTREGAS\r\n"));
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert_eq!(export_filename(date, ExportFormat::Csv), "relatorio_portaria_2026-10-15.csv");
        assert_eq!(export_filename(date, ExportFormat::Excel), "relatorio_portaria_2026-10-15.xlsx");
    }

    #[test]
    fn test_export_writes_files() {
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("r.csv");
        export(ExportFormat::Csv, &[sample_visitor(1)], &[], &csv_path).unwrap();
        let bytes = std::fs::read(&csv_path).unwrap();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);

        let xlsx_path = dir.path().join("r.xlsx");
        export(ExportFormat::Excel, &[sample_visitor(1)], &[sample_delivery(1)], &xlsx_path).unwrap();
        assert!(std::fs::metadata(&xlsx_path).unwrap().len() > 0);
    }
}
