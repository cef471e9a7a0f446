//! Spreadsheet export of enriched declarations.

use std::path::Path;

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::info;

use super::columns::{
    display_label, extra_columns, sanitize, sort_by_reg_date, Cell, CAPTURED_AT_LABEL,
    DETAIL_URL_LABEL, DISPLAY_COLUMNS,
};
use super::links::detail_url;
use crate::error::ExportError;
use crate::model::Declaration;

/// Excel's per-cell character limit.
const MAX_CELL_CHARS: usize = 32_767;

const SHEET_NAME: &str = "Декларации";

/// Result of an export attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The workbook was written with this many data rows.
    Written { rows: usize },
    /// Nothing to export; no file was created.
    NoData,
}

/// Write `records` to an `.xlsx` workbook at `path`.
///
/// Rows are sorted by registration date (unparseable dates last). Columns
/// are the display-labelled known fields, then extra fields by name, then
/// the capture timestamp and the detail-page URL.
pub fn export_workbook(
    records: &[Declaration],
    path: &Path,
    captured_at: NaiveDateTime,
    detail_base: &str,
) -> Result<ExportOutcome, ExportError> {
    if records.is_empty() {
        info!("no data to export, skipping {}", path.display());
        return Ok(ExportOutcome::NoData);
    }

    let mut rows = records.to_vec();
    sort_by_reg_date(&mut rows);

    let extras = extra_columns(&rows);
    let headers = header_row(&extras);

    let captured_at = captured_at.format("%Y-%m-%d %H:%M:%S").to_string();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, label) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, label, &bold)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (i, record) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        let fields = record.to_fields();
        let mut col: u16 = 0;

        for (key, _) in DISPLAY_COLUMNS {
            let cell = if *key == "declDate" {
                Cell::reg_date(record.decl_date.as_deref())
            } else {
                fields.get(*key).map(Cell::from_value).unwrap_or(Cell::Empty)
            };
            write_cell(sheet, row, col, &cell)?;
            col += 1;
        }

        for key in &extras {
            let cell = fields.get(key).map(Cell::from_value).unwrap_or(Cell::Empty);
            write_cell(sheet, row, col, &cell)?;
            col += 1;
        }

        write_cell(sheet, row, col, &Cell::Text(captured_at.clone()))?;
        write_cell(
            sheet,
            row,
            col + 1,
            &Cell::Text(detail_url(detail_base, record.id)),
        )?;
    }

    workbook.save(path)?;
    info!("wrote {} row(s) to {}", rows.len(), path.display());
    Ok(ExportOutcome::Written { rows: rows.len() })
}

/// Header labels: known fields, extra field names, timestamp, link.
fn header_row(extras: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = DISPLAY_COLUMNS
        .iter()
        .map(|(key, _)| display_label(key).to_string())
        .collect();
    // Field names come from upstream JSON keys and may carry control chars.
    headers.extend(extras.iter().map(|name| sanitize(name)));
    headers.push(CAPTURED_AT_LABEL.to_string());
    headers.push(DETAIL_URL_LABEL.to_string());
    headers
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<(), ExportError> {
    match cell {
        Cell::Empty => {}
        Cell::Text(text) => {
            if text.chars().count() > MAX_CELL_CHARS {
                let cut: String = text.chars().take(MAX_CELL_CHARS).collect();
                sheet.write_string(row, col, &cut)?;
            } else {
                sheet.write_string(row, col, text)?;
            }
        }
        Cell::Number(n) => {
            sheet.write_number(row, col, *n)?;
        }
        Cell::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Read;
    use tempfile::TempDir;

    fn captured() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");

        let outcome = export_workbook(&[], &path, captured(), "http://x/view").unwrap();

        assert_eq!(outcome, ExportOutcome::NoData);
        assert!(!path.exists());
    }

    #[test]
    fn test_writes_workbook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut a = Declaration::with_id(2);
        a.decl_date = Some("2024-05-02".into());
        a.applicant_name = Some("ООО \u{0}Вектор".into());
        a.extra.insert("idStatus".into(), serde_json::json!(6));
        let mut b = Declaration::with_id(1);
        b.decl_date = Some("2024-05-01".into());
        b.applicant_phone = "+7 (495) 111-22-33".into();

        let outcome = export_workbook(&[a, b], &path, captured(), "http://x/view").unwrap();

        assert_eq!(outcome, ExportOutcome::Written { rows: 2 });

        let strings = shared_strings(&path);
        for expected in [
            "ID декларации",
            "Дата регистрации",
            "idStatus",
            "Дата выгрузки",
            "Ссылка на декларацию",
            "01.05.2024",
            "02.05.2024",
            "ООО Вектор",
            "+7 (495) 111-22-33",
            "2024-06-01 12:00:00",
            "http://x/view/1/common",
            "http://x/view/2/common",
        ] {
            assert!(strings.contains(expected), "missing {expected:?}");
        }
        assert!(!strings.contains("2024-05-01"));
        assert!(!strings.contains('\u{0}'));
        assert!(!strings.contains("&#0;"));
    }

    #[test]
    fn test_header_row_layout() {
        let headers = header_row(&["idStatus".to_string(), "bad\u{1}name".to_string()]);

        assert_eq!(headers.len(), DISPLAY_COLUMNS.len() + 4);
        assert_eq!(headers[0], "ID декларации");
        assert_eq!(headers[DISPLAY_COLUMNS.len()], "idStatus");
        assert_eq!(headers[DISPLAY_COLUMNS.len() + 1], "badname");
        assert_eq!(headers[headers.len() - 2], CAPTURED_AT_LABEL);
        assert_eq!(headers[headers.len() - 1], DETAIL_URL_LABEL);
    }

    #[test]
    fn test_control_chars_in_field_names_are_stripped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut record = Declaration::with_id(7);
        record
            .extra
            .insert("note\u{1}Text".into(), serde_json::json!("ok"));

        export_workbook(&[record], &path, captured(), "http://x/view").unwrap();

        let strings = shared_strings(&path);
        assert!(strings.contains("noteText"));
        assert!(!strings.contains('\u{1}'));
    }

    /// Text of the saved workbook's shared string table.
    fn shared_strings(path: &Path) -> String {
        let file = std::fs::File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut xml = String::new();
        archive
            .by_name("xl/sharedStrings.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }
}
