//! Column layout and cell normalisation for the exported sheet.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::model::Declaration;

/// Upstream field → display label, in sheet order.
pub const DISPLAY_COLUMNS: &[(&str, &str)] = &[
    ("id", "ID декларации"),
    ("number", "Номер декларации"),
    ("declDate", "Дата регистрации"),
    ("applicantName", "Заявитель"),
    ("applicantInn", "ИНН заявителя"),
    ("manufacterName", "Изготовитель"),
    ("manufacterInn", "ИНН изготовителя"),
    ("applicantPhone", "Телефон заявителя"),
    ("applicantEmail", "Email заявителя"),
];

pub const CAPTURED_AT_LABEL: &str = "Дата выгрузки";
pub const DETAIL_URL_LABEL: &str = "Ссылка на декларацию";

/// Registration dates are rendered in this format.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";

/// Display label for an upstream field; unmapped fields keep their name.
pub fn display_label(field: &str) -> &str {
    DISPLAY_COLUMNS
        .iter()
        .find(|(key, _)| *key == field)
        .map(|(_, label)| *label)
        .unwrap_or(field)
}

/// Extra field names present on any record, sorted.
pub fn extra_columns(records: &[Declaration]) -> Vec<String> {
    let set: BTreeSet<&String> = records.iter().flat_map(|r| r.extra.keys()).collect();
    set.into_iter().cloned().collect()
}

/// True for the control characters spreadsheets reject.
fn is_illegal_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}'..='\u{0C}' | '\u{0E}'..='\u{1F}')
}

/// Strip control characters except tab, line feed and carriage return.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !is_illegal_control(*c)).collect()
}

/// Parse a registration date as the API sends it.
pub fn parse_reg_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    NaiveDate::parse_from_str(raw, DISPLAY_DATE_FORMAT).ok()
}

/// Stable ascending sort by registration date. Records whose date is
/// missing or unparseable go last, in their original order.
pub fn sort_by_reg_date(records: &mut [Declaration]) {
    records.sort_by_cached_key(|r| {
        let date = r.decl_date.as_deref().and_then(parse_reg_date);
        // `None` sorts after every date.
        (date.is_none(), date)
    });
}

/// A cell ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Convert a JSON field value; nested values become compact JSON text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n
                .as_f64()
                .map(Cell::Number)
                .unwrap_or_else(|| Cell::Text(n.to_string())),
            Value::String(s) => Cell::Text(sanitize(s)),
            other => Cell::Text(sanitize(&other.to_string())),
        }
    }

    /// The registration date re-rendered for display, raw text otherwise.
    pub fn reg_date(raw: Option<&str>) -> Self {
        match raw {
            None => Cell::Empty,
            Some(raw) => match parse_reg_date(raw) {
                Some(date) => Cell::Text(date.format(DISPLAY_DATE_FORMAT).to_string()),
                None => Cell::Text(sanitize(raw)),
            },
        }
    }
}
