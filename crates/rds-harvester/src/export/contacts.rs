//! Plain-text listing of extracted contacts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ExportError;
use crate::model::Declaration;

/// One listing line for a record.
pub fn contact_line(record: &Declaration) -> String {
    format!(
        "ID {}: телефон = {}, email = {}",
        record.id, record.applicant_phone, record.applicant_email
    )
}

/// Write one line per record. Always creates the file, even when empty.
pub fn write_contacts_listing(records: &[Declaration], path: &Path) -> Result<usize, ExportError> {
    let mut out = BufWriter::new(File::create(path)?);
    for record in records {
        writeln!(out, "{}", contact_line(record))?;
    }
    out.flush()?;
    Ok(records.len())
}
