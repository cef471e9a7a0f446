//! Output writers: the spreadsheet, the contacts listing and the link list.

pub mod columns;
pub mod contacts;
pub mod links;
pub mod xlsx;

pub use contacts::write_contacts_listing;
pub use xlsx::{export_workbook, ExportOutcome};
