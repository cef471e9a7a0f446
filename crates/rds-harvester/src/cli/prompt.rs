//! Interactive date input.

use std::io::{BufRead, Write};

use anyhow::{bail, Result};
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ask for a date until a valid `YYYY-MM-DD` is entered.
///
/// End of input is an error since there is nothing left to reprompt.
pub fn prompt_date<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<NaiveDate> {
    let mut line = String::new();
    loop {
        write!(out, "{label} (YYYY-MM-DD): ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            bail!("input closed before a valid date was entered");
        }

        match NaiveDate::parse_from_str(line.trim(), DATE_FORMAT) {
            Ok(date) => return Ok(date),
            Err(_) => writeln!(out, "Неверный формат даты. Попробуйте снова.")?,
        }
    }
}

/// Use `given` or prompt on stdin/stderr.
pub fn date_or_prompt(given: Option<NaiveDate>, label: &str) -> Result<NaiveDate> {
    match given {
        Some(date) => Ok(date),
        None => prompt_date(&mut std::io::stdin().lock(), &mut std::io::stderr(), label),
    }
}
