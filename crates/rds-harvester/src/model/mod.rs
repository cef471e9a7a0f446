//! Core data types: declaration records and date partitions.

pub mod codes;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::enrichment::extract::ContactInfo;

/// One declaration as returned in the search API's `items` array.
///
/// The fields the harvester consumes are typed; everything else the
/// registry sends is kept verbatim in `extra` and exported as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,

    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub number: Option<String>,

    /// Registration date, raw as sent by the API.
    #[serde(
        rename = "declDate",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub decl_date: Option<String>,

    #[serde(
        rename = "applicantName",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub applicant_name: Option<String>,

    #[serde(
        rename = "applicantInn",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub applicant_inn: Option<String>,

    #[serde(
        rename = "manufacterName",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub manufacturer_name: Option<String>,

    #[serde(
        rename = "manufacterInn",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub manufacturer_inn: Option<String>,

    /// Filled by the contact enricher; empty when nothing was found.
    #[serde(
        rename = "applicantPhone",
        default,
        deserialize_with = "deserialize_contact"
    )]
    pub applicant_phone: String,

    #[serde(
        rename = "applicantEmail",
        default,
        deserialize_with = "deserialize_contact"
    )]
    pub applicant_email: String,

    /// Upstream fields without a typed slot.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Declaration {
    /// A bare record carrying only an identifier.
    pub fn with_id(id: u64) -> Self {
        Self {
            id,
            number: None,
            decl_date: None,
            applicant_name: None,
            applicant_inn: None,
            manufacturer_name: None,
            manufacturer_inn: None,
            applicant_phone: String::new(),
            applicant_email: String::new(),
            extra: Map::new(),
        }
    }

    /// Store enrichment results; missing values become empty strings.
    pub fn apply_contacts(&mut self, contacts: ContactInfo) {
        self.applicant_phone = contacts.phone.unwrap_or_default();
        self.applicant_email = contacts.email.unwrap_or_default();
    }

    /// All fields, typed and extra, keyed by their upstream names.
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// The registry sends numeric ids, but some exports quote them.
fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("id is not an unsigned integer: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| D::Error::custom(format!("id is not numeric: {s:?}"))),
        other => Err(D::Error::custom(format!("unexpected id value: {other}"))),
    }
}

/// Text fields occasionally arrive as numbers (INNs especially).
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Contact fields: `null` becomes empty, scalars become text.
fn deserialize_contact<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_text(deserializer).map(Option::unwrap_or_default)
}

/// An inclusive calendar-date window for one search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatePartition {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DatePartition {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Lower bound as sent in the `regDate` filter.
    pub fn min_date(&self) -> String {
        format!("{}T00:00:00.000Z", self.start.format("%Y-%m-%d"))
    }

    /// Upper bound as sent in the `regDate` filter.
    pub fn max_date(&self) -> String {
        format!("{}T23:59:59.999Z", self.end.format("%Y-%m-%d"))
    }
}

impl std::fmt::Display for DatePartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..={}", self.start, self.end)
        }
    }
}
