//! Contact extraction from a rendered declaration detail page.
//!
//! Two strategies, in order:
//! 1. Structured: find the `fgis-*contact*` containers, walk their rows and
//!    match each row's label cell to the value cell beside it.
//! 2. Regex: only when the structured pass finds nothing, scan the whole
//!    markup and take the first phone-shaped and email-shaped match.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Applicant contact details; `None` means not found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.email.is_none()
    }

    fn is_complete(&self) -> bool {
        self.phone.is_some() && self.email.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactField {
    Phone,
    Email,
}

// ── Main entry point ─────────────────────────────────────────────────────────

/// Extract applicant phone and email from rendered HTML. Never fails.
pub fn extract_contacts(html: &str) -> ContactInfo {
    let structured = {
        let document = Html::parse_document(html);
        extract_structured(&document)
    };
    if !structured.is_empty() {
        return structured;
    }
    extract_with_regex(html)
}

// ── Structured pass ──────────────────────────────────────────────────────────

fn row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(".info-row, fgis-field, tr").expect("row selector is valid"))
}

/// Custom elements such as `<fgis-rds-view-applicant-contacts>`.
fn is_contact_container(el: &ElementRef<'_>) -> bool {
    let name = el.value().name();
    name.starts_with("fgis-") && name.contains("contact")
}

fn extract_structured(document: &Html) -> ContactInfo {
    let mut info = ContactInfo::default();

    let containers = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(is_contact_container);

    for container in containers {
        for row in container.select(row_selector()) {
            let cells: Vec<String> = row
                .children()
                .filter_map(ElementRef::wrap)
                .map(|cell| element_text(&cell))
                .filter(|text| !text.is_empty())
                .collect();

            let [label, value, ..] = cells.as_slice() else {
                continue;
            };

            match classify_label(label) {
                Some(ContactField::Phone) if info.phone.is_none() => {
                    info.phone = clean_value(value);
                }
                Some(ContactField::Email) if info.email.is_none() => {
                    info.email = clean_value(value);
                }
                _ => {}
            }

            if info.is_complete() {
                return info;
            }
        }
    }

    info
}

/// Map a row header to the field it labels.
fn classify_label(label: &str) -> Option<ContactField> {
    let label = label.trim().trim_end_matches(':').to_lowercase();
    if label.contains("телефон") || label.contains("phone") {
        Some(ContactField::Phone)
    } else if label.contains("электронн") || label.contains("e-mail") || label.contains("email")
    {
        Some(ContactField::Email)
    } else {
        None
    }
}

/// Placeholder values like "-" or "—" count as missing.
fn clean_value(value: &str) -> Option<String> {
    let value = value.trim();
    if value.chars().any(char::is_alphanumeric) {
        Some(value.to_string())
    } else {
        None
    }
}

/// Whitespace-collapsed text content of an element.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Regex fallback ───────────────────────────────────────────────────────────

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:^|[^\d+])((?:\+7|8)[\s\-]?\(?\d{3}\)?[\s\-]?\d{3}[\s\-]?\d{2}[\s\-]?\d{2})(?:$|\D)",
        )
        .expect("phone regex is valid")
    })
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("email regex is valid")
    })
}

const IMAGE_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

fn extract_with_regex(html: &str) -> ContactInfo {
    let phone = phone_regex()
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string());

    let email = email_regex()
        .find_iter(html)
        .map(|m| m.as_str())
        .find(|candidate| {
            let lower = candidate.to_lowercase();
            !IMAGE_SUFFIXES.iter().any(|ext| lower.ends_with(ext))
        })
        .map(str::to_string);

    ContactInfo { phone, email }
}
