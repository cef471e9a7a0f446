//! Static label → code tables for the search API's filter fields.

use crate::error::HarvestError;

/// A named, immutable mapping from human-readable labels to API codes.
#[derive(Debug, Clone, Copy)]
pub struct CodeTable {
    pub name: &'static str,
    pub entries: &'static [(&'static str, i64)],
}

/// Declaration status (`filter.status`).
pub const DECLARATION_STATUS: CodeTable = CodeTable {
    name: "declaration status",
    entries: &[
        ("Архивный", 1),
        ("Действует", 6),
        ("Прекращен", 14),
        ("Приостановлен", 15),
        ("Частично приостановлен", 16),
        ("Возобновлен", 19),
        ("Продлен", 20),
        ("Выдано предписание", 21),
    ],
};

/// Declaration type (`filter.idDeclType`).
pub const DECLARATION_TYPE: CodeTable = CodeTable {
    name: "declaration type",
    entries: &[
        ("Декларация о соответствии ТР ЕАЭС", 1),
        ("Декларация о соответствии ТР ТС", 2),
        ("Декларация о соответствии национальным требованиям", 3),
    ],
};

/// Applicant type (`filter.idApplicantType`).
pub const APPLICANT_TYPE: CodeTable = CodeTable {
    name: "applicant type",
    entries: &[
        ("Юридическое лицо", 1),
        ("Индивидуальный предприниматель", 2),
        ("Иностранное юридическое лицо", 3),
        ("Иностранное физическое лицо", 4),
    ],
};

impl CodeTable {
    /// Case-insensitive lookup of a single label.
    pub fn lookup(&self, label: &str) -> Option<i64> {
        let wanted = label.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(l, _)| l.to_lowercase() == wanted)
            .map(|(_, code)| *code)
    }

    /// Resolve every label, failing on the first unknown one.
    pub fn resolve<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<i64>, HarvestError> {
        labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                self.lookup(label).ok_or_else(|| HarvestError::UnknownCode {
                    table: self.name,
                    label: label.to_string(),
                })
            })
            .collect()
    }
}
