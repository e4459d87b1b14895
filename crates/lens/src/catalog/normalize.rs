//! Legal-entity suffix stripping applied before fuzzy name scoring.

/// Suffixes removed from a name, in either `"X, Suffix"` or `"X Suffix"` form.
pub const LEGAL_SUFFIXES: &[&str] = &[
    "Inc.",
    "Inc",
    "Corporation",
    "Corp.",
    "Corp",
    "Limited",
    "Ltd.",
    "Ltd",
    "LLC",
    "L.L.C.",
    "LP",
    "L.P.",
    "PLC",
    "P.L.C.",
    "Co.",
    "Company",
    "Group",
    "Holdings",
    "International",
    "Incorporated",
];

/// Removes the single longest matching legal suffix from a name.
#[derive(Debug, Clone)]
pub struct SuffixNormalizer {
    /// Comma and space forms of every suffix, longest first.
    forms: Vec<String>,
    case_insensitive: bool,
}

impl SuffixNormalizer {
    pub fn new(case_insensitive: bool) -> Self {
        let mut forms: Vec<String> = LEGAL_SUFFIXES
            .iter()
            .flat_map(|suffix| [format!(", {}", suffix), format!(" {}", suffix)])
            .collect();
        // Stable sort keeps list order among equal lengths.
        forms.sort_by(|a, b| b.len().cmp(&a.len()));

        Self {
            forms,
            case_insensitive,
        }
    }

    pub fn normalize(&self, name: &str) -> String {
        let trimmed = name.trim();

        for form in &self.forms {
            if let Some(stem) = self.strip(trimmed, form) {
                let stem = stem.trim();
                if stem.is_empty() {
                    break;
                }
                return stem.to_string();
            }
        }

        trimmed.to_string()
    }

    fn strip<'a>(&self, name: &'a str, form: &str) -> Option<&'a str> {
        if !self.case_insensitive {
            return name.strip_suffix(form);
        }

        let split = name.len().checked_sub(form.len())?;
        if !name.is_char_boundary(split) {
            return None;
        }
        let (stem, tail) = name.split_at(split);
        tail.eq_ignore_ascii_case(form).then_some(stem)
    }
}

impl Default for SuffixNormalizer {
    fn default() -> Self {
        Self::new(false)
    }
}
