use serde::{Deserialize, Serialize};

use crate::solar::fields::{required_fields, FieldGroup, FieldMap};

/// Read newline-delimited `key=value` pairs from a message body.
///
/// Blank lines, `#` comments and lines without `=` are skipped. Only the
/// first `=` splits, so values may contain `=`. A repeated key keeps its last
/// value. Keys the model does not know (e.g. `sheet_title`) are kept.
pub fn parse_structured_message(body: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    for line in body.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        fields.insert(key.to_string(), value.trim().to_string());
    }
    fields
}

/// Required fields absent from a message, by input object. Each list is
/// sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingFields {
    pub assumptions: Vec<String>,
    pub capital_stack: Vec<String>,
    pub debt_terms: Vec<String>,
}

impl MissingFields {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.assumptions.len() + self.capital_stack.len() + self.debt_terms.len()
    }

    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.assumptions
            .iter()
            .chain(&self.capital_stack)
            .chain(&self.debt_terms)
            .map(String::as_str)
    }
}

/// A field counts as missing when it is absent or blank.
pub fn find_missing_fields(fields: &FieldMap) -> MissingFields {
    let mut missing = MissingFields::default();
    for (group, name) in required_fields() {
        let present = fields.get(name).is_some_and(|v| !v.trim().is_empty());
        if present {
            continue;
        }
        let bucket = match group {
            FieldGroup::Assumptions => &mut missing.assumptions,
            FieldGroup::CapitalStack => &mut missing.capital_stack,
            FieldGroup::DebtTerms => &mut missing.debt_terms,
        };
        bucket.push(name.to_string());
    }
    missing.assumptions.sort();
    missing.capital_stack.sort();
    missing.debt_terms.sort();
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_skips_comments_blanks_and_bare_lines() {
        let body = "# header\n\nproject_name = Falcon Solar\nhello there\n  debt_pct=0.55  \n";
        let fields = parse_structured_message(body);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["project_name"], "Falcon Solar");
        assert_eq!(fields["debt_pct"], "0.55");
    }

    #[test]
    fn test_splits_on_first_equals() {
        let fields = parse_structured_message("sheet_title=IRR = fun\n");
        assert_eq!(fields["sheet_title"], "IRR = fun");
    }

    #[test]
    fn test_empty_key_ignored_and_last_duplicate_wins() {
        let fields = parse_structured_message("=5\ndebt_rate=0.05\ndebt_rate=0.06");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["debt_rate"], "0.06");
    }

    #[test]
    fn test_crlf_bodies() {
        let fields = parse_structured_message("analysis_years=20\r\ndiscount_rate=0.08\r\n");
        assert_eq!(fields["analysis_years"], "20");
        assert_eq!(fields["discount_rate"], "0.08");
    }

    #[test]
    fn test_missing_grouped_and_sorted() {
        let fields = parse_structured_message("project_name=X\ndebt_pct=0.5\ndebt_rate=\n");
        let missing = find_missing_fields(&fields);
        assert_eq!(missing.assumptions.len(), 10);
        assert!(missing.assumptions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(missing.capital_stack, vec!["sponsor_equity_pct", "tax_equity_pct"]);
        assert_eq!(missing.debt_terms, vec!["debt_rate", "debt_tenor_years"]);
        assert_eq!(missing.len(), 14);
    }

    #[test]
    fn test_nothing_missing() {
        let mut fields = FieldMap::new();
        for (_, name) in required_fields() {
            fields.insert(name.to_string(), "1".into());
        }
        assert!(find_missing_fields(&fields).is_empty());
    }
}
