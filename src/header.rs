use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::AttributeSet;

static ATTRIBUTE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_.\-]*):([A-Za-z_][A-Za-z0-9_]*)\s*=")
        .expect("attribute line pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedHeader {
    pub attributes: AttributeSet,
    pub unallocated: BTreeSet<String>,
}

impl ParsedHeader {
    pub fn is_complete(&self) -> bool {
        self.unallocated.is_empty()
    }
}

enum LineKind<'a> {
    Global(&'a str),
    Variable,
    Text,
}

pub fn parse_header(header: &str, keys: &[&str]) -> ParsedHeader {
    let mut pending: Vec<&str> = keys.to_vec();
    pending.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    pending.dedup();

    let mut attributes = AttributeSet::new();
    for line in header.lines() {
        if pending.is_empty() {
            break;
        }
        let Some(value) = quoted_value(line) else {
            continue;
        };
        let matched = match classify_line(line) {
            LineKind::Global(name) => pending.iter().position(|key| *key == name),
            LineKind::Variable => None,
            LineKind::Text => pending.iter().position(|key| contains_key(line, key)),
        };
        if let Some(index) = matched {
            let key = pending.remove(index);
            attributes.insert(key, value);
        }
    }

    ParsedHeader {
        attributes,
        unallocated: pending.into_iter().map(str::to_string).collect(),
    }
}

fn classify_line(line: &str) -> LineKind<'_> {
    match ATTRIBUTE_LINE.captures(line) {
        Some(caps) => {
            let scope = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            match caps.get(2) {
                Some(name) if scope.is_empty() => LineKind::Global(name.as_str()),
                _ => LineKind::Variable,
            }
        }
        None => LineKind::Text,
    }
}

fn quoted_value(line: &str) -> Option<&str> {
    let mut parts = line.splitn(3, '"');
    parts.next()?;
    let value = parts.next()?;
    parts.next()?;
    (!value.is_empty()).then_some(value)
}

fn contains_key(line: &str, key: &str) -> bool {
    line.match_indices(key).any(|(start, _)| {
        let before = line[..start].chars().next_back();
        let after = line[start + key.len()..].chars().next();
        !before.map(is_ident_char).unwrap_or(false) && !after.map(is_ident_char).unwrap_or(false)
    })
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HEADER_KEYS;

    #[test]
    fn exact_global_names_only() {
        let header = "\t\t:driving_model_id = \"NCAR-CCSM4\" ;\n";
        let parsed = parse_header(header, &["model_id", "driving_model_id"]);
        assert_eq!(parsed.attributes.get("driving_model_id"), Some("NCAR-CCSM4"));
        assert!(parsed.unallocated.contains("model_id"));
    }

    #[test]
    fn variable_attributes_are_ignored() {
        let header = "\t\ttas:frequency = \"mon\" ;\n\t\t:frequency = \"day\" ;\n";
        let parsed = parse_header(header, &["frequency"]);
        assert_eq!(parsed.attributes.get("frequency"), Some("day"));
    }

    #[test]
    fn first_occurrence_wins() {
        let header = ":domain = \"GLB-50i\" ;\n:domain = \"AUS-44\" ;\n";
        let parsed = parse_header(header, &["domain"]);
        assert_eq!(parsed.attributes.get("domain"), Some("GLB-50i"));
    }

    #[test]
    fn text_lines_respect_boundaries_and_precedence() {
        let header = "driving_model_id: \"MPI-M-MPI-ESM-LR\"\nmodel_identifier \"nope\"\n";
        let parsed = parse_header(header, &["model_id", "driving_model_id"]);
        assert_eq!(
            parsed.attributes.get("driving_model_id"),
            Some("MPI-M-MPI-ESM-LR")
        );
        assert_eq!(parsed.attributes.get("model_id"), None);
    }

    #[test]
    fn unquoted_and_empty_values_allocate_nothing() {
        let header = ":product = output ;\n:project_id = \"\" ;\n";
        let parsed = parse_header(header, &["product", "project_id"]);
        assert!(parsed.attributes.is_empty());
        assert_eq!(parsed.unallocated.len(), 2);
    }

    #[test]
    fn reports_only_the_missing_key() {
        let header = "\
// global attributes:
\t\t:project_id = \"CORDEX\" ;
\t\t:product = \"output\" ;
\t\t:domain = \"GLB-50i\" ;
\t\t:institute_id = \"CSIRO\" ;
\t\t:model_id = \"CSIRO-CCAM\" ;
\t\t:rcm_version_id = \"v1\" ;
\t\t:driving_experiment_name = \"historical\" ;
\t\t:driving_model_ensemble_member = \"r1i1p1\" ;
\t\t:frequency = \"day\" ;
";
        let parsed = parse_header(header, &HEADER_KEYS);
        let missing: Vec<&str> = parsed.unallocated.iter().map(String::as_str).collect();
        assert_eq!(missing, vec!["driving_model_id"]);
        assert_eq!(parsed.attributes.get("model_id"), Some("CSIRO-CCAM"));
    }

    #[test]
    fn empty_header_leaves_every_key() {
        let parsed = parse_header("", &HEADER_KEYS);
        assert_eq!(parsed.unallocated.len(), HEADER_KEYS.len());
        assert!(!parsed.is_complete());
    }
}
