use crate::bounds::Bounds;
use crate::source::read_text;
use ordercheck_core::{AppError, AppResult};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct EfficacyRecord {
    pub individual: String,
    pub efficacy: f64,
}

impl EfficacyRecord {
    pub fn new(individual: impl Into<String>, efficacy: f64) -> Self {
        Self {
            individual: individual.into(),
            efficacy,
        }
    }
}

pub fn read_efficacy(path: &Path, bounds: Bounds) -> AppResult<Vec<EfficacyRecord>> {
    let content = read_text(path, bounds)?;
    parse_efficacy(&path.display().to_string(), &content, bounds)
}

pub fn parse_efficacy(
    source: &str,
    content: &str,
    bounds: Bounds,
) -> AppResult<Vec<EfficacyRecord>> {
    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        bounds.check_line(source, idx + 1, line)?;
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() != 2 {
            return Err(malformed(
                source,
                idx + 1,
                line,
                &format!(
                    "expected 2 tab-separated fields (PERSON<TAB>EFFICACY), found {} {:?}",
                    fields.len(),
                    fields
                ),
            ));
        }
        if fields[0].is_empty() {
            return Err(malformed(source, idx + 1, line, "empty individual"));
        }
        let efficacy: f64 = fields[1]
            .parse()
            .map_err(|_| malformed(source, idx + 1, line, "efficacy is not a number"))?;
        if !efficacy.is_finite() {
            return Err(malformed(source, idx + 1, line, "efficacy is not finite"));
        }
        records.push(EfficacyRecord::new(fields[0], efficacy));
        bounds.check_records(source, records.len())?;
    }
    Ok(records)
}

fn malformed(source: &str, line_no: usize, line: &str, reason: &str) -> AppError {
    AppError::malformed(format!(
        "{source}:{line_no}: {reason}: line {:?}",
        line.trim_end()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordercheck_core::ErrorKind;

    #[test]
    fn parses_two_column_lines() {
        let records = parse_efficacy("eff", "A\t5.0\nB\t 3\n\n", Bounds::default()).unwrap();
        assert_eq!(
            records,
            vec![EfficacyRecord::new("A", 5.0), EfficacyRecord::new("B", 3.0)]
        );
    }

    #[test]
    fn three_fields_name_the_offending_line() {
        let err = parse_efficacy(
            "scratch.tsv",
            "A\t5.0\nB\t3.0\textra\n",
            Bounds::default(),
        ).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        assert!(err.message().contains("scratch.tsv:2"));
        assert!(err.message().contains("\"B\\t3.0\\textra\""));
    }

    #[test]
    fn non_numeric_efficacy_is_rejected() {
        let err = parse_efficacy("eff", "A\thigh\n", Bounds::default()).unwrap_err();
        assert!(err.message().contains("not a number"));
    }

    #[test]
    fn record_limit_applies_to_efficacy_output() {
        let bounds = Bounds {
            max_records: 2,
            ..Bounds::default()
        };
        let content = "A\t3\nB\t2\nC\t1\n";
        let err = parse_efficacy("scratch.tsv", content, bounds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        assert!(err.message().contains("max_records"));

        let ok = Bounds {
            max_records: 3,
            ..Bounds::default()
        };
        assert_eq!(parse_efficacy("scratch.tsv", content, ok).unwrap().len(), 3);
    }

    #[test]
    fn overlong_efficacy_line_is_rejected() {
        let bounds = Bounds {
            max_line_bytes: 8,
            ..Bounds::default()
        };
        let content = format!("A\t1\n{}\t2\n", "x".repeat(16));
        let err = parse_efficacy("scratch.tsv", &content, bounds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        assert!(err.message().contains("scratch.tsv:2: max_line_bytes"));
    }
}
