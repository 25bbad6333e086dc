use crate::bounds::Bounds;
use crate::source::read_text;
use ordercheck_core::{AppError, AppResult};
use std::fmt;
use std::path::Path;

pub const SEED_INFECTOR: &str = "None";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Infector {
    Seed,
    Person(String),
}

impl Infector {
    pub fn person(&self) -> Option<&str> {
        match self {
            Infector::Seed => None,
            Infector::Person(id) => Some(id),
        }
    }
}

impl fmt::Display for Infector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Infector::Seed => f.write_str(SEED_INFECTOR),
            Infector::Person(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionEvent {
    pub infector: Infector,
    pub infected: String,
    pub time: f64,
}

impl TransmissionEvent {
    pub fn new(infector: Infector, infected: impl Into<String>, time: f64) -> Self {
        Self {
            infector,
            infected: infected.into(),
            time,
        }
    }
}

pub fn read_transmissions(path: &Path, bounds: Bounds) -> AppResult<Vec<TransmissionEvent>> {
    let content = read_text(path, bounds)?;
    parse_transmissions(&path.display().to_string(), &content, bounds)
}

pub fn parse_transmissions(
    source: &str,
    content: &str,
    bounds: Bounds,
) -> AppResult<Vec<TransmissionEvent>> {
    let mut events = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        bounds.check_line(source, idx + 1, line)?;
        events.push(parse_line(source, idx + 1, line)?);
        bounds.check_records(source, events.len())?;
    }
    Ok(events)
}

fn parse_line(source: &str, line_no: usize, line: &str) -> AppResult<TransmissionEvent> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(malformed(
            source,
            line_no,
            line,
            &format!("expected 3 tab-separated fields, found {}", fields.len()),
        ));
    }
    let (infector, infected, time) = (fields[0], fields[1], fields[2]);
    if infector.is_empty() || infected.is_empty() {
        return Err(malformed(source, line_no, line, "empty identifier"));
    }
    let time: f64 = time
        .parse()
        .map_err(|_| malformed(source, line_no, line, "time is not a number"))?;
    if !time.is_finite() {
        return Err(malformed(source, line_no, line, "time is not finite"));
    }

    let infector = if infector == SEED_INFECTOR {
        Infector::Seed
    } else {
        Infector::Person(infector.to_string())
    };
    Ok(TransmissionEvent::new(infector, infected, time))
}

fn malformed(source: &str, line_no: usize, line: &str, reason: &str) -> AppError {
    AppError::malformed(format!(
        "{source}:{line_no}: {reason}: {:?}",
        line.trim_end()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordercheck_core::ErrorKind;

    #[test]
    fn parses_seed_and_person_infectors() {
        let events =
            parse_transmissions("log", "None\tA\t0.5\nA\t B \t1.0\n", Bounds::default()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].infector, Infector::Seed);
        assert_eq!(events[1].infector, Infector::Person("A".to_string()));
        assert_eq!(events[1].infected, "B");
        assert_eq!(events[1].time, 1.0);
    }

    #[test]
    fn rejects_wrong_field_count_with_line() {
        let err = parse_transmissions("log.txt", "A\tB\t1.0\nA\tB\n", Bounds::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        assert!(err.message().contains("log.txt:2"));
        assert!(err.message().contains("A\\tB"));
    }

    #[test]
    fn rejects_non_numeric_time() {
        let err = parse_transmissions("log", "A\tB\tsoon\n", Bounds::default()).unwrap_err();
        assert!(err.message().contains("time is not a number"));
    }

    #[test]
    fn rejects_nan_time() {
        assert!(parse_transmissions("log", "A\tB\tNaN\n", Bounds::default()).is_err());
    }

    #[test]
    fn enforces_max_records() {
        let bounds = Bounds {
            max_records: 1,
            ..Bounds::default()
        };
        assert!(parse_transmissions("log", "A\tB\t1\nB\tC\t2\n", bounds).is_err());
    }

    #[test]
    fn enforces_max_line_bytes() {
        let bounds = Bounds {
            max_line_bytes: 12,
            ..Bounds::default()
        };
        let log = format!("A\tB\t1\n{}\tC\t2\n", "P".repeat(20));
        let err = parse_transmissions("log", &log, bounds).unwrap_err();
        assert!(err.message().contains("log:2: max_line_bytes"));
    }
}
