use ordercheck_core::{AppError, AppResult};
use ordercheck_io::TransmissionEvent;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    lower: f64,
    upper: f64,
}

impl TimeWindow {
    pub fn new(lower: f64, upper: f64) -> AppResult<Self> {
        if lower.is_nan() || upper.is_nan() {
            return Err(AppError::usage(format!(
                "invalid time window [{lower}, {upper}]"
            )));
        }
        if lower > upper {
            return Err(AppError::usage(format!(
                "time window lower bound {lower} exceeds upper bound {upper}"
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn starting_at(start: f64, length: f64) -> AppResult<Self> {
        if !start.is_finite() {
            return Err(AppError::usage(format!("invalid window start {start}")));
        }
        Self::new(start, start + length)
    }

    pub fn unbounded() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn contains(&self, time: f64) -> bool {
        self.lower <= time && time <= self.upper
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfectionCount {
    counts: BTreeMap<String, u64>,
}

impl InfectionCount {
    pub fn get(&self, individual: &str) -> Option<u64> {
        self.counts.get(individual).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        entries
    }
}

pub fn count_infections(events: &[TransmissionEvent], window: TimeWindow) -> InfectionCount {
    let mut counts = BTreeMap::new();
    for event in events {
        if !window.contains(event.time) {
            continue;
        }
        if let Some(infector) = event.infector.person() {
            *counts.entry(infector.to_string()).or_insert(0u64) += 1;
        }
    }
    InfectionCount { counts }
}
