use crate::counter::InfectionCount;
use crate::tau::{kendall_tau_b, TauResult};
use ordercheck_core::AppResult;
use serde::Serialize;
use tracing::{debug, warn};

/// The two ground-truth definitions a candidate ordering can be scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    CountCorrelation,
    EfficacyCorrelation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimalDirection {
    Ascending,
    Descending,
}

impl OptimalDirection {
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            OptimalDirection::Descending
        } else {
            OptimalDirection::Ascending
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchedCounts {
    pub entries: Vec<(String, u64)>,
    pub missing: Vec<String>,
}

impl MatchedCounts {
    pub fn values(&self) -> Vec<u64> {
        self.entries.iter().map(|(_, count)| *count).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderingScore {
    pub mode: ScoringMode,
    pub direction: OptimalDirection,
    pub tau: TauResult,
    pub matched: MatchedCounts,
}

pub fn match_counts(counts: &InfectionCount, candidate: &[String]) -> MatchedCounts {
    let mut matched = MatchedCounts::default();
    for individual in candidate {
        match counts.get(individual) {
            Some(count) => matched.entries.push((individual.clone(), count)),
            None => {
                warn!(
                    individual = %individual,
                    "individual is not in the transmission histories; skipping"
                );
                matched.missing.push(individual.clone());
            }
        }
    }
    matched
}

pub fn score_ordering(
    counts: &InfectionCount,
    candidate: &[String],
    direction: OptimalDirection,
) -> AppResult<OrderingScore> {
    let matched = match_counts(counts, candidate);
    let user_order: Vec<f64> = matched.values().into_iter().map(|c| c as f64).collect();
    let mut optimal_order = user_order.clone();
    match direction {
        OptimalDirection::Ascending => optimal_order.sort_by(|a, b| a.total_cmp(b)),
        OptimalDirection::Descending => optimal_order.sort_by(|a, b| b.total_cmp(a)),
    }
    debug!(
        scored = user_order.len(),
        missing = matched.missing.len(),
        ?direction,
        "scoring candidate ordering against sorted counts"
    );

    let tau = kendall_tau_b(&optimal_order, &user_order)?;
    Ok(OrderingScore {
        mode: ScoringMode::CountCorrelation,
        direction,
        tau,
        matched,
    })
}

pub fn score_efficacy(values: &[f64]) -> AppResult<TauResult> {
    let n = values.len();
    let optimal_order: Vec<f64> = (1..=n).rev().map(|rank| rank as f64).collect();
    kendall_tau_b(&optimal_order, values)
}
