pub mod counter;
pub mod scorer;
pub mod tau;

pub use counter::{count_infections, InfectionCount, TimeWindow};
pub use scorer::{
    match_counts, score_efficacy, score_ordering, MatchedCounts, OptimalDirection,
    OrderingScore, ScoringMode,
};
pub use tau::{kendall_tau_b, PValueMethod, TauResult};
