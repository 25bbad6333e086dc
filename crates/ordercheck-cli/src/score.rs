use ordercheck_core::{AppError, AppResult};
use ordercheck_io::{read_efficacy, read_ordering, read_transmissions, Bounds};
use ordercheck_score::{
    count_infections, match_counts, score_efficacy, score_ordering, InfectionCount,
    OptimalDirection, TauResult, TimeWindow,
};
use std::io::Write;
use std::path::Path;
use tracing::info;

pub fn count_command(transmissions: &Path, from: Option<f64>, to: Option<f64>) -> AppResult<()> {
    let counts = load_counts(transmissions, from, to)?;
    let out: String = counts
        .ranked()
        .into_iter()
        .map(|(individual, count)| format!("{individual}\t{count}\n"))
        .collect();
    emit(&out)
}

pub fn match_command(
    transmissions: &Path,
    ordering: &Path,
    from: Option<f64>,
    to: Option<f64>,
) -> AppResult<()> {
    let counts = load_counts(transmissions, from, to)?;
    let candidate = read_ordering(ordering, Bounds::default())?;
    let matched = match_counts(&counts, &candidate);
    if !matched.missing.is_empty() {
        info!(missing = matched.missing.len(), "candidates without transmissions");
    }
    let out: String = matched
        .entries
        .iter()
        .map(|(individual, count)| format!("{individual}\t{count}\n"))
        .collect();
    emit(&out)
}

pub fn score_command(
    transmissions: &Path,
    ordering: &Path,
    from: Option<f64>,
    to: Option<f64>,
    ascending: bool,
) -> AppResult<()> {
    let counts = load_counts(transmissions, from, to)?;
    let candidate = read_ordering(ordering, Bounds::default())?;
    let direction = OptimalDirection::from_reverse(!ascending);
    let score = score_ordering(&counts, &candidate, direction)?;
    info!(
        matched = score.matched.entries.len(),
        missing = score.matched.missing.len(),
        method = ?score.tau.method,
        "scored ordering"
    );
    emit_tau(&score.tau)
}

pub fn score_efficacy_command(efficacy: &Path) -> AppResult<()> {
    let records = read_efficacy(efficacy, Bounds::default())?;
    let values: Vec<f64> = records.iter().map(|r| r.efficacy).collect();
    let tau = score_efficacy(&values)?;
    emit_tau(&tau)
}

fn load_counts(transmissions: &Path, from: Option<f64>, to: Option<f64>) -> AppResult<InfectionCount> {
    let window = TimeWindow::new(
        from.unwrap_or(f64::NEG_INFINITY),
        to.unwrap_or(f64::INFINITY),
    )?;
    let events = read_transmissions(transmissions, Bounds::default())?;
    Ok(count_infections(&events, window))
}

fn emit_tau(tau: &TauResult) -> AppResult<()> {
    emit(&format!("{}\t{}\n", tau.tau, tau.p_value))
}

fn emit(text: &str) -> AppResult<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| AppError::internal(format!("failed to write stdout: {e}")))
}
