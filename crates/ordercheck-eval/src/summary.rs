use crate::runner::ReplicateFailure;
use crate::table::ResultTable;
use ordercheck_core::{AppError, AppResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub plot: PlotSpec,
    pub table_sha256: String,
    pub rows: usize,
    pub groups: Vec<GroupSummary>,
    pub failures: Vec<ReplicateFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlotSpec {
    pub figure: String,
    pub x: String,
    pub y: String,
    pub hue: String,
    pub experiments: Vec<String>,
    pub palette: BTreeMap<String, String>,
}

impl PlotSpec {
    pub fn new(figure: impl Into<String>, palette: BTreeMap<String, String>) -> Self {
        Self {
            figure: figure.into(),
            x: "Experiment".to_string(),
            y: "Tau".to_string(),
            hue: "Algorithm".to_string(),
            experiments: Vec::new(),
            palette,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub experiment: String,
    pub algorithm: String,
    pub n: usize,
    pub mean: f64,
    pub std_dev: Option<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

pub fn summarize(
    table: &ResultTable,
    mut plot: PlotSpec,
    failures: Vec<ReplicateFailure>,
) -> AppResult<Summary> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    for record in table.records() {
        let key = (record.experiment.clone(), record.algorithm.clone());
        let values = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        values.push(record.tau);
    }

    plot.experiments.clear();
    for (experiment, _) in &order {
        if !plot.experiments.contains(experiment) {
            plot.experiments.push(experiment.clone());
        }
    }

    let mut summaries = Vec::with_capacity(order.len());
    for key in order {
        let mut values = groups.remove(&key).unwrap_or_default();
        values.sort_by(|a, b| a.total_cmp(b));
        summaries.push(describe(key.0, key.1, &values));
    }

    Ok(Summary {
        plot,
        table_sha256: table.digest()?,
        rows: table.len(),
        groups: summaries,
        failures,
    })
}

pub fn write_summary(summary: &Summary, path: &Path) -> AppResult<()> {
    let mut bytes = serde_json::to_vec_pretty(summary)
        .map_err(|e| AppError::internal(format!("summary json encode error: {e}")))?;
    bytes.push(b'\n');
    std::fs::write(path, bytes)
        .map_err(|e| AppError::internal(format!("failed to write {}: {e}", path.display())))
}

fn describe(experiment: String, algorithm: String, sorted: &[f64]) -> GroupSummary {
    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std_dev = if n > 1 {
        let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        Some(var.sqrt())
    } else {
        None
    };
    GroupSummary {
        experiment,
        algorithm,
        n,
        mean,
        std_dev,
        min: sorted[0],
        q1: quantile(sorted, 0.25),
        median: quantile(sorted, 0.5),
        q3: quantile(sorted, 0.75),
        max: sorted[n - 1],
    }
}

/// Linear interpolation between closest ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ResultTableBuilder, ScoreRecord};

    fn plot() -> PlotSpec {
        let mut palette = BTreeMap::new();
        palette.insert("proact".to_string(), "#161f54".to_string());
        PlotSpec::new("m3.2_tau.png", palette)
    }

    #[test]
    fn groups_keep_first_appearance_order() {
        let mut builder = ResultTableBuilder::new();
        for (experiment, tau, algorithm) in [
            ("STOPRATE-2x", 0.2, "proact"),
            ("ARTRATE-4", 0.4, "proact"),
            ("STOPRATE-2x", 0.6, "proact"),
            ("STOPRATE-2x", 0.1, "hivtrace"),
        ] {
            builder.add_record(ScoreRecord::new(experiment, tau, algorithm));
        }
        let summary = summarize(&builder.finalize(), plot(), Vec::new()).unwrap();

        assert_eq!(summary.rows, 4);
        assert_eq!(summary.plot.experiments, vec!["STOPRATE-2x", "ARTRATE-4"]);
        let keys: Vec<(&str, &str)> = summary
            .groups
            .iter()
            .map(|g| (g.experiment.as_str(), g.algorithm.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("STOPRATE-2x", "proact"),
                ("ARTRATE-4", "proact"),
                ("STOPRATE-2x", "hivtrace")
            ]
        );
        assert_eq!(summary.groups[0].n, 2);
        assert!((summary.groups[0].mean - 0.4).abs() < 1e-12);
        assert!(summary.groups[1].std_dev.is_none());
    }

    #[test]
    fn quantiles_interpolate() {
        let sorted = [0.0, 1.0, 2.0, 3.0];
        assert!((quantile(&sorted, 0.5) - 1.5).abs() < 1e-12);
        assert!((quantile(&sorted, 0.25) - 0.75).abs() < 1e-12);
        assert_eq!(quantile(&sorted, 1.0), 3.0);
    }

    #[test]
    fn empty_table_summarizes_to_no_groups() {
        let summary = summarize(&ResultTable::default(), plot(), Vec::new()).unwrap();
        assert!(summary.groups.is_empty());
        assert!(summary.plot.experiments.is_empty());
        assert_eq!(summary.table_sha256.len(), 64);
    }
}
