use crate::efficacy::{EfficacyProvider, EfficacyRequest};
use crate::suite::{AlgorithmConfig, BatchSuite};
use crate::summary::{summarize, write_summary, PlotSpec};
use crate::table::{ResultTable, ResultTableBuilder, ScoreRecord};
use ordercheck_core::{AppError, AppResult, ErrorKind};
use ordercheck_score::{score_efficacy, TauResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct ReplicateFailure {
    pub experiment: String,
    pub algorithm: String,
    pub replicate: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub table: ResultTable,
    pub failures: Vec<ReplicateFailure>,
}

#[derive(Debug, Clone)]
pub struct BatchArtifacts {
    pub table_path: PathBuf,
    pub summary_path: PathBuf,
    pub rows: usize,
    pub failures: Vec<ReplicateFailure>,
}

/// Scores every experiment x algorithm x replicate in order. A failing
/// replicate is recorded and the batch moves on.
pub fn run_batch(suite: &BatchSuite, provider: &mut dyn EfficacyProvider) -> BatchOutcome {
    let replicates = suite.replicates.labels();
    let mut builder = ResultTableBuilder::new();
    let mut failures = Vec::new();

    info!(
        suite = %suite.name,
        experiments = suite.experiments.len(),
        algorithms = suite.algorithms.len(),
        replicates = replicates.len(),
        provider = provider.name(),
        "starting batch"
    );

    for experiment in &suite.experiments {
        for algorithm in &suite.algorithms {
            for replicate in &replicates {
                match score_replicate(suite, provider, experiment, algorithm, replicate) {
                    Ok(tau) => {
                        debug!(
                            experiment = %experiment,
                            algorithm = %algorithm.tag,
                            replicate = %replicate,
                            tau = tau.tau,
                            p_value = tau.p_value,
                            "scored replicate"
                        );
                        builder.add_record(ScoreRecord::new(
                            experiment.clone(),
                            tau.tau,
                            algorithm.tag.clone(),
                        ));
                    }
                    Err(err) => {
                        warn!(
                            experiment = %experiment,
                            algorithm = %algorithm.tag,
                            replicate = %replicate,
                            kind = %err.kind(),
                            "replicate failed: {}",
                            err.message()
                        );
                        failures.push(ReplicateFailure {
                            experiment: experiment.clone(),
                            algorithm: algorithm.tag.clone(),
                            replicate: replicate.clone(),
                            kind: err.kind(),
                            message: err.message().to_string(),
                        });
                    }
                }
            }
        }
    }

    let table = builder.finalize();
    info!(
        rows = table.len(),
        failures = failures.len(),
        "batch finished"
    );
    BatchOutcome { table, failures }
}

fn score_replicate(
    suite: &BatchSuite,
    provider: &mut dyn EfficacyProvider,
    experiment: &str,
    algorithm: &AlgorithmConfig,
    replicate: &str,
) -> AppResult<TauResult> {
    let transmissions = suite.transmission_path(experiment, replicate);
    let ordering = suite.ordering_path(experiment, replicate, algorithm);
    for path in [&transmissions, &ordering] {
        if !path.is_file() {
            return Err(AppError::usage(format!(
                "missing input file {}",
                path.display()
            )));
        }
    }

    let records = provider.compute(&EfficacyRequest {
        ordering: &ordering,
        transmissions: &transmissions,
        metric_choice: suite.metric_choice,
        start_time: suite.start_time,
    })?;
    let values: Vec<f64> = records.iter().map(|r| r.efficacy).collect();
    score_efficacy(&values).map_err(|e| e.context(ordering.display()))
}

pub fn run_suite(
    suite: &BatchSuite,
    provider: &mut dyn EfficacyProvider,
    out_dir: &Path,
    overwrite: bool,
) -> AppResult<BatchArtifacts> {
    let stem = suite.output_stem();
    let table_path = out_dir.join(format!("{stem}.tsv"));
    let summary_path = out_dir.join(format!("{stem}.summary.json"));
    for path in [&table_path, &summary_path] {
        if path.exists() && !overwrite {
            return Err(AppError::usage(format!(
                "{} already exists; use --overwrite to replace",
                path.display()
            )));
        }
        if path.is_dir() {
            return Err(AppError::usage(format!(
                "{} is a directory",
                path.display()
            )));
        }
    }
    std::fs::create_dir_all(out_dir).map_err(|e| {
        AppError::internal(format!(
            "failed to create output dir {}: {e}",
            out_dir.display()
        ))
    })?;

    let outcome = run_batch(suite, provider);
    outcome.table.write_tsv(&table_path)?;

    let plot = PlotSpec::new(format!("{stem}.png"), suite.palette());
    let failures = outcome.failures.clone();
    let summary = summarize(&outcome.table, plot, outcome.failures)?;
    write_summary(&summary, &summary_path)?;
    info!(
        table = %table_path.display(),
        sha256 = %summary.table_sha256,
        "wrote result table"
    );

    Ok(BatchArtifacts {
        table_path,
        summary_path,
        rows: summary.rows,
        failures,
    })
}
