use ordercheck_core::config::Config;
use ordercheck_core::{AppError, AppResult};
use ordercheck_eval::{
    generate_fixtures, run_suite, summarize, write_summary, BatchSuite, CommandEfficacy,
    EfficacyProvider, NativeEfficacy, PlotSpec, ResultTable,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn eval_generate(suite: &Path, overwrite: bool) -> AppResult<()> {
    let suite = BatchSuite::load(suite)?;
    generate_fixtures(&suite, overwrite)
}

pub fn eval_run(
    suite_path: &Path,
    out: Option<PathBuf>,
    native: bool,
    strict: bool,
    overwrite: bool,
    config: &Config,
) -> AppResult<()> {
    let suite = BatchSuite::load(suite_path)?;
    let out_dir = out.unwrap_or_else(|| suite.figures_dir.clone());
    if out_dir.exists() && !out_dir.is_dir() {
        return Err(AppError::usage("eval output path is not a directory"));
    }

    let command = if native {
        None
    } else {
        CommandEfficacy::from_config(&config.efficacy)?
    };
    let mut provider: Box<dyn EfficacyProvider> = match command {
        Some(command) => Box::new(command),
        None => Box::new(NativeEfficacy::default()),
    };

    let artifacts = run_suite(&suite, provider.as_mut(), &out_dir, overwrite)?;
    info!(
        table = %artifacts.table_path.display(),
        summary = %artifacts.summary_path.display(),
        rows = artifacts.rows,
        failures = artifacts.failures.len(),
        "eval run complete"
    );

    if let Some(first) = artifacts.failures.first() {
        if strict {
            return Err(AppError::new(
                first.kind,
                format!(
                    "{} replicate(s) failed; first: {} {} {}: {}",
                    artifacts.failures.len(),
                    first.experiment,
                    first.algorithm,
                    first.replicate,
                    first.message
                ),
            ));
        }
        warn!(
            failures = artifacts.failures.len(),
            "some replicates failed; see {}",
            artifacts.summary_path.display()
        );
    }
    Ok(())
}

pub fn summarize_command(
    table: &Path,
    out: &Path,
    suite: Option<PathBuf>,
    overwrite: bool,
) -> AppResult<()> {
    if out.exists() && !overwrite {
        return Err(AppError::usage(format!(
            "{} already exists; use --overwrite to replace",
            out.display()
        )));
    }
    if out.is_dir() {
        return Err(AppError::usage("summary output path is a directory"));
    }

    let palette = match suite {
        Some(path) => BatchSuite::load(&path)?.palette(),
        None => BTreeMap::new(),
    };
    let stem = table
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| AppError::usage("table path has no file name"))?;

    let table = ResultTable::read_tsv(table)?;
    let summary = summarize(&table, PlotSpec::new(format!("{stem}.png"), palette), Vec::new())?;
    write_summary(&summary, out)
}
