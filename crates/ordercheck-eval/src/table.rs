use ordercheck_core::{AppError, AppResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

pub const COLUMNS: [&str; 3] = ["Experiment", "Tau", "Algorithm"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub experiment: String,
    pub tau: f64,
    pub algorithm: String,
}

impl ScoreRecord {
    pub fn new(experiment: impl Into<String>, tau: f64, algorithm: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            tau,
            algorithm: algorithm.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    records: Vec<ScoreRecord>,
}

impl ResultTable {
    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_tsv_bytes(&self) -> AppResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(Vec::new());
        writer.write_record(COLUMNS).map_err(map_csv_error)?;
        for record in &self.records {
            writer
                .write_record([
                    record.experiment.as_str(),
                    record.tau.to_string().as_str(),
                    record.algorithm.as_str(),
                ])
                .map_err(map_csv_error)?;
        }
        writer
            .into_inner()
            .map_err(|e| AppError::internal(format!("result table flush failed: {e}")))
    }

    pub fn write_tsv(&self, path: &Path) -> AppResult<()> {
        let bytes = self.to_tsv_bytes()?;
        std::fs::write(path, bytes).map_err(|e| {
            AppError::internal(format!("failed to write {}: {e}", path.display()))
        })
    }

    pub fn read_tsv(path: &Path) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .map_err(|e| AppError::usage(format!("failed to open {}: {e}", path.display())))?;

        let headers = reader.headers().map_err(map_csv_error)?.clone();
        if headers.iter().collect::<Vec<_>>() != COLUMNS {
            return Err(AppError::malformed(format!(
                "{}: expected columns {:?}, found {:?}",
                path.display(),
                COLUMNS,
                headers.iter().collect::<Vec<_>>()
            )));
        }

        let mut builder = ResultTableBuilder::new();
        for (idx, row) in reader.records().enumerate() {
            let row = row.map_err(map_csv_error)?;
            let line = idx + 2;
            if row.len() != COLUMNS.len() {
                return Err(AppError::malformed(format!(
                    "{}:{line}: expected {} fields: {:?}",
                    path.display(),
                    COLUMNS.len(),
                    row
                )));
            }
            let tau: f64 = row[1].trim().parse().map_err(|_| {
                AppError::malformed(format!(
                    "{}:{line}: Tau is not a number: {:?}",
                    path.display(),
                    row
                ))
            })?;
            builder.add_record(ScoreRecord::new(&row[0], tau, &row[2]));
        }
        Ok(builder.finalize())
    }

    pub fn digest(&self) -> AppResult<String> {
        let bytes = self.to_tsv_bytes()?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

#[derive(Debug, Default)]
pub struct ResultTableBuilder {
    records: Vec<ScoreRecord>,
}

impl ResultTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&mut self, record: ScoreRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finalize(self) -> ResultTable {
        ResultTable {
            records: self.records,
        }
    }
}

fn map_csv_error(err: csv::Error) -> AppError {
    match err.kind() {
        csv::ErrorKind::Io(_) => AppError::internal(format!("result table io error: {err}")),
        _ => AppError::malformed(format!("result table error: {err}")),
    }
}
