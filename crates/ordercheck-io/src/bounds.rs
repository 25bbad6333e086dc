use ordercheck_core::{AppError, AppResult};

#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub max_file_bytes: u64,
    pub max_decompressed_bytes: u64,
    pub max_line_bytes: usize,
    pub max_records: u64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            max_file_bytes: 1024 * 1024 * 1024,
            max_decompressed_bytes: 4 * 1024 * 1024 * 1024,
            max_line_bytes: 1024 * 1024,
            max_records: 50_000_000,
        }
    }
}

impl Bounds {
    pub(crate) fn check_line(&self, source: &str, line_no: usize, line: &str) -> AppResult<()> {
        if line.len() > self.max_line_bytes {
            return Err(AppError::malformed(format!(
                "{source}:{line_no}: max_line_bytes exceeded ({} > {})",
                line.len(),
                self.max_line_bytes
            )));
        }
        Ok(())
    }

    pub(crate) fn check_records(&self, source: &str, records: usize) -> AppResult<()> {
        if records as u64 > self.max_records {
            return Err(AppError::malformed(format!(
                "{source}: max_records exceeded"
            )));
        }
        Ok(())
    }
}
