use crate::bounds::Bounds;
use crate::source::read_text;
use ordercheck_core::{AppError, AppResult};
use std::path::Path;

pub fn read_ordering(path: &Path, bounds: Bounds) -> AppResult<Vec<String>> {
    let content = read_text(path, bounds)?;
    parse_ordering(&path.display().to_string(), &content, bounds)
}

pub fn parse_ordering(source: &str, content: &str, bounds: Bounds) -> AppResult<Vec<String>> {
    let mut ordering = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let id = line.trim();
        if id.is_empty() {
            continue;
        }
        bounds.check_line(source, idx + 1, line)?;
        if id.contains('\t') {
            return Err(AppError::malformed(format!(
                "{source}:{}: expected one identifier per line: {:?}",
                idx + 1,
                line.trim_end()
            )));
        }
        ordering.push(id.to_string());
        bounds.check_records(source, ordering.len())?;
    }
    Ok(ordering)
}
