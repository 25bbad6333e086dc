use ordercheck_core::config::EfficacyToolConfig;
use ordercheck_core::{AppError, AppResult};
use ordercheck_io::{
    parse_efficacy, read_ordering, read_text, read_transmissions, Bounds, EfficacyRecord,
};
use ordercheck_score::{count_infections, TimeWindow};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;
use tracing::{debug, warn};

const DEFAULT_ARGS: [&str; 8] = [
    "-m",
    "{metric}",
    "-i",
    "{input}",
    "-t",
    "{transmissions}",
    "-s",
    "{start}",
];
const SCRATCH_FILE: &str = "intermediate_efficacy.tsv";
const STDERR_EXCERPT_BYTES: usize = 2048;

#[derive(Debug, Clone, Copy)]
pub struct EfficacyRequest<'a> {
    pub ordering: &'a Path,
    pub transmissions: &'a Path,
    pub metric_choice: f64,
    pub start_time: f64,
}

pub trait EfficacyProvider {
    fn name(&self) -> &str;

    fn compute(&mut self, request: &EfficacyRequest<'_>) -> AppResult<Vec<EfficacyRecord>>;
}

/// Runs an external efficacy program. Its stdout lands in a scratch file owned
/// by this instance, rewritten on every call.
pub struct CommandEfficacy {
    program: String,
    args: Vec<String>,
    scratch_dir: TempDir,
    bounds: Bounds,
}

impl CommandEfficacy {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        scratch_parent: Option<&Path>,
    ) -> AppResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ordercheck-efficacy-");
        let scratch_dir = match scratch_parent {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::internal(format!(
                        "failed to create scratch dir {}: {e}",
                        parent.display()
                    ))
                })?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| AppError::internal(format!("failed to create scratch dir: {e}")))?;

        let args = if args.is_empty() {
            DEFAULT_ARGS.iter().map(|a| a.to_string()).collect()
        } else {
            args
        };
        Ok(Self {
            program: program.into(),
            args,
            scratch_dir,
            bounds: Bounds::default(),
        })
    }

    pub fn from_config(config: &EfficacyToolConfig) -> AppResult<Option<Self>> {
        match &config.program {
            Some(program) => Ok(Some(Self::new(
                program.clone(),
                config.args.clone(),
                config.scratch_dir.as_deref(),
            )?)),
            None => Ok(None),
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn scratch_path(&self) -> PathBuf {
        self.scratch_dir.path().join(SCRATCH_FILE)
    }

    fn render_args(&self, request: &EfficacyRequest<'_>) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{metric}", &request.metric_choice.to_string())
                    .replace("{input}", &request.ordering.display().to_string())
                    .replace(
                        "{transmissions}",
                        &request.transmissions.display().to_string(),
                    )
                    .replace("{start}", &request.start_time.to_string())
            })
            .collect()
    }
}

impl EfficacyProvider for CommandEfficacy {
    fn name(&self) -> &str {
        &self.program
    }

    fn compute(&mut self, request: &EfficacyRequest<'_>) -> AppResult<Vec<EfficacyRecord>> {
        let scratch = self.scratch_path();
        let args = self.render_args(request);
        let stdout = File::create(&scratch).map_err(|e| {
            AppError::internal(format!(
                "failed to create scratch file {}: {e}",
                scratch.display()
            ))
        })?;

        debug!(program = %self.program, ?args, "running efficacy program");
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                AppError::external(format!("failed to start {}: {e}", self.program))
            })?;

        let involved = format!(
            "input {}, transmissions {}",
            request.ordering.display(),
            request.transmissions.display()
        );
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.chars().take(STDERR_EXCERPT_BYTES).collect();
            return Err(AppError::external(format!(
                "{} exited with {} ({involved}): {}",
                self.program,
                output.status,
                excerpt.trim()
            )));
        }

        let content = read_text(&scratch, self.bounds)?;
        if content.trim().is_empty() {
            return Err(AppError::external(format!(
                "{} produced no output ({involved})",
                self.program
            )));
        }
        parse_efficacy(&scratch.display().to_string(), &content, self.bounds)
            .map_err(|e| e.context(involved))
    }
}

#[derive(Debug, Clone, Default)]
pub struct NativeEfficacy {
    bounds: Bounds,
}

impl NativeEfficacy {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }
}

impl EfficacyProvider for NativeEfficacy {
    fn name(&self) -> &str {
        "native"
    }

    fn compute(&mut self, request: &EfficacyRequest<'_>) -> AppResult<Vec<EfficacyRecord>> {
        let window = TimeWindow::starting_at(request.start_time, request.metric_choice)?;
        let events = read_transmissions(request.transmissions, self.bounds)?;
        let ordering = read_ordering(request.ordering, self.bounds)?;

        let mut population = BTreeSet::new();
        for event in &events {
            population.insert(event.infected.as_str());
            if let Some(infector) = event.infector.person() {
                population.insert(infector);
            }
        }
        let counts = count_infections(&events, window);

        let mut seen = BTreeSet::new();
        let mut records = Vec::with_capacity(ordering.len());
        for individual in &ordering {
            if !population.contains(individual.as_str()) {
                warn!(
                    individual = %individual,
                    ordering = %request.ordering.display(),
                    "individual is not in the transmission histories; skipping"
                );
                continue;
            }
            if !seen.insert(individual.as_str()) {
                warn!(
                    individual = %individual,
                    ordering = %request.ordering.display(),
                    "individual listed more than once; keeping first position"
                );
                continue;
            }
            let efficacy = counts.get(individual).unwrap_or(0) as f64;
            records.push(EfficacyRecord::new(individual.clone(), efficacy));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordercheck_core::ErrorKind;
    use ordercheck_io::write_text;
    use tempfile::tempdir;

    fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
        let transmissions = dir.join("01.transmissions.txt.gz");
        let ordering = dir.join("01.ordering.txt");
        write_text(
            &transmissions,
            "None\tA\t0\nA\tB\t1\nA\tC\t9.5\nA\tD\t10\nB\tE\t9\nC\tF\t20\n",
        )
        .unwrap();
        write_text(&ordering, "A\nghost\nB\nC\nA\nF\n").unwrap();
        (ordering, transmissions)
    }

    #[test]
    fn native_counts_inside_metric_window() {
        let dir = tempdir().unwrap();
        let (ordering, transmissions) = fixture(dir.path());
        let mut provider = NativeEfficacy::default();
        let records = provider
            .compute(&EfficacyRequest {
                ordering: &ordering,
                transmissions: &transmissions,
                metric_choice: 3.2,
                start_time: 9.0,
            })
            .unwrap();
        assert_eq!(
            records,
            vec![
                EfficacyRecord::new("A", 2.0),
                EfficacyRecord::new("B", 1.0),
                EfficacyRecord::new("C", 0.0),
                EfficacyRecord::new("F", 0.0),
            ]
        );
    }

    #[test]
    fn native_rejects_negative_metric_window() {
        let dir = tempdir().unwrap();
        let (ordering, transmissions) = fixture(dir.path());
        let err = NativeEfficacy::default()
            .compute(&EfficacyRequest {
                ordering: &ordering,
                transmissions: &transmissions,
                metric_choice: -1.0,
                start_time: 9.0,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn renders_default_argument_template() {
        let provider = CommandEfficacy::new("compute_efficacy", Vec::new(), None).unwrap();
        let args = provider.render_args(&EfficacyRequest {
            ordering: Path::new("sims/E/01.proact.txt.gz"),
            transmissions: Path::new("sims/E/01.transmissions.txt.gz"),
            metric_choice: 3.2,
            start_time: 9.0,
        });
        assert_eq!(
            args,
            vec![
                "-m",
                "3.2",
                "-i",
                "sims/E/01.proact.txt.gz",
                "-t",
                "sims/E/01.transmissions.txt.gz",
                "-s",
                "9"
            ]
        );
    }

    #[cfg(unix)]
    fn request() -> EfficacyRequest<'static> {
        EfficacyRequest {
            ordering: Path::new("ordering.txt"),
            transmissions: Path::new("transmissions.txt"),
            metric_choice: 1.0,
            start_time: 0.0,
        }
    }

    #[cfg(unix)]
    #[test]
    fn command_output_is_parsed_from_scratch_file() {
        let mut provider = CommandEfficacy::new(
            "sh",
            vec![
                "-c".to_string(),
                "printf 'A\\t3\\nB\\t1\\n'".to_string(),
            ],
            None,
        )
        .unwrap();
        let records = provider.compute(&request()).unwrap();
        assert_eq!(
            records,
            vec![EfficacyRecord::new("A", 3.0), EfficacyRecord::new("B", 1.0)]
        );
        assert!(provider.scratch_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn scratch_file_is_overwritten_between_calls() {
        let dir = tempdir().unwrap();
        let counter = dir.path().join("calls");
        let script = format!(
            "if [ -f {0} ]; then printf 'Z\\t1\\n'; else touch {0}; printf 'A\\t3\\nB\\t2\\nC\\t1\\n'; fi",
            counter.display()
        );
        let mut provider =
            CommandEfficacy::new("sh", vec!["-c".to_string(), script], Some(dir.path())).unwrap();
        assert_eq!(provider.compute(&request()).unwrap().len(), 3);
        assert_eq!(
            provider.compute(&request()).unwrap(),
            vec![EfficacyRecord::new("Z", 1.0)]
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_external_error() {
        let mut provider = CommandEfficacy::new(
            "sh",
            vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()],
            None,
        )
        .unwrap();
        let err = provider.compute(&request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTool);
        assert!(err.message().contains("boom"));
    }

    #[cfg(unix)]
    #[test]
    fn silent_command_is_external_error() {
        let mut provider =
            CommandEfficacy::new("sh", vec!["-c".to_string(), "true".to_string()], None).unwrap();
        let err = provider.compute(&request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTool);
        assert!(err.message().contains("no output"));
    }

    #[cfg(unix)]
    #[test]
    fn malformed_command_output_names_line_and_inputs() {
        let mut provider = CommandEfficacy::new(
            "sh",
            vec!["-c".to_string(), "printf 'A\\t3\\textra\\n'".to_string()],
            None,
        )
        .unwrap();
        let err = provider.compute(&request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        assert!(err.message().contains("A\\t3\\textra"));
        assert!(err.message().contains("ordering.txt"));
        assert!(err.message().contains("transmissions.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn command_output_is_held_to_record_limit() {
        let mut provider = CommandEfficacy::new(
            "sh",
            vec![
                "-c".to_string(),
                "printf 'A\\t3\\nB\\t2\\nC\\t1\\n'".to_string(),
            ],
            None,
        )
        .unwrap()
        .with_bounds(Bounds {
            max_records: 2,
            ..Bounds::default()
        });
        let err = provider.compute(&request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        assert!(err.message().contains("max_records"));
    }

    #[test]
    fn missing_program_is_external_error() {
        let mut provider =
            CommandEfficacy::new("ordercheck-no-such-program", Vec::new(), None).unwrap();
        let err = provider
            .compute(&EfficacyRequest {
                ordering: Path::new("o"),
                transmissions: Path::new("t"),
                metric_choice: 1.0,
                start_time: 0.0,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalTool);
    }
}
