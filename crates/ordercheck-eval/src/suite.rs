use ordercheck_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchSuite {
    pub version: u32,
    pub name: String,
    pub sims_dir: PathBuf,
    pub figures_dir: PathBuf,
    #[serde(default = "default_transmission_suffix")]
    pub transmission_suffix: String,
    #[serde(default)]
    pub experiments: Vec<String>,
    pub algorithms: Vec<AlgorithmConfig>,
    pub metric_choice: f64,
    pub start_time: f64,
    #[serde(default)]
    pub replicates: ReplicateRange,
    #[serde(default)]
    pub generate: Option<GenerateConfig>,
}

impl BatchSuite {
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::usage(format!("failed to read suite {}: {e}", path.display()))
        })?;
        let suite: BatchSuite = serde_yaml::from_str(&content).map_err(|e| {
            AppError::usage(format!("failed to parse suite {}: {e}", path.display()))
        })?;
        suite.validate()?;
        Ok(suite)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.version != 1 {
            return Err(AppError::usage("unsupported suite version"));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::usage("suite name is empty"));
        }
        if self.transmission_suffix.is_empty() {
            return Err(AppError::usage("transmission_suffix is empty"));
        }
        if !self.metric_choice.is_finite() {
            return Err(AppError::usage("metric_choice must be a finite number"));
        }
        if !self.start_time.is_finite() {
            return Err(AppError::usage("start_time must be a finite number"));
        }

        let mut experiments = BTreeSet::new();
        for experiment in &self.experiments {
            validate_path_segment("experiment", experiment)?;
            if !experiments.insert(experiment.as_str()) {
                return Err(AppError::usage(format!(
                    "duplicate experiment {experiment}"
                )));
            }
        }

        if self.algorithms.is_empty() {
            return Err(AppError::usage("suite algorithms empty"));
        }
        let mut tags = BTreeSet::new();
        for algorithm in &self.algorithms {
            algorithm.validate()?;
            if !tags.insert(algorithm.tag.as_str()) {
                return Err(AppError::usage(format!(
                    "duplicate algorithm tag {}",
                    algorithm.tag
                )));
            }
        }

        self.replicates.validate()?;
        if let Some(generate) = &self.generate {
            generate.validate()?;
        }
        Ok(())
    }

    pub fn experiment_dir(&self, experiment: &str) -> PathBuf {
        self.sims_dir.join(experiment)
    }

    pub fn transmission_path(&self, experiment: &str, replicate: &str) -> PathBuf {
        self.experiment_dir(experiment)
            .join(format!("{replicate}{}", self.transmission_suffix))
    }

    pub fn ordering_path(
        &self,
        experiment: &str,
        replicate: &str,
        algorithm: &AlgorithmConfig,
    ) -> PathBuf {
        self.experiment_dir(experiment)
            .join(format!("{replicate}{}", algorithm.suffix))
    }

    pub fn output_stem(&self) -> String {
        format!("m{}_tau", self.metric_choice)
    }

    pub fn palette(&self) -> BTreeMap<String, String> {
        self.algorithms
            .iter()
            .filter_map(|a| a.color.clone().map(|c| (a.tag.clone(), c)))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AlgorithmConfig {
    pub tag: String,
    pub suffix: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl AlgorithmConfig {
    fn validate(&self) -> AppResult<()> {
        if self.tag.trim().is_empty() {
            return Err(AppError::usage("algorithm tag is empty"));
        }
        if self.suffix.is_empty() || self.suffix.contains('/') || self.suffix.contains('\\') {
            return Err(AppError::usage(format!(
                "algorithm {} has an invalid suffix",
                self.tag
            )));
        }
        if let Some(color) = &self.color {
            let hex = color.strip_prefix('#').unwrap_or("");
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(AppError::usage(format!(
                    "algorithm {} color must look like #rrggbb",
                    self.tag
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplicateRange {
    pub first: u32,
    pub count: u32,
    pub pad_width: usize,
}

impl Default for ReplicateRange {
    fn default() -> Self {
        Self {
            first: 1,
            count: 20,
            pad_width: 2,
        }
    }
}

impl ReplicateRange {
    fn validate(&self) -> AppResult<()> {
        if self.pad_width > 16 {
            return Err(AppError::usage("replicates.pad_width must be <= 16"));
        }
        if self.first.checked_add(self.count).is_none() {
            return Err(AppError::usage("replicates range overflows"));
        }
        Ok(())
    }

    pub fn labels(&self) -> Vec<String> {
        (self.first..self.first + self.count)
            .map(|i| format!("{i:0width$}", width = self.pad_width))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateConfig {
    pub seed: u64,
    pub individuals: u32,
    #[serde(default = "default_index_cases")]
    pub index_cases: u32,
    pub horizon: f64,
}

impl GenerateConfig {
    fn validate(&self) -> AppResult<()> {
        if self.individuals < 2 {
            return Err(AppError::usage("generate.individuals must be >= 2"));
        }
        if self.index_cases == 0 || self.index_cases > self.individuals {
            return Err(AppError::usage(
                "generate.index_cases must be in 1..=individuals",
            ));
        }
        if !(self.horizon.is_finite() && self.horizon > 0.0) {
            return Err(AppError::usage("generate.horizon must be > 0"));
        }
        Ok(())
    }
}

fn validate_path_segment(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty()
        || value.contains('/')
        || value.contains('\\')
        || value == "."
        || value == ".."
    {
        return Err(AppError::usage(format!("invalid {field} name '{value}'")));
    }
    Ok(())
}

fn default_transmission_suffix() -> String {
    ".transmissions.txt.gz".to_string()
}

fn default_index_cases() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordercheck_core::ErrorKind;

    const SUITE: &str = r##"
version: 1
name: "violin"
sims_dir: "simulations"
figures_dir: "figs"
experiments: ["SAMPLE-FIRSTART_ARTRATE-4", "SAMPLE-FIRSTART_ARTRATE-2"]
algorithms:
  - tag: "proact"
    suffix: ".time9.ft.mv.proact.txt.gz"
    color: "#161f54"
  - tag: "hivtrace"
    suffix: ".time9.tn93.hivtrace.growth.ordering.txt.gz"
    color: "#a16c18"
metric_choice: 3.2
start_time: 9
"##;

    fn suite() -> BatchSuite {
        let suite: BatchSuite = serde_yaml::from_str(SUITE).unwrap();
        suite.validate().unwrap();
        suite
    }

    #[test]
    fn defaults_match_twenty_padded_replicates() {
        let labels = suite().replicates.labels();
        assert_eq!(labels.len(), 20);
        assert_eq!(labels[0], "01");
        assert_eq!(labels[19], "20");
    }

    #[test]
    fn builds_replicate_paths() {
        let suite = suite();
        assert_eq!(
            suite.transmission_path("SAMPLE-FIRSTART_ARTRATE-4", "07"),
            PathBuf::from("simulations/SAMPLE-FIRSTART_ARTRATE-4/07.transmissions.txt.gz")
        );
        assert_eq!(
            suite.ordering_path("SAMPLE-FIRSTART_ARTRATE-2", "12", &suite.algorithms[0]),
            PathBuf::from("simulations/SAMPLE-FIRSTART_ARTRATE-2/12.time9.ft.mv.proact.txt.gz")
        );
        assert_eq!(suite.output_stem(), "m3.2_tau");
    }

    #[test]
    fn rejects_duplicate_algorithm_tags() {
        let mut suite = suite();
        suite.algorithms[1].tag = "proact".to_string();
        let err = suite.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn rejects_bad_color() {
        let mut suite = suite();
        suite.algorithms[0].color = Some("navy".to_string());
        assert!(suite.validate().is_err());
    }

    #[test]
    fn empty_experiment_list_is_valid() {
        let mut suite = suite();
        suite.experiments.clear();
        assert!(suite.validate().is_ok());
    }

    #[test]
    fn experiment_cannot_escape_sims_dir() {
        let mut suite = suite();
        suite.experiments.push("../etc".to_string());
        assert!(suite.validate().is_err());
    }

    #[test]
    fn custom_padding() {
        let range = ReplicateRange {
            first: 8,
            count: 3,
            pad_width: 3,
        };
        assert_eq!(range.labels(), vec!["008", "009", "010"]);
    }
}
