use crate::suite::{BatchSuite, GenerateConfig};
use ordercheck_core::{AppError, AppResult};
use ordercheck_io::write_text;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;
use tracing::info;

const MAX_OFFSPRING: u32 = 3;

struct Transmission {
    infector: Option<usize>,
    infected: usize,
    time: f64,
}

pub fn generate_fixtures(suite: &BatchSuite, overwrite: bool) -> AppResult<()> {
    let generate = suite
        .generate
        .as_ref()
        .ok_or_else(|| AppError::usage("suite has no generate section"))?;
    fs::create_dir_all(&suite.sims_dir)
        .map_err(|e| AppError::internal(format!("failed to create sims dir: {e}")))?;

    for (exp_idx, experiment) in suite.experiments.iter().enumerate() {
        let final_dir = suite.experiment_dir(experiment);
        if final_dir.exists() {
            if !overwrite {
                return Err(AppError::usage(format!(
                    "experiment {experiment} already exists; use --overwrite"
                )));
            }
            fs::remove_dir_all(&final_dir).map_err(|e| {
                AppError::internal(format!("failed to remove existing experiment dir: {e}"))
            })?;
        }

        let partial_dir = suite.sims_dir.join(format!("{experiment}.partial"));
        if partial_dir.exists() {
            fs::remove_dir_all(&partial_dir).map_err(|e| {
                AppError::internal(format!("failed to remove existing partial dir: {e}"))
            })?;
        }
        fs::create_dir_all(&partial_dir)
            .map_err(|e| AppError::internal(format!("failed to create experiment dir: {e}")))?;

        for (rep_idx, replicate) in suite.replicates.labels().iter().enumerate() {
            let seed = generate
                .seed
                .wrapping_add((exp_idx as u64) << 32)
                .wrapping_add(rep_idx as u64);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            write_replicate(&partial_dir, suite, generate, replicate, &mut rng)?;
        }

        fs::rename(&partial_dir, &final_dir)
            .map_err(|e| AppError::internal(format!("failed to finalize experiment dir: {e}")))?;
        info!(experiment = %experiment, dir = %final_dir.display(), "generated fixtures");
    }
    Ok(())
}

fn write_replicate(
    dir: &Path,
    suite: &BatchSuite,
    generate: &GenerateConfig,
    replicate: &str,
    rng: &mut ChaCha8Rng,
) -> AppResult<()> {
    let (transmissions, infected) = simulate(generate, rng);

    let mut log = String::new();
    for t in &transmissions {
        let infector = t
            .infector
            .map(person_id)
            .unwrap_or_else(|| "None".to_string());
        log.push_str(&format!(
            "{infector}\t{}\t{:.4}\n",
            person_id(t.infected),
            t.time
        ));
    }
    write_text(
        &dir.join(format!("{replicate}{}", suite.transmission_suffix)),
        &log,
    )?;

    let lower = suite.start_time;
    let upper = suite.start_time + suite.metric_choice;
    let mut window_counts: BTreeMap<usize, u64> = BTreeMap::new();
    for t in &transmissions {
        if let Some(infector) = t.infector {
            if lower <= t.time && t.time <= upper {
                *window_counts.entry(infector).or_insert(0) += 1;
            }
        }
    }

    // Later algorithms in the suite get noisier orderings.
    for (alg_idx, algorithm) in suite.algorithms.iter().enumerate() {
        let noise = 2.0 * (alg_idx + 1) as f64;
        let mut scored: Vec<(f64, usize)> = (0..infected)
            .map(|person| {
                let signal = window_counts.get(&person).copied().unwrap_or(0) as f64;
                (signal + rng.gen::<f64>() * noise, person)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut ordering = String::new();
        for (_, person) in scored {
            ordering.push_str(&format!("{}\n", person_id(person)));
        }
        write_text(&dir.join(format!("{replicate}{}", algorithm.suffix)), &ordering)?;
    }
    Ok(())
}

/// Branching process over a fixed population; returns the transmissions and
/// the number of individuals ever infected.
fn simulate(config: &GenerateConfig, rng: &mut ChaCha8Rng) -> (Vec<Transmission>, usize) {
    let population = config.individuals as usize;
    let mut transmissions = Vec::new();
    let mut queue = VecDeque::new();
    for person in 0..config.index_cases as usize {
        transmissions.push(Transmission {
            infector: None,
            infected: person,
            time: 0.0,
        });
        queue.push_back((person, 0.0));
    }

    let mut next_free = config.index_cases as usize;
    while let Some((person, infected_at)) = queue.pop_front() {
        let offspring = rng.gen_range(0..=MAX_OFFSPRING);
        for _ in 0..offspring {
            if next_free >= population {
                break;
            }
            let time = infected_at + rng.gen_range(0.1..2.0);
            if time > config.horizon {
                continue;
            }
            transmissions.push(Transmission {
                infector: Some(person),
                infected: next_free,
                time,
            });
            queue.push_back((next_free, time));
            next_free += 1;
        }
    }
    (transmissions, next_free)
}

fn person_id(index: usize) -> String {
    format!("P{index:05}")
}
