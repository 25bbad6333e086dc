use ordercheck_core::{AppError, AppResult};
use serde::Serialize;
use statrs::function::erf::erfc;

const EXACT_MAX_N: usize = 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PValueMethod {
    Exact,
    Asymptotic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TauResult {
    pub tau: f64,
    pub p_value: f64,
    pub n: usize,
    pub method: PValueMethod,
}

pub fn kendall_tau_b(x: &[f64], y: &[f64]) -> AppResult<TauResult> {
    if x.len() != y.len() {
        return Err(AppError::usage(format!(
            "rank correlation needs equal-length sequences, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 2 {
        return Err(AppError::degenerate(format!(
            "rank correlation needs at least 2 values, got {n}"
        )));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AppError::degenerate(
            "rank correlation input contains non-finite values",
        ));
    }

    // +0.0 folds -0.0 into 0.0 so total_cmp sees them as tied.
    let mut pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .map(|(a, b)| (a + 0.0, b + 0.0))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let x_ties = TieStats::from_sorted(&xs);
    let joint_ties = joint_tie_pairs(&pairs);
    // with pairs sorted by (x, y), discordant pairs are the strict inversions left in y
    let (ys, discordant) = sort_counting_inversions(pairs.iter().map(|p| p.1).collect());
    let y_ties = TieStats::from_sorted(&ys);

    let total = (n as u64) * (n as u64 - 1) / 2;
    if x_ties.pairs == total || y_ties.pairs == total {
        return Err(AppError::degenerate(
            "rank correlation is undefined for a constant sequence",
        ));
    }

    // n0 - n1 - n2 + n3 - 2 * discordant; denominator sqrt((n0 - n1) * (n0 - n2))
    let con_minus_dis = total as f64 - x_ties.pairs as f64 - y_ties.pairs as f64
        + joint_ties as f64
        - 2.0 * discordant as f64;
    let tau = con_minus_dis
        / ((total - x_ties.pairs) as f64).sqrt()
        / ((total - y_ties.pairs) as f64).sqrt();
    let tau = tau.clamp(-1.0, 1.0);

    let no_ties = x_ties.pairs == 0 && y_ties.pairs == 0;
    let extreme = discordant.min(total - discordant);
    // exact permutation distribution only without ties, or within one swap of perfect
    let (p_value, method) = if no_ties && (n <= EXACT_MAX_N || extreme <= 1) {
        (exact_p_value(n, extreme), PValueMethod::Exact)
    } else {
        (
            asymptotic_p_value(n, con_minus_dis, &x_ties, &y_ties),
            PValueMethod::Asymptotic,
        )
    };

    Ok(TauResult {
        tau,
        p_value: p_value.clamp(0.0, 1.0),
        n,
        method,
    })
}

#[derive(Debug, Default)]
struct TieStats {
    pairs: u64,
    // sum t(t-1)(t-2) and sum t(t-1)(2t+5) over tie groups of size t
    cubic: f64,
    variance: f64,
}

impl TieStats {
    fn from_sorted(values: &[f64]) -> Self {
        let mut stats = TieStats::default();
        let mut run = 1u64;
        for i in 1..=values.len() {
            if i < values.len() && values[i] == values[i - 1] {
                run += 1;
                continue;
            }
            stats.add_group(run);
            run = 1;
        }
        stats
    }

    fn add_group(&mut self, t: u64) {
        if t < 2 {
            return;
        }
        let tf = t as f64;
        self.pairs += t * (t - 1) / 2;
        self.cubic += tf * (tf - 1.0) * (tf - 2.0);
        self.variance += tf * (tf - 1.0) * (2.0 * tf + 5.0);
    }
}

fn joint_tie_pairs(sorted_pairs: &[(f64, f64)]) -> u64 {
    let mut total = 0u64;
    let mut run = 1u64;
    for i in 1..=sorted_pairs.len() {
        if i < sorted_pairs.len() && sorted_pairs[i] == sorted_pairs[i - 1] {
            run += 1;
            continue;
        }
        total += run * (run - 1) / 2;
        run = 1;
    }
    total
}

/// Bottom-up merge sort returning the sorted values and the number of strict
/// inversions (`i < j` with `v[i] > v[j]`).
fn sort_counting_inversions(values: Vec<f64>) -> (Vec<f64>, u64) {
    let n = values.len();
    let mut src = values;
    let mut dst = vec![0.0; n];
    let mut inversions = 0u64;
    let mut width = 1;
    while width < n {
        let mut start = 0;
        while start < n {
            let mid = (start + width).min(n);
            let end = (start + 2 * width).min(n);
            let (mut i, mut j, mut k) = (start, mid, start);
            while i < mid && j < end {
                if src[j] < src[i] {
                    dst[k] = src[j];
                    j += 1;
                    inversions += (mid - i) as u64;
                } else {
                    dst[k] = src[i];
                    i += 1;
                }
                k += 1;
            }
            dst[k..k + (mid - i)].copy_from_slice(&src[i..mid]);
            k += mid - i;
            dst[k..k + (end - j)].copy_from_slice(&src[j..end]);
            start += 2 * width;
        }
        std::mem::swap(&mut src, &mut dst);
        width *= 2;
    }
    (src, inversions)
}

/// Two-sided exact p-value for `c = min(discordant, total - discordant)`.
fn exact_p_value(n: usize, c: u64) -> f64 {
    let c = c as usize;
    if n <= 2 || 4 * c == n * (n - 1) {
        return 1.0;
    }
    if c == 0 {
        return 2.0 / factorial(n);
    }
    if c == 1 {
        return 2.0 / factorial(n - 1);
    }

    // counts[k] / (j! / 2) = share of permutations of j items with k
    // inversions; divided as we go so large n does not overflow.
    let mut counts = vec![0.0f64; c + 1];
    counts[0] = 1.0;
    counts[1] = 1.0;
    for j in 3..=n {
        let mut acc = 0.0;
        for value in counts.iter_mut() {
            acc += *value;
            *value = acc / j as f64;
        }
        if j <= c {
            for k in (j..=c).rev() {
                counts[k] -= counts[k - j];
            }
        }
    }
    counts.iter().sum::<f64>().min(1.0)
}

fn asymptotic_p_value(n: usize, con_minus_dis: f64, x: &TieStats, y: &TieStats) -> f64 {
    let nf = n as f64;
    let m = nf * (nf - 1.0);
    let mut variance = (m * (2.0 * nf + 5.0) - x.variance - y.variance) / 18.0
        + (2.0 * x.pairs as f64 * y.pairs as f64) / m;
    if n > 2 {
        variance += x.cubic * y.cubic / (9.0 * m * (nf - 2.0));
    }
    if variance <= 0.0 {
        return 1.0;
    }
    let z = con_minus_dis / variance.sqrt();
    erfc(z.abs() / std::f64::consts::SQRT_2)
}

fn factorial(n: usize) -> f64 {
    (2..=n).fold(1.0, |acc, k| acc * k as f64)
}
