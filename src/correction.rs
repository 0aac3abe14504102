use std::{fmt, str::FromStr};

use adjustp::{adjust, Procedure};
use itertools::Itertools;

use crate::{
    error::{EnrichmentError, Result},
    utils::{
        argsort, clip_unit, cumulative_max, reverse_cumulative_min, scatter_indices,
        select_indices,
    },
};

/// Prefix used to qualify a method name by the library that defines it
const SOURCE_PREFIX: &str = "sm_";

/// Multiple-test correction procedures
///
/// Every procedure is applied to the full vector of uncorrected p-values of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CorrectionMethod {
    /// Bonferroni one-step correction
    Bonferroni,
    /// Šidák one-step correction
    Sidak,
    /// Holm step-down method using Šidák adjustments
    HolmSidak,
    /// Holm step-down method using Bonferroni adjustments
    Holm,
    /// Simes-Hochberg step-up method (independent tests)
    SimesHochberg,
    /// Hommel closed method based on Simes tests (non-negative correlation)
    Hommel,
    /// Benjamini-Hochberg false discovery rate
    FdrBh,
    /// Benjamini-Yekutieli false discovery rate (arbitrary dependence)
    FdrBy,
    /// Two-stage Benjamini-Hochberg false discovery rate
    FdrTsbh,
    /// Two-stage Benjamini-Krieger-Yekutieli false discovery rate
    FdrTsbky,
}

impl CorrectionMethod {
    pub const ALL: [CorrectionMethod; 10] = [
        CorrectionMethod::Bonferroni,
        CorrectionMethod::Sidak,
        CorrectionMethod::HolmSidak,
        CorrectionMethod::Holm,
        CorrectionMethod::SimesHochberg,
        CorrectionMethod::Hommel,
        CorrectionMethod::FdrBh,
        CorrectionMethod::FdrBy,
        CorrectionMethod::FdrTsbh,
        CorrectionMethod::FdrTsbky,
    ];

    /// The canonical key of the procedure, e.g. `holm-sidak`
    pub fn key(&self) -> &'static str {
        match self {
            CorrectionMethod::Bonferroni => "bonferroni",
            CorrectionMethod::Sidak => "sidak",
            CorrectionMethod::HolmSidak => "holm-sidak",
            CorrectionMethod::Holm => "holm",
            CorrectionMethod::SimesHochberg => "simes-hochberg",
            CorrectionMethod::Hommel => "hommel",
            CorrectionMethod::FdrBh => "fdr_bh",
            CorrectionMethod::FdrBy => "fdr_by",
            CorrectionMethod::FdrTsbh => "fdr_tsbh",
            CorrectionMethod::FdrTsbky => "fdr_tsbky",
        }
    }

    /// The key with dashes replaced, suitable as a column header
    pub fn field_name(&self) -> String {
        self.key().replace('-', "_")
    }

    /// Human readable listing of every supported procedure
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(|method| format!("        {}", method.key()))
            .join("\n")
    }

    /// Applies the procedure to `pvalues` at the test-wise `alpha`
    ///
    /// The p-values are processed in ascending order and the outcome is returned
    /// in the order they were provided. Corrected values are clipped to [0, 1].
    pub fn apply(&self, pvalues: &[f64], alpha: f64) -> MultiTestOutcome {
        let m = pvalues.len();
        if m == 0 {
            return MultiTestOutcome {
                pvalues: Vec::new(),
                reject: Vec::new(),
                alpha_sidak: alpha,
                alpha_bonferroni: alpha,
            };
        }
        let alpha_sidak = 1.0 - (1.0 - alpha).powf(1.0 / m as f64);
        let alpha_bonferroni = alpha / m as f64;

        let order = argsort(pvalues);
        let sorted = select_indices(&order, pvalues);

        let (reject, mut corrected) = match self {
            CorrectionMethod::Bonferroni => (
                sorted.iter().map(|&p| p <= alpha_bonferroni).collect(),
                adjust(&sorted, Procedure::Bonferroni),
            ),
            CorrectionMethod::Sidak => (
                sorted.iter().map(|&p| p <= alpha_sidak).collect(),
                sorted.iter().map(|&p| sidak(p, m)).collect(),
            ),
            CorrectionMethod::HolmSidak => holm_sidak(&sorted, alpha),
            CorrectionMethod::Holm => holm(&sorted, alpha),
            CorrectionMethod::SimesHochberg => simes_hochberg(&sorted, alpha),
            CorrectionMethod::Hommel => hommel(&sorted, alpha),
            CorrectionMethod::FdrBh => (
                fdr_reject(&sorted, alpha),
                adjust(&sorted, Procedure::BenjaminiHochberg),
            ),
            CorrectionMethod::FdrBy => (
                fdr_reject(&sorted, alpha / harmonic(m)),
                adjust(&sorted, Procedure::BenjaminiYekutieli),
            ),
            CorrectionMethod::FdrTsbh => two_stage(&sorted, alpha, 1.0),
            CorrectionMethod::FdrTsbky => two_stage(&sorted, alpha, 1.0 + alpha),
        };
        clip_unit(&mut corrected);

        MultiTestOutcome {
            pvalues: scatter_indices(&order, &corrected),
            reject: scatter_indices(&order, &reject),
            alpha_sidak,
            alpha_bonferroni,
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CorrectionMethod {
    type Err = EnrichmentError;

    /// Accepts the canonical key, its field name, or either one qualified by `sm_`
    fn from_str(name: &str) -> Result<Self> {
        let key = name.trim();
        let key = key.strip_prefix(SOURCE_PREFIX).unwrap_or(key);
        match key {
            "bonferroni" => Ok(CorrectionMethod::Bonferroni),
            "sidak" => Ok(CorrectionMethod::Sidak),
            "holm-sidak" | "holm_sidak" => Ok(CorrectionMethod::HolmSidak),
            "holm" => Ok(CorrectionMethod::Holm),
            "simes-hochberg" | "simes_hochberg" => Ok(CorrectionMethod::SimesHochberg),
            "hommel" => Ok(CorrectionMethod::Hommel),
            "fdr_bh" => Ok(CorrectionMethod::FdrBh),
            "fdr_by" => Ok(CorrectionMethod::FdrBy),
            "fdr_tsbh" => Ok(CorrectionMethod::FdrTsbh),
            "fdr_tsbky" => Ok(CorrectionMethod::FdrTsbky),
            _ => Err(EnrichmentError::UnknownMethod {
                method: name.to_string(),
                available: Self::available(),
            }),
        }
    }
}

/// Output of a single correction procedure, aligned with its input p-values
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTestOutcome {
    pub pvalues: Vec<f64>,
    pub reject: Vec<bool>,
    /// Per-test alpha under the Šidák correction
    pub alpha_sidak: f64,
    /// Per-test alpha under the Bonferroni correction
    pub alpha_bonferroni: f64,
}

/// `1 - (1 - p)^n` without losing precision for small `p`
fn sidak(pvalue: f64, n: usize) -> f64 {
    -(n as f64 * (-pvalue).ln_1p()).exp_m1()
}

fn harmonic(m: usize) -> f64 {
    (1..=m).map(|j| (j as f64).recip()).sum()
}

/// Rejects hypotheses in order until the first p-value exceeds its threshold
fn step_down(sorted: &[f64], threshold: impl Fn(usize) -> f64) -> Vec<bool> {
    let first_accept = sorted
        .iter()
        .enumerate()
        .position(|(i, &p)| p > threshold(i))
        .unwrap_or(sorted.len());
    (0..sorted.len()).map(|i| i < first_accept).collect()
}

/// Rejects every hypothesis up to the last p-value under its threshold
fn step_up(sorted: &[f64], threshold: impl Fn(usize) -> f64) -> Vec<bool> {
    let last_reject = sorted
        .iter()
        .enumerate()
        .rposition(|(i, &p)| p <= threshold(i));
    match last_reject {
        Some(last) => (0..sorted.len()).map(|i| i <= last).collect(),
        None => vec![false; sorted.len()],
    }
}

fn fdr_reject(sorted: &[f64], alpha: f64) -> Vec<bool> {
    let m = sorted.len() as f64;
    step_up(sorted, |i| alpha * (i + 1) as f64 / m)
}

fn holm(sorted: &[f64], alpha: f64) -> (Vec<bool>, Vec<f64>) {
    let m = sorted.len();
    let reject = step_down(sorted, |i| alpha / (m - i) as f64);
    let mut corrected = sorted
        .iter()
        .enumerate()
        .map(|(i, &p)| p * (m - i) as f64)
        .collect::<Vec<_>>();
    cumulative_max(&mut corrected);
    (reject, corrected)
}

fn holm_sidak(sorted: &[f64], alpha: f64) -> (Vec<bool>, Vec<f64>) {
    let m = sorted.len();
    let reject = step_down(sorted, |i| 1.0 - (1.0 - alpha).powf(1.0 / (m - i) as f64));
    let mut corrected = sorted
        .iter()
        .enumerate()
        .map(|(i, &p)| sidak(p, m - i))
        .collect::<Vec<_>>();
    cumulative_max(&mut corrected);
    (reject, corrected)
}

fn simes_hochberg(sorted: &[f64], alpha: f64) -> (Vec<bool>, Vec<f64>) {
    let m = sorted.len();
    let reject = step_up(sorted, |i| alpha / (m - i) as f64);
    let mut corrected = sorted
        .iter()
        .enumerate()
        .map(|(i, &p)| p * (m - i) as f64)
        .collect::<Vec<_>>();
    reverse_cumulative_min(&mut corrected);
    (reject, corrected)
}

fn hommel(sorted: &[f64], alpha: f64) -> (Vec<bool>, Vec<f64>) {
    let m = sorted.len();
    let mut adjusted = sorted.to_vec();
    for k in (2..=m).rev() {
        let offset = m - k;
        let scale = k as f64;
        let critical = sorted[offset..]
            .iter()
            .enumerate()
            .map(|(j, &p)| scale * p / (j + 1) as f64)
            .fold(f64::INFINITY, f64::min);
        for value in adjusted[offset..].iter_mut() {
            *value = value.max(critical);
        }
        for (value, &p) in adjusted[..offset].iter_mut().zip(sorted) {
            *value = value.max((scale * p).min(critical));
        }
    }
    let reject = adjusted.iter().map(|&p| p <= alpha).collect();
    (reject, adjusted)
}

/// Two-stage FDR control
///
/// `factor` is 1 for the Benjamini-Hochberg variant and `1 + alpha` for the
/// Benjamini-Krieger-Yekutieli variant. The first stage estimates the number of
/// true null hypotheses, the second re-runs BH at the inflated level.
fn two_stage(sorted: &[f64], alpha: f64, factor: f64) -> (Vec<bool>, Vec<f64>) {
    let m = sorted.len();
    let alpha_prime = alpha / factor;
    let bh = adjust(sorted, Procedure::BenjaminiHochberg);

    let first_stage = fdr_reject(sorted, alpha_prime);
    let rejected = first_stage.iter().filter(|&&r| r).count();
    if rejected == 0 || rejected == m {
        return (first_stage, bh.iter().map(|q| q * factor).collect());
    }

    let true_nulls = (m - rejected) as f64;
    let reject = fdr_reject(sorted, alpha_prime * m as f64 / true_nulls);
    let scale = true_nulls / m as f64 * factor;
    (reject, bh.iter().map(|q| q * scale).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const PVALUES: [f64; 4] = [0.01, 0.04, 0.03, 0.005];

    fn assert_all_close(observed: &[f64], expected: &[f64]) {
        assert_eq!(observed.len(), expected.len());
        for (o, e) in observed.iter().zip(expected) {
            assert_relative_eq!(*o, *e, epsilon = 1e-9);
        }
    }

    fn random_pvalues(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
        (0..n)
            .map(|_| {
                // mix of near-zero and uniform draws
                if rng.gen_bool(0.3) {
                    rng.gen_range(0.0..0.01)
                } else {
                    rng.gen_range(0.0..=1.0)
                }
            })
            .collect()
    }

    #[test]
    fn test_parse_canonical_and_aliases() {
        let parse = |name: &str| CorrectionMethod::from_str(name);
        assert_eq!(parse("holm-sidak"), Ok(CorrectionMethod::HolmSidak));
        assert_eq!(parse("holm_sidak"), Ok(CorrectionMethod::HolmSidak));
        assert_eq!(parse("sm_fdr_bh"), Ok(CorrectionMethod::FdrBh));
        assert_eq!(parse(" bonferroni "), Ok(CorrectionMethod::Bonferroni));
        for method in CorrectionMethod::ALL {
            assert_eq!(parse(method.key()), Ok(method));
            assert_eq!(parse(&method.field_name()), Ok(method));
        }
    }

    #[test]
    fn test_parse_unknown_lists_methods() {
        let err = "not_a_method".parse::<CorrectionMethod>().unwrap_err();
        match &err {
            EnrichmentError::UnknownMethod { method, .. } => assert_eq!(method, "not_a_method"),
            other => panic!("unexpected error: {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("not_a_method"));
        for method in CorrectionMethod::ALL {
            assert!(message.contains(method.key()), "missing {method}");
        }
    }

    #[test]
    fn test_bonferroni() {
        let outcome = CorrectionMethod::Bonferroni.apply(&PVALUES, 0.05);
        assert_all_close(&outcome.pvalues, &[0.04, 0.16, 0.12, 0.02]);
        assert_eq!(outcome.reject, vec![true, false, false, true]);
        assert_relative_eq!(outcome.alpha_bonferroni, 0.0125);
    }

    #[test]
    fn test_bonferroni_clips_to_one() {
        let outcome = CorrectionMethod::Bonferroni.apply(&[0.5, 0.8], 0.05);
        assert_eq!(outcome.pvalues, vec![1.0, 1.0]);
    }

    #[test]
    fn test_sidak() {
        let outcome = CorrectionMethod::Sidak.apply(&PVALUES, 0.05);
        assert_relative_eq!(outcome.pvalues[0], 1.0 - 0.99_f64.powi(4), epsilon = 1e-12);
        assert_relative_eq!(outcome.pvalues[3], 1.0 - 0.995_f64.powi(4), epsilon = 1e-12);
        assert_relative_eq!(outcome.alpha_sidak, 1.0 - 0.95_f64.powf(0.25), epsilon = 1e-12);
        assert_eq!(outcome.reject, vec![true, false, false, true]);
    }

    #[test]
    fn test_holm() {
        let outcome = CorrectionMethod::Holm.apply(&PVALUES, 0.05);
        assert_all_close(&outcome.pvalues, &[0.03, 0.06, 0.06, 0.02]);
        assert_eq!(outcome.reject, vec![true, false, false, true]);
    }

    #[test]
    fn test_holm_sidak() {
        let outcome = CorrectionMethod::HolmSidak.apply(&PVALUES, 0.05);
        let expected = [
            1.0 - 0.99_f64.powi(3),
            1.0 - 0.97_f64.powi(2),
            1.0 - 0.97_f64.powi(2),
            1.0 - 0.995_f64.powi(4),
        ];
        assert_all_close(&outcome.pvalues, &expected);
        assert_eq!(outcome.reject, vec![true, false, false, true]);
    }

    #[test]
    fn test_simes_hochberg() {
        let outcome = CorrectionMethod::SimesHochberg.apply(&PVALUES, 0.05);
        assert_all_close(&outcome.pvalues, &[0.03, 0.04, 0.04, 0.02]);
        assert_eq!(outcome.reject, vec![true; 4]);
    }

    #[test]
    fn test_hommel() {
        let outcome = CorrectionMethod::Hommel.apply(&PVALUES, 0.05);
        assert_all_close(&outcome.pvalues, &[0.03, 0.04, 0.04, 0.02]);
        assert_eq!(outcome.reject, vec![true; 4]);
    }

    #[test]
    fn test_hommel_tighter_than_simes_hochberg() {
        let pvalues = [0.002, 0.03, 0.035, 0.2];
        let hommel = CorrectionMethod::Hommel.apply(&pvalues, 0.05);
        assert_all_close(&hommel.pvalues, &[0.008, 0.06, 0.07, 0.2]);
        assert_eq!(hommel.reject, vec![true, false, false, false]);

        let hochberg = CorrectionMethod::SimesHochberg.apply(&pvalues, 0.05);
        assert_all_close(&hochberg.pvalues, &[0.008, 0.07, 0.07, 0.2]);
        assert!(hommel
            .pvalues
            .iter()
            .zip(&hochberg.pvalues)
            .all(|(a, b)| a <= b));
    }

    #[test]
    fn test_fdr_bh() {
        // Sorted: 0.005, 0.01, 0.03, 0.04 -> raw 0.02, 0.02, 0.04, 0.04
        let outcome = CorrectionMethod::FdrBh.apply(&PVALUES, 0.05);
        assert_all_close(&outcome.pvalues, &[0.02, 0.04, 0.04, 0.02]);
        assert_eq!(outcome.reject, vec![true; 4]);
    }

    #[test]
    fn test_fdr_by() {
        let cm = 1.0 + 0.5 + 1.0 / 3.0 + 0.25;
        let outcome = CorrectionMethod::FdrBy.apply(&PVALUES, 0.05);
        assert_all_close(
            &outcome.pvalues,
            &[0.02 * cm, 0.04 * cm, 0.04 * cm, 0.02 * cm],
        );
        // thresholds 0.05 * i / (4 * cm): 0.006, 0.012, 0.018, 0.024
        assert_eq!(outcome.reject, vec![true, false, false, true]);
    }

    #[test]
    fn test_fdr_tsbh() {
        let pvalues = [0.2, 0.001, 0.5, 0.01];
        let outcome = CorrectionMethod::FdrTsbh.apply(&pvalues, 0.05);
        // BH: 0.26667, 0.004, 0.5, 0.02 scaled by m0 / m = 2 / 4
        assert_all_close(&outcome.pvalues, &[0.4 / 3.0, 0.002, 0.25, 0.01]);
        assert_eq!(outcome.reject, vec![false, true, false, true]);
    }

    #[test]
    fn test_fdr_tsbky() {
        let pvalues = [0.2, 0.001, 0.5, 0.01];
        let outcome = CorrectionMethod::FdrTsbky.apply(&pvalues, 0.05);
        let scale = 0.5 * 1.05;
        assert_all_close(
            &outcome.pvalues,
            &[0.8 / 3.0 * scale, 0.004 * scale, 0.5 * scale, 0.02 * scale],
        );
        assert_eq!(outcome.reject, vec![false, true, false, true]);
    }

    #[test]
    fn test_two_stage_all_rejected_falls_back_to_bh() {
        let bh = CorrectionMethod::FdrBh.apply(&PVALUES, 0.05);
        let tsbh = CorrectionMethod::FdrTsbh.apply(&PVALUES, 0.05);
        assert_all_close(&tsbh.pvalues, &bh.pvalues);
        assert_eq!(tsbh.reject, bh.reject);
    }

    #[test]
    fn test_empty_input() {
        for method in CorrectionMethod::ALL {
            let outcome = method.apply(&[], 0.05);
            assert!(outcome.pvalues.is_empty());
            assert!(outcome.reject.is_empty());
        }
    }

    #[test]
    fn test_single_pvalue_is_unchanged_by_monotone_methods() {
        for method in [
            CorrectionMethod::Bonferroni,
            CorrectionMethod::Sidak,
            CorrectionMethod::Holm,
            CorrectionMethod::HolmSidak,
            CorrectionMethod::SimesHochberg,
            CorrectionMethod::Hommel,
            CorrectionMethod::FdrBh,
            CorrectionMethod::FdrBy,
        ] {
            let outcome = method.apply(&[0.05], 0.05);
            assert_relative_eq!(outcome.pvalues[0], 0.05, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_corrected_values_bounded_and_conservative() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let monotone = [
            CorrectionMethod::Bonferroni,
            CorrectionMethod::Sidak,
            CorrectionMethod::Holm,
            CorrectionMethod::HolmSidak,
            CorrectionMethod::SimesHochberg,
            CorrectionMethod::Hommel,
            CorrectionMethod::FdrBh,
            CorrectionMethod::FdrBy,
        ];
        for n in [1, 2, 7, 50, 200] {
            let pvalues = random_pvalues(&mut rng, n);
            for method in CorrectionMethod::ALL {
                let outcome = method.apply(&pvalues, 0.05);
                assert_eq!(outcome.pvalues.len(), n);
                assert_eq!(outcome.reject.len(), n);
                for (&corrected, &raw) in outcome.pvalues.iter().zip(&pvalues) {
                    assert!((0.0..=1.0).contains(&corrected), "{method}: {corrected}");
                    if monotone.contains(&method) {
                        assert!(corrected >= raw - 1e-12, "{method}: {corrected} < {raw}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_holm_and_bh_non_decreasing_by_rank() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            let pvalues = random_pvalues(&mut rng, 40);
            let order = argsort(&pvalues);
            for method in [CorrectionMethod::Holm, CorrectionMethod::FdrBh] {
                let outcome = method.apply(&pvalues, 0.05);
                let ranked = select_indices(&order, &outcome.pvalues);
                for pair in ranked.windows(2) {
                    assert!(pair[1] >= pair[0] - 1e-12, "{method}: {pair:?}");
                }
            }
        }
    }

    #[test]
    fn test_reject_agrees_with_corrected_for_step_procedures() {
        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        let alpha = 0.05;
        for _ in 0..20 {
            let pvalues = random_pvalues(&mut rng, 30);
            for method in [
                CorrectionMethod::Bonferroni,
                CorrectionMethod::Holm,
                CorrectionMethod::FdrBh,
            ] {
                let outcome = method.apply(&pvalues, alpha);
                for (&corrected, &reject) in outcome.pvalues.iter().zip(&outcome.reject) {
                    if (corrected - alpha).abs() > 1e-12 {
                        assert_eq!(reject, corrected < alpha, "{method}: {corrected}");
                    }
                }
            }
        }
    }
}
