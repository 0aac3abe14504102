use std::fmt;

use statrs::distribution::{DiscreteCDF, Hypergeometric};
use tracing::debug;

use crate::error::{EnrichmentError, Result};

/// Whether a term is over- or under-represented in the study
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Study ratio at or above the population ratio
    Enrichment,
    /// Study ratio below the population ratio
    Purification,
}

impl Direction {
    /// Single letter tag used in reports, `e` or `p`
    pub fn as_char(&self) -> char {
        match self {
            Direction::Enrichment => 'e',
            Direction::Purification => 'p',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Exact one-tailed hypergeometric test for a single term
///
/// Models drawing `study_total` identifiers without replacement from `pop_total`
/// identifiers, `pop_count` of which carry the term. Direction is chosen by
/// comparing `study_count / study_total` to `pop_count / pop_total`; equal ratios
/// are reported as enrichment.
///
/// * enrichment: `P(X >= study_count)`
/// * purification: `P(X <= study_count)`
pub fn hypergeometric_test(
    study_count: usize,
    study_total: usize,
    pop_count: usize,
    pop_total: usize,
) -> Result<(f64, Direction)> {
    if study_count > study_total || study_count > pop_count {
        return Err(EnrichmentError::InvalidCounts(format!(
            "{study_count} study hits out of {study_total} draws with {pop_count} population hits"
        )));
    }
    let hyper = Hypergeometric::new(pop_total as u64, pop_count as u64, study_total as u64)
        .map_err(|err| EnrichmentError::InvalidCounts(err.to_string()))?;

    // cross-multiplied to compare the ratios exactly
    let study_side = study_count as u128 * pop_total as u128;
    let pop_side = pop_count as u128 * study_total as u128;

    let (pvalue, direction) = if study_side >= pop_side {
        let pvalue = match study_count {
            0 => 1.0,
            // sf is P(X > x), so step back one to include the observation
            k => hyper.sf(k as u64 - 1),
        };
        (pvalue, Direction::Enrichment)
    } else {
        (hyper.cdf(study_count as u64), Direction::Purification)
    };

    debug!(
        "Population: {}, Successes: {}, Draws: {}, Observed: {}, p = {:.3e} ({})",
        pop_total, pop_count, study_total, study_count, pvalue, direction
    );
    Ok((pvalue.clamp(0.0, 1.0), direction))
}
