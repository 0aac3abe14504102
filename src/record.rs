use std::collections::BTreeSet;

use derive_new::new;

use crate::{correction::CorrectionMethod, significance::Direction};

/// Uncorrected significance of a single term
#[derive(Debug, Clone, Copy, PartialEq, new)]
pub struct PValueRecord {
    /// Study identifiers carrying the term
    pub study_count: usize,
    /// Study identifiers within the population
    pub study_total: usize,
    /// Population identifiers carrying the term
    pub pop_count: usize,
    /// Population size
    pub pop_total: usize,
    /// Uncorrected one-tailed hypergeometric p-value
    pub pvalue: f64,
    pub direction: Direction,
}

impl PValueRecord {
    pub fn study_ratio(&self) -> f64 {
        self.study_count as f64 / self.study_total as f64
    }

    pub fn pop_ratio(&self) -> f64 {
        self.pop_count as f64 / self.pop_total as f64
    }

    /// Ratio of the study ratio to the population ratio
    pub fn fold_enrichment(&self) -> f64 {
        if self.pop_count == 0 {
            return 0.0;
        }
        self.study_ratio() / self.pop_ratio()
    }
}

/// One corrected p-value of a term
#[derive(Debug, Clone, Copy, PartialEq, new)]
pub struct CorrectedPValue {
    pub method: CorrectionMethod,
    pub pvalue: f64,
    /// Whether the procedure rejects the null hypothesis at the run's alpha
    pub reject: bool,
}

/// Corrected p-values of a term, one per configured correction
#[derive(Debug, Clone, PartialEq, Default, new)]
pub struct MultiTestRecord {
    corrected: Vec<CorrectedPValue>,
}

impl MultiTestRecord {
    pub fn get(&self, method: CorrectionMethod) -> Option<&CorrectedPValue> {
        self.corrected.iter().find(|c| c.method == method)
    }

    pub fn pvalue(&self, method: CorrectionMethod) -> Option<f64> {
        self.get(method).map(|c| c.pvalue)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CorrectedPValue> {
        self.corrected.iter()
    }
}

/// Complete result of one term: its significance plus the identifiers behind it
#[derive(Debug, Clone, PartialEq, new)]
pub struct TermResult<I, T> {
    term: T,
    pval: PValueRecord,
    multitest: MultiTestRecord,
    study_items: BTreeSet<I>,
    pop_items: BTreeSet<I>,
}

impl<I, T> TermResult<I, T> {
    pub fn term(&self) -> &T {
        &self.term
    }

    pub fn pval(&self) -> &PValueRecord {
        &self.pval
    }

    pub fn multitest(&self) -> &MultiTestRecord {
        &self.multitest
    }

    /// Study identifiers carrying the term
    pub fn study_items(&self) -> &BTreeSet<I> {
        &self.study_items
    }

    /// Population identifiers carrying the term
    pub fn pop_items(&self) -> &BTreeSet<I> {
        &self.pop_items
    }

    pub fn pvalue_uncorrected(&self) -> f64 {
        self.pval.pvalue
    }

    pub fn direction(&self) -> Direction {
        self.pval.direction
    }

    /// Selects the uncorrected p-value when `field` is `None`, else the named correction
    pub fn pvalue(&self, field: Option<CorrectionMethod>) -> Option<f64> {
        match field {
            None => Some(self.pval.pvalue),
            Some(method) => self.multitest.pvalue(method),
        }
    }
}
