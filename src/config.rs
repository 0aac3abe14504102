use bon::Builder;
use itertools::Itertools;

use crate::{
    correction::CorrectionMethod,
    error::{EnrichmentError, Result},
};

pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_METHOD: CorrectionMethod = CorrectionMethod::FdrBh;

/// Fraction of the study that must be found in the population
pub const DEFAULT_MIN_OVERLAP: f64 = 0.7;

/// Immutable settings of an enrichment run
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct EnrichmentConfig {
    /// Test-wise alpha used by the reject decisions of every correction
    #[builder(default = DEFAULT_ALPHA)]
    alpha: f64,
    /// Corrections applied to every study, in reporting order
    #[builder(default = vec![DEFAULT_METHOD])]
    methods: Vec<CorrectionMethod>,
    #[builder(default = DEFAULT_MIN_OVERLAP)]
    min_overlap: f64,
    /// Label carried into the results
    #[builder(into)]
    name: Option<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EnrichmentConfig {
    /// Checks the numeric bounds and normalizes the method list
    ///
    /// An empty method list falls back to Benjamini-Hochberg and repeated methods
    /// are kept once, at their first position.
    pub fn validate(mut self) -> Result<Self> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(EnrichmentError::InvalidAlpha(self.alpha));
        }
        if !(0.0..=1.0).contains(&self.min_overlap) {
            return Err(EnrichmentError::InvalidMinOverlap(self.min_overlap));
        }
        if self.methods.is_empty() {
            self.methods.push(DEFAULT_METHOD);
        }
        self.methods = self.methods.into_iter().unique().collect();
        Ok(self)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn methods(&self) -> &[CorrectionMethod] {
        &self.methods
    }

    pub fn min_overlap(&self) -> f64 {
        self.min_overlap
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Resolves method names against the correction registry
pub fn parse_methods<S: AsRef<str>>(names: &[S]) -> Result<Vec<CorrectionMethod>> {
    names.iter().map(|name| name.as_ref().parse()).collect()
}
