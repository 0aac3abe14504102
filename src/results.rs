use std::collections::{BTreeSet, HashSet};

use itertools::Itertools;

use crate::{
    correction::CorrectionMethod,
    error::{EnrichmentError, Result},
    record::TermResult,
    report,
    run::{EnrichmentRun, Label},
    significance::Direction,
};

/// Results of one study against an [`EnrichmentRun`]
///
/// Records are ordered by term. The population and association table are borrowed
/// from the run that produced the results.
#[derive(Debug, Clone)]
pub struct EnrichmentResults<'a, I, T> {
    run: &'a EnrichmentRun<I, T>,
    study_ids: BTreeSet<I>,
    records: Vec<TermResult<I, T>>,
}

impl<'a, I: Label, T: Label> EnrichmentResults<'a, I, T> {
    pub(crate) fn new(
        run: &'a EnrichmentRun<I, T>,
        study_ids: BTreeSet<I>,
        records: Vec<TermResult<I, T>>,
    ) -> Self {
        Self {
            run,
            study_ids,
            records,
        }
    }

    pub fn records(&self) -> &[TermResult<I, T>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Study identifiers found in the population
    pub fn study_ids(&self) -> &BTreeSet<I> {
        &self.study_ids
    }

    pub fn run(&self) -> &'a EnrichmentRun<I, T> {
        self.run
    }

    pub fn alpha(&self) -> f64 {
        self.run.config().alpha()
    }

    pub fn methods(&self) -> &[CorrectionMethod] {
        self.run.config().methods()
    }

    pub fn name(&self) -> Option<&str> {
        self.run.config().name()
    }

    pub fn population_size(&self) -> usize {
        self.run.population_size()
    }

    /// Records whose selected p-value is strictly below `max_p`
    ///
    /// `field` selects a corrected p-value, or the uncorrected one when `None`. The
    /// returned records are sorted by direction, then by uncorrected p-value.
    pub fn filter_by(
        &self,
        max_p: f64,
        field: Option<CorrectionMethod>,
    ) -> Result<Vec<&TermResult<I, T>>> {
        if let Some(method) = field {
            self.check_method(method)?;
        }
        Ok(self
            .records
            .iter()
            .filter(|record| record.pvalue(field).is_some_and(|p| p < max_p))
            .sorted_by(|a, b| {
                a.direction()
                    .cmp(&b.direction())
                    .then(a.pvalue_uncorrected().total_cmp(&b.pvalue_uncorrected()))
            })
            .collect())
    }

    /// Number of (enriched, purified) terms rejected at alpha by `method`
    pub fn significant_counts(&self, method: CorrectionMethod) -> Result<(usize, usize)> {
        self.check_method(method)?;
        let counts = self
            .records
            .iter()
            .filter(|record| {
                record
                    .multitest()
                    .get(method)
                    .is_some_and(|corrected| corrected.reject)
            })
            .counts_by(|record| record.direction());
        Ok((
            counts.get(&Direction::Enrichment).copied().unwrap_or(0),
            counts.get(&Direction::Purification).copied().unwrap_or(0),
        ))
    }

    /// Study identifiers found in the population and its associations, sorted
    pub fn found_ids(&self) -> Vec<&I> {
        self.study_ids.iter().collect()
    }

    /// Identifiers of `reference` absent from the association table, sorted
    pub fn not_found_ids<'r>(&self, reference: &'r HashSet<I>) -> Vec<&'r I> {
        let associations = self.run.associations();
        reference
            .iter()
            .filter(|id| !associations.contains_key(*id))
            .sorted()
            .collect()
    }

    /// Prints every record as a fixed-width table to stdout
    pub fn pprint(&self) {
        println!("{}", report::text_header(self.methods()));
        for record in &self.records {
            println!("{}", report::text_row(record, self.methods()));
        }
    }

    fn check_method(&self, method: CorrectionMethod) -> Result<()> {
        if self.methods().contains(&method) {
            Ok(())
        } else {
            Err(EnrichmentError::MethodNotRun(method.to_string()))
        }
    }
}
