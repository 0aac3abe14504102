use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
    hash::Hash,
};

use itertools::Itertools;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    config::{parse_methods, EnrichmentConfig},
    error::{EnrichmentError, Result},
    record::{CorrectedPValue, MultiTestRecord, PValueRecord, TermResult},
    results::EnrichmentResults,
    significance::hypergeometric_test,
    term_index::TermIndex,
    utils::{intersect, percent},
};

/// Identifier and term types accepted by an enrichment run
///
/// Implemented for every type that can be hashed, ordered and printed, which
/// covers strings and integers.
pub trait Label: Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display {}
impl<L> Label for L where L: Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display {}

/// An enrichment analysis against a fixed population
///
/// The population, its associations and its term index are built once and are
/// read-only afterwards, so any number of studies can be run against them.
#[derive(Debug, Clone)]
pub struct EnrichmentRun<I, T> {
    /// Population identifiers carrying at least one term
    pop_ids: HashSet<I>,
    /// Association table restricted to `pop_ids`
    associations: HashMap<I, HashSet<T>>,
    term_to_pop: TermIndex<I, T>,
    config: EnrichmentConfig,
}

impl<I: Label, T: Label> EnrichmentRun<I, T> {
    /// Builds a run from correction method names
    ///
    /// An empty `methods` list selects Benjamini-Hochberg. The minimum overlap is
    /// left at its default.
    pub fn new<S: AsRef<str>>(
        population_ids: HashSet<I>,
        associations: HashMap<I, HashSet<T>>,
        alpha: f64,
        methods: &[S],
    ) -> Result<Self> {
        let (pop_ids, associations) = restrict_population(population_ids, associations)?;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(EnrichmentError::InvalidAlpha(alpha));
        }
        let config = EnrichmentConfig::builder()
            .alpha(alpha)
            .methods(parse_methods(methods)?)
            .build()
            .validate()?;
        Ok(Self::from_parts(pop_ids, associations, config))
    }

    /// Builds a run from a prepared configuration
    pub fn with_config(
        population_ids: HashSet<I>,
        associations: HashMap<I, HashSet<T>>,
        config: EnrichmentConfig,
    ) -> Result<Self> {
        let (pop_ids, associations) = restrict_population(population_ids, associations)?;
        let config = config.validate()?;
        Ok(Self::from_parts(pop_ids, associations, config))
    }

    fn from_parts(
        pop_ids: HashSet<I>,
        associations: HashMap<I, HashSet<T>>,
        config: EnrichmentConfig,
    ) -> Self {
        let term_to_pop = TermIndex::build(&pop_ids, &associations);
        info!(
            "Population of {} IDs annotated with {} terms; methods: {}",
            pop_ids.len(),
            term_to_pop.len(),
            config.methods().iter().join(",")
        );
        Self {
            pop_ids,
            associations,
            term_to_pop,
            config,
        }
    }

    /// Runs the enrichment of `study_ids` against the population
    ///
    /// The study is reduced to the identifiers found in the population. Every term
    /// of the population is tested, and its p-value is corrected by every method
    /// of the run. An empty study yields empty results.
    pub fn run_study(&self, study_ids: &HashSet<I>) -> Result<EnrichmentResults<'_, I, T>> {
        if study_ids.is_empty() {
            return Ok(EnrichmentResults::new(self, Default::default(), Vec::new()));
        }

        let study_in_pop = self.study_in_population(study_ids)?;
        let term_to_study = TermIndex::build(&study_in_pop, &self.associations);

        let pvals = self.pvalues_uncorrected(&term_to_study, study_in_pop.len())?;
        let multitests = self.multitest_correction(&pvals);

        let records = pvals
            .into_iter()
            .zip(multitests)
            .map(|((term, pval), multitest)| {
                let study_items = members(term_to_study.ids(&term));
                let pop_items = members(self.term_to_pop.ids(&term));
                TermResult::new(term, pval, multitest, study_items, pop_items)
            })
            .collect::<Vec<_>>();

        let results = EnrichmentResults::new(self, study_in_pop.into_iter().collect(), records);
        self.log_significant(&results);
        Ok(results)
    }

    /// Runs independent studies against the population in parallel
    ///
    /// Results are returned in the order of `studies`.
    pub fn run_studies(&self, studies: &[HashSet<I>]) -> Vec<Result<EnrichmentResults<'_, I, T>>>
    where
        I: Send + Sync,
        T: Send + Sync,
    {
        studies
            .par_iter()
            .map(|study_ids| self.run_study(study_ids))
            .collect()
    }

    /// Population identifiers that carry at least one term
    pub fn pop_ids(&self) -> &HashSet<I> {
        &self.pop_ids
    }

    pub fn population_size(&self) -> usize {
        self.pop_ids.len()
    }

    /// The association table restricted to the population
    pub fn associations(&self) -> &HashMap<I, HashSet<T>> {
        &self.associations
    }

    pub fn term_index(&self) -> &TermIndex<I, T> {
        &self.term_to_pop
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Returns the study identifiers within the population
    ///
    /// Refuses studies that are larger than the population or that overlap it by
    /// less than the configured minimum.
    fn study_in_population(&self, study_ids: &HashSet<I>) -> Result<HashSet<I>> {
        let pop_total = self.pop_ids.len();
        if study_ids.len() > pop_total {
            return Err(EnrichmentError::StudyLargerThanPopulation {
                study: study_ids.len(),
                population: pop_total,
            });
        }

        let study_in_pop = intersect(study_ids, &self.pop_ids);
        info!(
            "{:3.0}% {:>6} of {:>6} study IDs found in population and association",
            percent(study_in_pop.len(), study_ids.len()),
            study_in_pop.len(),
            study_ids.len()
        );

        let overlap = study_in_pop.len() as f64 / study_ids.len() as f64;
        if study_in_pop.is_empty() || overlap < self.config.min_overlap() {
            return Err(EnrichmentError::InsufficientOverlap {
                found: study_in_pop.len(),
                total: study_ids.len(),
                overlap,
                required: self.config.min_overlap(),
            });
        }
        Ok(study_in_pop)
    }

    /// Calculates one uncorrected p-value per term, in term order
    ///
    /// Terms found in either the study or the population are tested.
    fn pvalues_uncorrected(
        &self,
        term_to_study: &TermIndex<I, T>,
        study_total: usize,
    ) -> Result<Vec<(T, PValueRecord)>> {
        let pop_total = self.pop_ids.len();
        let all_terms = term_to_study
            .terms()
            .chain(self.term_to_pop.terms())
            .unique()
            .sorted()
            .cloned()
            .collect::<Vec<_>>();
        info!(
            "Calculating {} uncorrected p-values using the hypergeometric test",
            all_terms.len()
        );

        all_terms
            .into_iter()
            .map(|term| {
                let study_count = term_to_study.count(&term);
                let pop_count = self.term_to_pop.count(&term);
                let (pvalue, direction) =
                    hypergeometric_test(study_count, study_total, pop_count, pop_total)?;
                debug!("Term:{}\tStudy: {}/{}", term, study_count, study_total);
                let record = PValueRecord::new(
                    study_count,
                    study_total,
                    pop_count,
                    pop_total,
                    pvalue,
                    direction,
                );
                Ok((term, record))
            })
            .collect()
    }

    /// Applies every configured correction to the full vector of uncorrected p-values
    fn multitest_correction(&self, pvals: &[(T, PValueRecord)]) -> Vec<MultiTestRecord> {
        let uncorrected = pvals.iter().map(|(_, r)| r.pvalue).collect::<Vec<_>>();
        let outcomes = self
            .config
            .methods()
            .iter()
            .map(|method| (*method, method.apply(&uncorrected, self.config.alpha())))
            .collect::<Vec<_>>();

        (0..uncorrected.len())
            .map(|i| {
                let corrected = outcomes
                    .iter()
                    .map(|(method, outcome)| {
                        CorrectedPValue::new(*method, outcome.pvalues[i], outcome.reject[i])
                    })
                    .collect();
                MultiTestRecord::new(corrected)
            })
            .collect()
    }

    fn log_significant(&self, results: &EnrichmentResults<'_, I, T>) {
        for method in self.config.methods() {
            let Ok((enriched, purified)) = results.significant_counts(*method) else {
                continue;
            };
            info!(
                "{:8} terms ({:3} enriched + {:3} purified) found significant with alpha({}): {}",
                enriched + purified,
                enriched,
                purified,
                self.config.alpha(),
                method
            );
        }
    }
}

/// Reduces the population to the identifiers that carry at least one term
///
/// Returns the reduced population and the association table restricted to it.
fn restrict_population<I: Label, T: Label>(
    population_ids: HashSet<I>,
    associations: HashMap<I, HashSet<T>>,
) -> Result<(HashSet<I>, HashMap<I, HashSet<T>>)> {
    if population_ids.is_empty() {
        return Err(EnrichmentError::EmptyPopulation);
    }
    if associations.is_empty() {
        return Err(EnrichmentError::EmptyAssociations);
    }

    let associations = associations
        .into_iter()
        .filter(|(id, terms)| !terms.is_empty() && population_ids.contains(id))
        .collect::<HashMap<_, _>>();
    let pop_ids = associations.keys().cloned().collect::<HashSet<_>>();
    info!(
        "{:3.0}% {:>6} of {:>6} population IDs found in association",
        percent(pop_ids.len(), population_ids.len()),
        pop_ids.len(),
        population_ids.len()
    );

    if pop_ids.is_empty() {
        return Err(EnrichmentError::NoPopulationInAssociations {
            population: population_ids.len(),
        });
    }
    Ok((pop_ids, associations))
}

fn members<I: Label>(ids: Option<&HashSet<I>>) -> BTreeSet<I> {
    ids.map(|ids| ids.iter().cloned().collect())
        .unwrap_or_default()
}
