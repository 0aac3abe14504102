//! Overrep: over-representation analysis of annotation terms
//!
//! This library tests whether the annotation terms carried by a study set of
//! identifiers are over- or under-represented relative to a population, using an
//! exact one-tailed hypergeometric test per term followed by multiple-test
//! correction.
//!
//! The main components of this library are:
//! - `EnrichmentRun`: The population, its associations and term index, built once
//! - `EnrichmentConfig`: Alpha, correction methods and study overlap settings
//! - `CorrectionMethod`: The multiple-test correction procedures
//! - `EnrichmentResults`: Per-term records of one study with filtering queries
//! - `io` and `report`: Readers and writers for identifier lists, associations and results

mod config;
mod correction;
mod error;
pub mod io;
mod record;
pub mod report;
mod results;
mod run;
mod significance;
mod term_index;
mod utils;

pub use config::{parse_methods, EnrichmentConfig};
pub use correction::{CorrectionMethod, MultiTestOutcome};
pub use error::{EnrichmentError, Result};
pub use record::{CorrectedPValue, MultiTestRecord, PValueRecord, TermResult};
pub use results::EnrichmentResults;
pub use run::{EnrichmentRun, Label};
pub use significance::{hypergeometric_test, Direction};
pub use term_index::TermIndex;
