use thiserror::Error;

/// Errors raised while building an enrichment run or evaluating a study
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnrichmentError {
    #[error("no population identifiers were provided")]
    EmptyPopulation,

    #[error("the association table is empty")]
    EmptyAssociations,

    #[error("none of the {population} population identifiers carry an association")]
    NoPopulationInAssociations { population: usize },

    #[error("test-wise alpha must fall strictly between 0 and 1, got {0}")]
    InvalidAlpha(f64),

    #[error("minimum overlap must fall between 0 and 1, got {0}")]
    InvalidMinOverlap(f64),

    #[error("unrecognized correction method ({method})\n    Available methods:\n{available}")]
    UnknownMethod { method: String, available: String },

    #[error("correction method {0} was not part of this run")]
    MethodNotRun(String),

    #[error(
        "only {found} of {total} study identifiers were found in the population \
         ({overlap:.3} < minimum overlap {required})"
    )]
    InsufficientOverlap {
        found: usize,
        total: usize,
        overlap: f64,
        required: f64,
    },

    #[error("study set ({study} identifiers) is larger than the population ({population})")]
    StudyLargerThanPopulation { study: usize, population: usize },

    #[error("invalid hypergeometric parameters: {0}")]
    InvalidCounts(String),
}

pub type Result<T> = std::result::Result<T, EnrichmentError>;
