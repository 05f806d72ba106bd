//! Domain errors raised by the aggregation and scoring stages.

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A category table has rows but lacks one of the region key columns.
    #[error("{category} table has no `{column}` column (found: {found:?})")]
    MissingKeyColumn {
        category: String,
        column: &'static str,
        found: Vec<String>,
    },

    /// A declared count field is not present in the category header.
    #[error("{category} table has no declared count field `{field}`")]
    UnknownCountField { category: String, field: String },

    /// A declared count field holds a value that does not parse as a number.
    #[error("{category} count field `{field}` holds non-numeric value {value:?}")]
    NonNumericCountField {
        category: String,
        field: String,
        value: String,
    },

    /// Z-scores are undefined when the intensity spread is zero or cannot be estimated.
    #[error("update intensity spread is degenerate over {count} region(s) (std = {std})")]
    DegenerateSpread { count: usize, std: f64 },

    #[error(transparent)]
    Frame(#[from] PolarsError),
}
