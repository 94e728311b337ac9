use thiserror::Error;

/// Failures of the aggregation and change computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// A record's date could not be parsed to a calendar year.
    #[error("record {index}: cannot parse date '{date}' (expected format {format})")]
    InvalidDate {
        index: usize,
        date: String,
        format: String,
    },

    /// A record has an empty category.
    #[error("record {index}: empty category")]
    EmptyCategory { index: usize },

    /// The earlier-year total of a pair is zero.
    #[error("{category}: total for {year_from} is zero, change to {year_to} is undefined")]
    DivisionByZero {
        category: String,
        year_from: i32,
        year_to: i32,
    },

    /// A yearly sum left the exact decimal range.
    #[error("{category}: arithmetic overflow ({detail})")]
    Overflow { category: String, detail: String },

    /// The percentage change of a pair exceeds the decimal range.
    #[error("{category}: change from {year_from} to {year_to} exceeds decimal range")]
    ChangeOverflow {
        category: String,
        year_from: i32,
        year_to: i32,
    },

    /// No records were supplied.
    #[error("no transactions supplied")]
    EmptyInput,
}
