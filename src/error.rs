use thiserror::Error;

use crate::data::PaperNumber;

/// Everything that can go wrong while matching papers to students.
///
/// The matching variants are kept apart so a caller can skip a single paper on
/// `LengthMismatch` but abort the batch on `DegenerateAssignment`.
#[derive( Error, Debug )]
pub enum Error {
    /// Candidate ID and probability matrix disagree on the number of digits
    #[error( "student ID {candidate} has {id_length} digits but the probability matrix has {matrix_length} positions" )]
    LengthMismatch {
	candidate: String,
	id_length: usize,
	matrix_length: usize,
    },

    /// A matcher was given nothing to compare
    #[error( "nothing to match: {papers} papers and {candidates} candidate IDs" )]
    DegenerateInput { papers: usize, candidates: usize },

    /// The assignment problem has no rows or no columns
    #[error( "Assignment problem is degenerate: {papers} unidentified machine-read papers and {candidates} unused students." )]
    DegenerateAssignment { papers: usize, candidates: usize },

    #[error( "invalid student ID {0:?}: expected a non-empty string of decimal digits" )]
    InvalidStudentId(String),

    #[error( "no probabilities for paper {0}" )]
    MissingProbabilities(PaperNumber),

    #[error( "paper {paper}, digit {position}: probability {value} is outside [0, 1]" )]
    InvalidProbability { paper: PaperNumber, position: usize, value: f64 },

    /// NaN or negative infinity in a cost matrix
    #[error( "cost matrix entry ({row}, {col}) is {value}" )]
    InvalidCost { row: usize, col: usize, value: f64 },

    #[error( "cost matrix admits no complete assignment of finite cost" )]
    Infeasible,

    #[error( "configuration error: {0}" )]
    Config(String),

    #[error( "parse error: {0}" )]
    Parse(String),

    #[error( "file I/O error: {0}" )]
    Io(#[from] std::io::Error),

    #[error( "JSON error: {0}" )]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type using the matching Error
pub type Result<T> = std::result::Result<T, Error>;
