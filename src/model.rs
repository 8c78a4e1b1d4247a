use crate::*;

mod likelihood;

/// Smallest probability the cost model will take the logarithm of.
pub const PROBABILITY_FLOOR: f64 = 1e-30;

/// Scores how poorly a candidate ID explains a paper's digit probabilities.
pub trait CostModel {
    /// Returns the cost of assigning the candidate to the paper; lower is better.
    fn cost( &self, candidate: &StudentId, matrix: &ProbabilityMatrix ) -> Result<f64>;
}

pub use likelihood::{NegLogLikelihood, log_likelihood_cost, mean_digit_probability};
