use statrs::statistics::Statistics;

use crate::*;

use super::{CostModel, PROBABILITY_FLOOR};

#[derive( Debug, Clone, Copy, PartialEq )]
/// Negative log-likelihood of a candidate under independent per-digit probabilities.
///
/// Probabilities below `floor` are raised to it, so a digit the classifier
/// rules out with certainty makes a candidate very expensive rather than
/// impossible.
pub struct NegLogLikelihood {
    floor: f64,
}

impl CostModel for NegLogLikelihood {
    fn cost( &self, candidate: &StudentId, matrix: &ProbabilityMatrix ) -> Result<f64> {
	let mut cost = 0.0;
	for probability in matrix.probabilities_of( candidate )? {
	    cost -= probability.max( self.floor ).ln();
	}
	Ok( cost )
    }
}

impl NegLogLikelihood {
    pub fn new() -> NegLogLikelihood {
	NegLogLikelihood { floor: PROBABILITY_FLOOR }
    }

    /// Uses a custom floor; it must lie in (0, 1].
    pub fn with_floor( floor: f64 ) -> Result<NegLogLikelihood> {
	if !( floor > 0.0 && floor <= 1.0 ) {
	    return Err( Error::Config( format!( "probability floor {floor} is outside (0, 1]" )));
	}
	Ok( NegLogLikelihood { floor } )
    }

    pub fn floor( &self ) -> f64 {
	self.floor
    }
}

impl Default for NegLogLikelihood {
    fn default() -> NegLogLikelihood {
	NegLogLikelihood::new()
    }
}

/// Approximately -log(prob) that the paper carries this ID, with the default floor.
pub fn log_likelihood_cost( candidate: &StudentId, matrix: &ProbabilityMatrix ) -> Result<f64> {
    NegLogLikelihood::new().cost( candidate, matrix )
}

/// Mean of the raw probabilities of the candidate's digits. Reported as certainty.
pub fn mean_digit_probability( candidate: &StudentId, matrix: &ProbabilityMatrix ) -> Result<f64> {
    Ok( matrix.probabilities_of( candidate )?.mean() )
}
