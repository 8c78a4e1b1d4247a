//! Automatic student-ID matching for scanned exam papers.
//!
//! A digit classifier produces, for every unidentified paper, a probability
//! for each digit value at each position of the handwritten ID. This crate
//! turns those heatmaps and a classlist into predictions, either greedily per
//! paper or as a globally optimal linear assignment.

#[cfg(test)]
macro_rules! assert_approx {
    ($real:expr, $expected:expr, $delta:expr) => {
	if $real < $expected - $delta || $real > $expected + $delta {
	    panic!( "Violate {:.4} == {:.4} (+-{:.4})", $real, $expected, $delta );
	}
    }
}

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod lap;
pub mod matcher;
pub mod model;

use tracing::*;

pub use config::MatchConfig;
pub use data::{PaperNumber, StudentId, DigitProbabilities, ProbabilityMatrix, Heatmaps, Prediction};
pub use error::{Error, Result};
pub use lap::CostMatrix;
pub use matcher::{Matcher, MatchingStrategy, GreedyMatcher, ExactMatcher, greedy_match, exact_match};
pub use model::{CostModel, NegLogLikelihood, log_likelihood_cost, mean_digit_probability, PROBABILITY_FLOOR};

/// Objects that can be recorded in the log
pub trait Loggable {
    fn log( &self, message: &str, level: tracing::Level );
}

/// Emits a single line at a level chosen at runtime.
pub(crate) fn log_line( level: Level, message: &str, line: &str ) {
    if level == Level::ERROR {
	error!( "{message}: {line}" );
    } else if level == Level::WARN {
	warn!( "{message}: {line}" );
    } else if level == Level::INFO {
	info!( "{message}: {line}" );
    } else if level == Level::DEBUG {
	debug!( "{message}: {line}" );
    } else {
	trace!( "{message}: {line}" );
    }
}
