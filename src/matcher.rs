use std::fmt;

use serde::Deserialize;

use crate::*;

mod exact;
mod greedy;

pub use exact::{ExactMatcher, exact_match, assemble_cost_matrix, assemble_cost_matrix_parallel};
pub use greedy::{GreedyMatcher, greedy_match};

/// Assigns unidentified papers to candidate student IDs.
pub trait Matcher {
    /// Predicts an ID for papers in `papers`, drawing on the classifier output in `heatmaps`.
    fn predict( &self, papers: &[PaperNumber], candidates: &[StudentId], heatmaps: &Heatmaps ) -> Result<Vec<Prediction>>;
}

/// The available matching algorithms.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum )]
pub enum MatchingStrategy {
    /// best candidate per paper; candidates may repeat
    #[serde( rename = "greedy" )]
    #[value( name = "greedy" )]
    Greedy,
    /// optimal one-to-one linear assignment
    #[serde( rename = "lap" )]
    #[value( name = "lap" )]
    ExactAssignment,
}

impl MatchingStrategy {
    pub const ALL: [MatchingStrategy; 2] = [ MatchingStrategy::Greedy, MatchingStrategy::ExactAssignment ];

    /// File name the legacy tooling expects the predictions in
    pub fn output_filename( &self ) -> &'static str {
	match self {
	    MatchingStrategy::Greedy => "greedy_predictions.csv",
	    MatchingStrategy::ExactAssignment => "lap_predictions.csv",
	}
    }

    /// Builds the matcher for this strategy, honouring the cost settings in `config`.
    pub fn matcher( &self, config: &MatchConfig ) -> Result<Box<dyn Matcher>> {
	match self {
	    MatchingStrategy::Greedy => Ok( Box::new( GreedyMatcher::new() )),
	    MatchingStrategy::ExactAssignment => {
		let model = NegLogLikelihood::with_floor( config.probability_floor )?;
		Ok( Box::new( ExactMatcher::with_model( model ).parallel( config.parallel )))
	    },
	}
    }
}

impl fmt::Display for MatchingStrategy {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
	match self {
	    MatchingStrategy::Greedy => f.write_str( "greedy" ),
	    MatchingStrategy::ExactAssignment => f.write_str( "lap" ),
	}
    }
}
