use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::*;

/// Settings of a matching run. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive( Debug, Clone, PartialEq, Deserialize )]
#[serde( default, deny_unknown_fields )]
pub struct MatchConfig {
    /// probabilities below this are clamped before taking logarithms
    pub probability_floor: f64,
    /// assemble the cost matrix on the rayon thread pool
    pub parallel: bool,
    /// strategies to run, in order
    pub strategies: Vec<MatchingStrategy>,
    /// where prediction files are written
    pub output_dir: PathBuf,
}

impl Default for MatchConfig {
    fn default() -> MatchConfig {
	MatchConfig {
	    probability_floor: PROBABILITY_FLOOR,
	    parallel: false,
	    strategies: MatchingStrategy::ALL.to_vec(),
	    output_dir: PathBuf::from( "." ),
	}
    }
}

impl MatchConfig {
    /// Reads a JSON config file and validates it.
    pub fn from_file<P: AsRef<Path>>( path: P ) -> Result<MatchConfig> {
	let file = File::open( path.as_ref() )?;
	let config: MatchConfig = serde_json::from_reader( BufReader::new( file ))?;
	config.validate()?;
	Ok( config )
    }

    pub fn validate( &self ) -> Result<()> {
	NegLogLikelihood::with_floor( self.probability_floor )?;
	if self.strategies.is_empty() {
	    return Err( Error::Config( "no matching strategy selected".to_string() ));
	}
	Ok( () )
    }
}
