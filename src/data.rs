use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::*;

/// Paper (test) number as printed on the scanned booklet.
pub type PaperNumber = u32;
/// Probability of each digit value 0-9 at one position of the ID.
pub type DigitProbabilities = [f64; 10];
/// Digit-probability matrices keyed by paper, iterated in paper order.
pub type Heatmaps = BTreeMap<PaperNumber, ProbabilityMatrix>;

/// A student number made of decimal digits.
#[derive( Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize )]
#[serde( try_from = "String", into = "String" )]
pub struct StudentId( String );

/// Per-position digit probabilities of a single paper.
#[derive( Debug, Clone, PartialEq, Default, Serialize, Deserialize )]
#[serde( transparent )]
pub struct ProbabilityMatrix( Vec<DigitProbabilities> );

/// A predicted identity for one paper.
#[derive( Debug, Clone, PartialEq, Serialize )]
pub struct Prediction {
    #[serde( rename = "paper_num" )]
    pub paper: PaperNumber,
    #[serde( rename = "student_ID" )]
    pub student_id: StudentId,
    /// mean raw probability of the chosen digits
    pub certainty: f64,
}

impl StudentId {
    pub fn parse( text: &str ) -> Result<StudentId> {
	let text = text.trim();
	if text.is_empty() || !text.bytes().all( |b| b.is_ascii_digit() ) {
	    return Err( Error::InvalidStudentId( text.to_string() ));
	}
	Ok( StudentId( text.to_string() ))
    }

    pub fn as_str( &self ) -> &str {
	&self.0
    }

    /// Number of digits
    pub fn len( &self ) -> usize {
	self.0.len()
    }

    pub fn is_empty( &self ) -> bool {
	self.0.is_empty()
    }

    /// Digit values in reading order.
    pub fn digits<'a>( &'a self ) -> impl Iterator<Item = usize> + 'a {
	self.0.bytes().map( |b| ( b - b'0' ) as usize )
    }
}

impl FromStr for StudentId {
    type Err = Error;

    fn from_str( text: &str ) -> Result<StudentId> {
	StudentId::parse( text )
    }
}

impl TryFrom<String> for StudentId {
    type Error = Error;

    fn try_from( text: String ) -> Result<StudentId> {
	StudentId::parse( &text )
    }
}

impl From<StudentId> for String {
    fn from( id: StudentId ) -> String {
	id.0
    }
}

impl fmt::Display for StudentId {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
	f.write_str( &self.0 )
    }
}

impl ProbabilityMatrix {
    pub fn new( positions: Vec<DigitProbabilities> ) -> ProbabilityMatrix {
	ProbabilityMatrix( positions )
    }

    /// Number of digit positions
    pub fn len( &self ) -> usize {
	self.0.len()
    }

    pub fn is_empty( &self ) -> bool {
	self.0.is_empty()
    }

    pub fn positions( &self ) -> impl Iterator<Item = &DigitProbabilities> {
	self.0.iter()
    }

    /// Probabilities the matrix assigns to the candidate's digits, position by position.
    pub fn probabilities_of<'a>( &'a self, candidate: &'a StudentId ) -> Result<impl Iterator<Item = f64> + 'a> {
	if candidate.len() != self.len() {
	    return Err( Error::LengthMismatch {
		candidate: candidate.to_string(),
		id_length: candidate.len(),
		matrix_length: self.len(),
	    });
	}
	Ok( candidate.digits().zip( self.0.iter() ).map( |(digit, position)| position[ digit ] ))
    }

    /// Checks that every entry is a probability. Rows need not sum to one.
    pub fn validate( &self, paper: PaperNumber ) -> Result<()> {
	for (position, probabilities) in self.0.iter().enumerate() {
	    for value in probabilities {
		if !( 0.0 ..= 1.0 ).contains( value ) {
		    return Err( Error::InvalidProbability { paper, position, value: *value });
		}
	    }
	}
	Ok( () )
    }
}

impl Index<usize> for ProbabilityMatrix {
    type Output = DigitProbabilities;

    fn index( &self, position: usize ) -> &DigitProbabilities {
	&self.0[ position ]
    }
}

impl From<Vec<DigitProbabilities>> for ProbabilityMatrix {
    fn from( positions: Vec<DigitProbabilities> ) -> ProbabilityMatrix {
	ProbabilityMatrix( positions )
    }
}

impl Prediction {
    pub fn new( paper: PaperNumber, student_id: StudentId, certainty: f64 ) -> Prediction {
	Prediction { paper, student_id, certainty }
    }
}

impl fmt::Display for Prediction {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
	write!( f, "paper {} -> {} ({:.3})", self.paper, self.student_id, self.certainty )
    }
}

impl Loggable for [Prediction] {
    fn log( &self, message: &str, level: Level ) {
	for prediction in self {
	    log_line( level, message, &prediction.to_string() );
	}
    }
}

/// Drops IDs that are already matched against a paper. Unknown IDs are ignored.
///
/// Each matched ID removes only the first remaining copy from the candidates,
/// so a student listed twice in the classlist keeps one entry per extra listing.
pub fn remove_matched( candidates: &[StudentId], already_matched: &[StudentId] ) -> Vec<StudentId> {
    let mut pending: FxHashMap<&StudentId, usize> = FxHashMap::default();
    for id in already_matched {
	*pending.entry( id ).or_insert( 0 ) += 1;
    }
    candidates.iter()
	.filter( |id| match pending.get_mut( id ) {
	    Some( count ) if *count > 0 => {
		*count -= 1;
		false
	    },
	    _ => true,
	})
	.cloned()
	.collect()
}

/// Keeps the unidentified papers that were auto-read.
/// Returns them together with the number of papers that have no probabilities.
pub fn readable_papers( unidentified: &[PaperNumber], heatmaps: &Heatmaps ) -> (Vec<PaperNumber>, usize) {
    let papers: Vec<PaperNumber> = unidentified.iter()
	.copied()
	.filter( |paper| heatmaps.contains_key( paper ))
	.collect();
    let unread = unidentified.len() - papers.len();
    (papers, unread)
}
