use crate::*;

use super::Matcher;

/// Picks, for every paper on its own, the candidate with the highest mean digit probability.
///
/// Papers are not coupled: the same student may be predicted for several
/// papers. Use [`ExactMatcher`] for a one-to-one assignment.
#[derive( Debug, Clone, Copy, Default )]
pub struct GreedyMatcher;

impl Matcher for GreedyMatcher {
    fn predict( &self, papers: &[PaperNumber], candidates: &[StudentId], heatmaps: &Heatmaps ) -> Result<Vec<Prediction>> {
	let selected = papers.iter().filter_map( |paper| match heatmaps.get( paper ) {
	    Some( matrix ) => Some( (*paper, matrix) ),
	    None => {
		warn!( "Paper {paper} was not auto-read; skipping it" );
		None
	    },
	});
	match_each( selected, candidates )
    }
}

impl GreedyMatcher {
    pub fn new() -> GreedyMatcher {
	GreedyMatcher
    }
}

/// Greedy predictions for every paper in `papers`, in map order.
pub fn greedy_match( papers: &Heatmaps, candidates: &[StudentId] ) -> Result<Vec<Prediction>> {
    match_each( papers.iter().map( |(paper, matrix)| (*paper, matrix) ), candidates )
}

fn match_each <'a, I> ( papers: I, candidates: &[StudentId] ) -> Result<Vec<Prediction>> where
    I: Iterator<Item = (PaperNumber, &'a ProbabilityMatrix)>,
{
    let papers: Vec<(PaperNumber, &ProbabilityMatrix)> = papers.collect();
    if papers.is_empty() || candidates.is_empty() {
	return Err( Error::DegenerateInput { papers: papers.len(), candidates: candidates.len() });
    }

    let _span = info_span!( "greedy", papers = papers.len(), candidates = candidates.len() ).entered();
    let mut predictions = Vec::with_capacity( papers.len() );
    for (paper, matrix) in papers {
	let (student_id, certainty) = best_candidate( matrix, candidates )?;
	trace!( "paper {paper}: best mean digit probability {certainty:.3} for {student_id}" );
	predictions.push( Prediction::new( paper, student_id.clone(), certainty ));
    }
    debug!( "Greedy matched {} papers", predictions.len() );
    Ok( predictions )
}

/// First candidate with the strictly largest mean digit probability
fn best_candidate <'c> ( matrix: &ProbabilityMatrix, candidates: &'c [StudentId] ) -> Result<(&'c StudentId, f64)> {
    let mut best: Option<(&StudentId, f64)> = None;
    for candidate in candidates {
	let mean = mean_digit_probability( candidate, matrix )?;
	match best {
	    Some( (_, top) ) if mean <= top => {},
	    _ => best = Some( (candidate, mean) ),
	}
    }
    best.ok_or( Error::DegenerateInput { papers: 1, candidates: 0 } )
}

#[cfg(test)]
mod test {
    use super::*;

    fn ids( raw: &[&str] ) -> Vec<StudentId> {
	raw.iter().map( |s| StudentId::parse( s ).unwrap() ).collect()
    }

    /// Matrix giving `high` to the digits of `favoured` and `low` to those of `other`.
    fn two_way_matrix( favoured: &str, high: f64, other: &str, low: f64 ) -> ProbabilityMatrix {
	let positions = favoured.bytes().zip( other.bytes() )
	    .map( |(f, o)| {
		let mut position = [0.0; 10];
		position[ ( o - b'0' ) as usize ] = low;
		position[ ( f - b'0' ) as usize ] = high;
		position
	    }).collect();
	ProbabilityMatrix::new( positions )
    }

    #[test]
    fn test_concrete_scenario() {
	let candidates = ids( &[ "12345678", "87654321" ] );
	let mut heatmaps = Heatmaps::new();
	heatmaps.insert( 1, two_way_matrix( "12345678", 0.9, "87654321", 0.01 ));

	let predictions = greedy_match( &heatmaps, &candidates ).unwrap();
	assert_eq!( predictions.len(), 1 );
	assert_eq!( predictions[ 0 ].paper, 1 );
	assert_eq!( predictions[ 0 ].student_id.as_str(), "12345678" );
	assert_approx!( predictions[ 0 ].certainty, 0.9, 1e-9 );
    }

    #[test]
    fn test_candidates_may_repeat() {
	let candidates = ids( &[ "11", "22", "33" ] );
	let mut heatmaps = Heatmaps::new();
	heatmaps.insert( 3, two_way_matrix( "22", 0.8, "11", 0.1 ));
	heatmaps.insert( 4, two_way_matrix( "22", 0.6, "33", 0.3 ));

	let predictions = greedy_match( &heatmaps, &candidates ).unwrap();
	let chosen: Vec<&str> = predictions.iter().map( |p| p.student_id.as_str() ).collect();
	assert_eq!( chosen, vec!( "22", "22" ));
	assert_eq!( predictions.iter().map( |p| p.paper ).collect::<Vec<_>>(), vec!( 3, 4 ));
    }

    #[test]
    fn test_ties_keep_first_candidate() {
	let mut position = [0.0; 10];
	position[ 1 ] = 0.5;
	position[ 2 ] = 0.5;
	let mut heatmaps = Heatmaps::new();
	heatmaps.insert( 1, ProbabilityMatrix::new( vec!( position )));

	let predictions = greedy_match( &heatmaps, &ids( &[ "2", "1" ] )).unwrap();
	assert_eq!( predictions[ 0 ].student_id.as_str(), "2" );
	let predictions = greedy_match( &heatmaps, &ids( &[ "1", "2" ] )).unwrap();
	assert_eq!( predictions[ 0 ].student_id.as_str(), "1" );
    }

    #[test]
    fn test_deterministic() {
	let candidates = ids( &[ "1234", "4321", "1111", "2222" ] );
	let mut heatmaps = Heatmaps::new();
	for paper in 1 .. 20 {
	    let mut positions = vec!( [0.05; 10]; 4 );
	    for (position, row) in positions.iter_mut().enumerate() {
		row[ ( paper as usize + position ) % 10 ] = 0.55;
	    }
	    heatmaps.insert( paper, ProbabilityMatrix::new( positions ));
	}
	assert_eq!( greedy_match( &heatmaps, &candidates ).unwrap(), greedy_match( &heatmaps, &candidates ).unwrap() );
    }

    #[test]
    fn test_degenerate_input() {
	let mut heatmaps = Heatmaps::new();
	heatmaps.insert( 1, two_way_matrix( "12", 0.9, "34", 0.1 ));
	assert!( matches!( greedy_match( &heatmaps, &[] ), Err( Error::DegenerateInput { candidates: 0, .. } )));
	assert!( matches!( greedy_match( &Heatmaps::new(), &ids( &[ "12" ] )), Err( Error::DegenerateInput { papers: 0, .. } )));
    }

    #[test]
    fn test_length_mismatch_propagates() {
	let mut heatmaps = Heatmaps::new();
	heatmaps.insert( 1, two_way_matrix( "12", 0.9, "34", 0.1 ));
	assert!( matches!( greedy_match( &heatmaps, &ids( &[ "12", "345" ] )), Err( Error::LengthMismatch { .. } )));
    }

    #[test]
    fn test_matcher_skips_unread_papers() {
	let mut heatmaps = Heatmaps::new();
	heatmaps.insert( 1, two_way_matrix( "12", 0.9, "34", 0.1 ));
	heatmaps.insert( 2, two_way_matrix( "34", 0.7, "12", 0.2 ));
	let candidates = ids( &[ "12", "34" ] );

	let predictions = GreedyMatcher::new().predict( &[ 2, 9 ], &candidates, &heatmaps ).unwrap();
	assert_eq!( predictions.len(), 1 );
	assert_eq!( predictions[ 0 ].paper, 2 );
	assert_eq!( predictions[ 0 ].student_id.as_str(), "34" );

	assert!( GreedyMatcher::new().predict( &[ 9 ], &candidates, &heatmaps ).is_err() );
    }
}
