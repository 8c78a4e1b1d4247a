use std::time::Instant;

use rayon::prelude::*;

use crate::*;
use crate::lap::linear_sum_assignment;

use super::Matcher;

/// Globally cheapest one-to-one assignment of papers to candidates.
///
/// Every (paper, candidate) pair is scored by the cost model and the
/// rectangular assignment problem is solved exactly. When sizes differ only
/// `min(papers, candidates)` pairs are matched.
#[derive( Debug, Clone )]
pub struct ExactMatcher<C = NegLogLikelihood> {
    model: C,
    /// build cost matrix rows on the rayon pool
    parallel: bool,
}

impl<C: CostModel + Sync> Matcher for ExactMatcher<C> {
    fn predict( &self, papers: &[PaperNumber], candidates: &[StudentId], heatmaps: &Heatmaps ) -> Result<Vec<Prediction>> {
	if papers.is_empty() || candidates.is_empty() {
	    return Err( Error::DegenerateAssignment { papers: papers.len(), candidates: candidates.len() });
	}

	let _span = info_span!( "lap", papers = papers.len(), candidates = candidates.len() ).entered();
	let start = Instant::now();
	let costs = if self.parallel {
	    assemble_cost_matrix_parallel( &self.model, papers, candidates, heatmaps )?
	} else {
	    assemble_cost_matrix( &self.model, papers, candidates, heatmaps )?
	};
	costs.log( "cost row", Level::TRACE );

	let assignment = linear_sum_assignment( &costs )?;
	debug!( "Assignment of total cost {:.3} found in {}ms", costs.total( &assignment ), start.elapsed().as_millis() );

	let mut predictions = Vec::with_capacity( assignment.len() );
	for (row, col) in assignment {
	    let paper = papers[ row ];
	    let student_id = &candidates[ col ];
	    let certainty = mean_digit_probability( student_id, lookup( heatmaps, paper )? )?;
	    predictions.push( Prediction::new( paper, student_id.clone(), certainty ));
	}
	Ok( predictions )
    }
}

impl ExactMatcher<NegLogLikelihood> {
    pub fn new() -> ExactMatcher<NegLogLikelihood> {
	ExactMatcher::with_model( NegLogLikelihood::new() )
    }
}

impl Default for ExactMatcher<NegLogLikelihood> {
    fn default() -> Self {
	ExactMatcher::new()
    }
}

impl<C: CostModel> ExactMatcher<C> {
    pub fn with_model( model: C ) -> ExactMatcher<C> {
	ExactMatcher { model, parallel: false }
    }

    pub fn parallel( mut self, parallel: bool ) -> ExactMatcher<C> {
	self.parallel = parallel;
	self
    }
}

/// Optimal one-to-one predictions under the negative log-likelihood cost.
pub fn exact_match( paper_ids: &[PaperNumber], candidates: &[StudentId], probabilities: &Heatmaps ) -> Result<Vec<Prediction>> {
    ExactMatcher::new().predict( paper_ids, candidates, probabilities )
}

/// Cost of every (paper, candidate) pair, papers as rows.
pub fn assemble_cost_matrix <C: CostModel> ( model: &C, papers: &[PaperNumber], candidates: &[StudentId], heatmaps: &Heatmaps ) -> Result<CostMatrix> {
    let mut costs = Vec::with_capacity( papers.len() * candidates.len() );
    for paper in papers {
	let matrix = lookup( heatmaps, *paper )?;
	for candidate in candidates {
	    costs.push( model.cost( candidate, matrix )? );
	}
    }
    CostMatrix::new( papers.len(), candidates.len(), costs )
}

/// Same matrix as [`assemble_cost_matrix`], one rayon task per paper.
pub fn assemble_cost_matrix_parallel <C: CostModel + Sync> ( model: &C, papers: &[PaperNumber], candidates: &[StudentId], heatmaps: &Heatmaps ) -> Result<CostMatrix> {
    let rows: Vec<Vec<f64>> = papers.par_iter()
	.map( |paper| {
	    let matrix = lookup( heatmaps, *paper )?;
	    candidates.iter()
		.map( |candidate| model.cost( candidate, matrix ))
		.collect::<Result<Vec<f64>>>()
	}).collect::<Result<Vec<Vec<f64>>>>()?;
    CostMatrix::new( papers.len(), candidates.len(), rows.into_iter().flatten().collect() )
}

fn lookup( heatmaps: &Heatmaps, paper: PaperNumber ) -> Result<&ProbabilityMatrix> {
    heatmaps.get( &paper ).ok_or( Error::MissingProbabilities( paper ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::matcher::greedy_match;
    use rustc_hash::FxHashSet;

    fn ids( raw: &[&str] ) -> Vec<StudentId> {
	raw.iter().map( |s| StudentId::parse( s ).unwrap() ).collect()
    }

    fn single_digit( probabilities: &[(usize, f64)] ) -> ProbabilityMatrix {
	let mut position = [0.0; 10];
	for &(digit, p) in probabilities {
	    position[ digit ] = p;
	}
	ProbabilityMatrix::new( vec!( position ))
    }

    #[test]
    /// Greedy would give papers 1 and 2 the same student; the optimum is unique
    fn test_known_optimum() {
	let candidates = ids( &[ "1", "2", "3" ] );
	let mut heatmaps = Heatmaps::new();
	heatmaps.insert( 1, single_digit( &[ (1, 0.6), (2, 0.3), (3, 0.1) ] ));
	heatmaps.insert( 2, single_digit( &[ (1, 0.5), (2, 0.4), (3, 0.1) ] ));
	heatmaps.insert( 3, single_digit( &[ (1, 0.4), (2, 0.1), (3, 0.5) ] ));

	let predictions = exact_match( &[ 1, 2, 3 ], &candidates, &heatmaps ).unwrap();
	let pairs: Vec<(PaperNumber, &str)> = predictions.iter().map( |p| (p.paper, p.student_id.as_str()) ).collect();
	assert_eq!( pairs, vec!( (1, "1"), (2, "2"), (3, "3") ));
	assert_approx!( predictions[ 1 ].certainty, 0.4, 1e-12 );

	let greedy = greedy_match( &heatmaps, &candidates ).unwrap();
	assert_eq!( greedy[ 1 ].student_id.as_str(), "1" );
    }

    #[test]
    fn test_more_candidates_than_papers() {
	let candidates = ids( &[ "1111", "2222", "3333", "4444", "5555" ] );
	let mut heatmaps = Heatmaps::new();
	// both papers look most like 3333
	heatmaps.insert( 10, ProbabilityMatrix::new( vec!( {
	    let mut p = [0.02; 10]; p[ 3 ] = 0.8; p[ 4 ] = 0.1; p
	}; 4 )));
	heatmaps.insert( 11, ProbabilityMatrix::new( vec!( {
	    let mut p = [0.02; 10]; p[ 3 ] = 0.7; p[ 5 ] = 0.2; p
	}; 4 )));

	let predictions = exact_match( &[ 10, 11 ], &candidates, &heatmaps ).unwrap();
	assert_eq!( predictions.len(), 2 );
	let distinct: FxHashSet<&StudentId> = predictions.iter().map( |p| &p.student_id ).collect();
	assert_eq!( distinct.len(), 2 );

	let greedy = greedy_match( &heatmaps, &candidates ).unwrap();
	assert_eq!( greedy[ 0 ].student_id, greedy[ 1 ].student_id );
    }

    #[test]
    fn test_more_papers_than_candidates() {
	let candidates = ids( &[ "7" ] );
	let mut heatmaps = Heatmaps::new();
	heatmaps.insert( 1, single_digit( &[ (7, 0.2) ] ));
	heatmaps.insert( 2, single_digit( &[ (7, 0.9) ] ));
	heatmaps.insert( 3, single_digit( &[ (7, 0.5) ] ));

	let predictions = exact_match( &[ 1, 2, 3 ], &candidates, &heatmaps ).unwrap();
	assert_eq!( predictions, vec!( Prediction::new( 2, candidates[ 0 ].clone(), 0.9 )));
    }

    #[test]
    fn test_concrete_scenario() {
	let candidates = ids( &[ "12345678", "87654321" ] );
	let positions = ( 0 .. 8 ).map( |i| {
	    let mut position = [0.0; 10];
	    position[ i + 1 ] = 0.9;
	    position[ 8 - i ] = 0.01;
	    position
	}).collect();
	let mut heatmaps = Heatmaps::new();
	heatmaps.insert( 1, ProbabilityMatrix::new( positions ));

	let predictions = exact_match( &[ 1 ], &candidates, &heatmaps ).unwrap();
	assert_eq!( predictions.len(), 1 );
	assert_eq!( predictions[ 0 ].student_id.as_str(), "12345678" );
	assert_approx!( predictions[ 0 ].certainty, 0.9, 1e-9 );
    }

    #[test]
    fn test_degenerate_assignment() {
	let mut heatmaps = Heatmaps::new();
	heatmaps.insert( 1, single_digit( &[ (1, 0.5) ] ));
	assert!( matches!( exact_match( &[], &ids( &[ "123" ] ), &heatmaps ), Err( Error::DegenerateAssignment { papers: 0, candidates: 1 } )));
	assert!( matches!( exact_match( &[ 1 ], &[], &heatmaps ), Err( Error::DegenerateAssignment { papers: 1, candidates: 0 } )));
    }

    #[test]
    fn test_missing_probabilities() {
	let mut heatmaps = Heatmaps::new();
	heatmaps.insert( 1, single_digit( &[ (1, 0.5) ] ));
	assert!( matches!( exact_match( &[ 1, 2 ], &ids( &[ "1", "2" ] ), &heatmaps ), Err( Error::MissingProbabilities( 2 ))));
    }

    #[test]
    fn test_zero_probability_still_matches() {
	let candidates = ids( &[ "12", "34" ] );
	let mut heatmaps = Heatmaps::new();
	let mut first = [0.0; 10];
	first[ 3 ] = 0.9;
	let mut second = [0.0; 10];
	second[ 4 ] = 0.9;
	let mut leading_one = [0.0; 10];
	leading_one[ 1 ] = 0.5;
	// no candidate is possible for any paper without the floor
	heatmaps.insert( 1, ProbabilityMatrix::new( vec!( first, [0.0; 10] )));
	heatmaps.insert( 2, ProbabilityMatrix::new( vec!( leading_one, second )));

	let predictions = exact_match( &[ 1, 2 ], &candidates, &heatmaps ).unwrap();
	assert_eq!( predictions.len(), 2 );
	assert_eq!( predictions[ 0 ].student_id.as_str(), "34" );
	assert_approx!( predictions[ 0 ].certainty, 0.45, 1e-12 );
    }

    #[test]
    fn test_parallel_matrix_matches_sequential() {
	let candidates = ids( &[ "105", "250", "399", "481", "512" ] );
	let mut heatmaps = Heatmaps::new();
	for paper in 1 ..= 7 {
	    let positions = ( 0 .. 3 ).map( |i| {
		let mut position = [0.01; 10];
		position[ ( paper as usize * 3 + i ) % 10 ] = 0.6;
		position
	    }).collect();
	    heatmaps.insert( paper, ProbabilityMatrix::new( positions ));
	}
	let papers: Vec<PaperNumber> = heatmaps.keys().copied().collect();
	let model = NegLogLikelihood::new();

	let sequential = assemble_cost_matrix( &model, &papers, &candidates, &heatmaps ).unwrap();
	let parallel = assemble_cost_matrix_parallel( &model, &papers, &candidates, &heatmaps ).unwrap();
	assert_eq!( sequential, parallel );
	assert_eq!( sequential.get( 2, 4 ), log_likelihood_cost( &candidates[ 4 ], &heatmaps[ &3 ] ).unwrap() );

	let matcher = ExactMatcher::new().parallel( true );
	assert_eq!(
	    matcher.predict( &papers, &candidates, &heatmaps ).unwrap(),
	    exact_match( &papers, &candidates, &heatmaps ).unwrap()
	);
    }

    #[test]
    fn test_deterministic() {
	let candidates = ids( &[ "1", "2", "3", "4" ] );
	let mut heatmaps = Heatmaps::new();
	for paper in 1 ..= 4 {
	    heatmaps.insert( paper, single_digit( &[ (1, 0.25), (2, 0.25), (3, 0.25), (4, 0.25) ] ));
	}
	let papers = [ 1, 2, 3, 4 ];
	let first = exact_match( &papers, &candidates, &heatmaps ).unwrap();
	assert_eq!( first, exact_match( &papers, &candidates, &heatmaps ).unwrap() );
	let distinct: FxHashSet<&StudentId> = first.iter().map( |p| &p.student_id ).collect();
	assert_eq!( distinct.len(), 4 );
    }
}
