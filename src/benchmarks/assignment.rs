use tracing::{info, debug};

use clap::Parser;
use rand::prelude::*;
use rand::rngs::StdRng;
use rustc_hash::{FxHashMap, FxHashSet};
use statrs::distribution::{Beta, DiscreteUniform};

use std::time::*;

use idmatch::{exact_match, greedy_match, Heatmaps, PaperNumber, Prediction, ProbabilityMatrix, StudentId, DigitProbabilities};

/// Times greedy and exact matching on a synthetic class.
#[derive( Parser, Debug )]
#[command( name = "lap_bench" )]
struct Args {
    /// students in the classlist
    #[arg( long, default_value_t = 400 )]
    students: usize,
    /// scanned papers, each written by a distinct student
    #[arg( long, default_value_t = 300 )]
    papers: usize,
    /// digits per student ID
    #[arg( long, default_value_t = 8 )]
    digits: usize,
    #[arg( long, default_value_t = 1 )]
    seed: u64,
}

fn main() -> Result<(), String> {
    prepare_logging();
    let args = Args::parse();
    if args.papers > args.students {
	return Err( format!( "cannot have {} papers written by {} students", args.papers, args.students ));
    }

    let mut gen = StdRng::seed_from_u64( args.seed );
    let classlist = generate_classlist( &mut gen, args.students, args.digits )?;
    let (heatmaps, truth) = generate_heatmaps( &mut gen, &classlist, args.papers )?;
    let papers: Vec<PaperNumber> = heatmaps.keys().copied().collect();
    info!( "Generated {} students and {} papers with {}-digit IDs", classlist.len(), papers.len(), args.digits );

    let start = Instant::now();
    let greedy = greedy_match( &heatmaps, &classlist ).map_err( |err| err.to_string() )?;
    info!( "greedy took {}ms", start.elapsed().as_millis() );
    report( "greedy", &greedy, &truth );

    let start = Instant::now();
    let exact = exact_match( &papers, &classlist, &heatmaps ).map_err( |err| err.to_string() )?;
    info!( "lap took {}ms", start.elapsed().as_millis() );
    report( "lap", &exact, &truth );

    Result::Ok( () )
}

/// Distinct random IDs of the given length
fn generate_classlist( gen: &mut StdRng, students: usize, digits: usize ) -> Result<Vec<StudentId>, String> {
    let capacity = 10f64.powi( digits as i32 );
    if ( students as f64 ) > capacity / 2.0 {
	return Err( format!( "{students} students do not fit comfortably into {digits}-digit IDs" ));
    }
    let digit_distribution = DiscreteUniform::new( 0, 9 ).map_err( |err| err.to_string() )?;

    let mut seen = FxHashSet::default();
    let mut classlist = Vec::with_capacity( students );
    while classlist.len() < students {
	let text: String = ( 0 .. digits )
	    .map( |_| char::from( b'0' + digit_distribution.sample( gen ) as u8 ))
	    .collect();
	if seen.insert( text.clone() ) {
	    classlist.push( StudentId::parse( &text ).map_err( |err| err.to_string() )? );
	}
    }
    Ok( classlist )
}

/// Noisy classifier output for a random selection of students.
///
/// The true digit receives a Beta-distributed confidence; the rest of the
/// mass is spread at random over the other digits.
fn generate_heatmaps( gen: &mut StdRng, classlist: &[StudentId], papers: usize ) -> Result<(Heatmaps, FxHashMap<PaperNumber, StudentId>), String> {
    let confidence = Beta::new( 4.0, 2.0 ).map_err( |err| err.to_string() )?;
    let writers: Vec<&StudentId> = classlist.choose_multiple( gen, papers ).collect();

    let mut heatmaps = Heatmaps::new();
    let mut truth = FxHashMap::default();
    for (index, writer) in writers.into_iter().enumerate() {
	let paper = index as PaperNumber + 1;
	let positions: Vec<DigitProbabilities> = writer.digits()
	    .map( |digit| noisy_position( gen, &confidence, digit ))
	    .collect();
	heatmaps.insert( paper, ProbabilityMatrix::new( positions ));
	truth.insert( paper, writer.clone() );
    }
    Ok( (heatmaps, truth) )
}

fn noisy_position( gen: &mut StdRng, confidence: &Beta, digit: usize ) -> DigitProbabilities {
    let correct = confidence.sample( gen );
    let mut noise = [0.0; 10];
    for (value, weight) in noise.iter_mut().enumerate() {
	if value != digit {
	    *weight = gen.gen::<f64>();
	}
    }
    let total: f64 = noise.iter().sum();
    let mut position = [0.0; 10];
    for value in 0 .. 10 {
	position[ value ] = if value == digit { correct } else { ( 1.0 - correct ) * noise[ value ] / total };
    }
    position
}

fn report( name: &str, predictions: &[Prediction], truth: &FxHashMap<PaperNumber, StudentId> ) {
    let correct = predictions.iter()
	.filter( |p| truth.get( &p.paper ) == Some( &p.student_id ))
	.count();
    let distinct: FxHashSet<&StudentId> = predictions.iter().map( |p| &p.student_id ).collect();
    let mean_certainty = predictions.iter().map( |p| p.certainty ).sum::<f64>() / predictions.len().max( 1 ) as f64;
    debug!( "{name}: {} distinct students over {} predictions", distinct.len(), predictions.len() );
    info!( "{name}: {correct}/{} correct, {} students reused, mean certainty {mean_certainty:.3}",
	   predictions.len(), predictions.len() - distinct.len() );
}

fn prepare_logging() {
    let tracer = tracing_subscriber::fmt::fmt()
        .with_max_level( tracing_subscriber::filter::LevelFilter::INFO )
        .finish();
    if let Err( err ) = tracing::subscriber::set_global_default( tracer ) {
	eprintln!( "could not install logger: {err}" );
    }
}
