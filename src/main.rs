use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use rustc_hash::FxHashMap;
use tracing::{info, warn, Level};
use tracing_subscriber::filter::LevelFilter;

use idmatch::{io, Loggable, MatchConfig, MatchingStrategy, Heatmaps, PaperNumber, Prediction, StudentId};
use idmatch::data::{remove_matched, readable_papers};

/// Run matching tools to generate ID predictions for unidentified papers.
#[derive( Parser, Debug )]
#[command( name = "auto_ider", version )]
struct Args {
    /// JSON file mapping paper numbers to digit probability matrices
    #[arg( long, default_value = "id_prob_heatmaps.json" )]
    heatmaps: PathBuf,

    /// Classlist CSV with an id column
    #[arg( long )]
    classlist: PathBuf,

    /// IDs already identified against a paper, one per line
    #[arg( long )]
    matched: Option<PathBuf>,

    /// Unidentified paper numbers, one per line [default: every paper in the heatmaps]
    #[arg( long )]
    unidentified: Option<PathBuf>,

    /// Directory for the prediction CSV files
    #[arg( long )]
    output_dir: Option<PathBuf>,

    /// Strategy to run; repeat for several [default: greedy and lap]
    #[arg( long = "strategy", value_enum )]
    strategies: Vec<MatchingStrategy>,

    /// JSON config file
    #[arg( long )]
    config: Option<PathBuf>,

    /// Build the cost matrix in parallel
    #[arg( long )]
    parallel: bool,

    /// Log per-paper details
    #[arg( short, long )]
    verbose: bool,
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    prepare_logging( args.verbose );

    let config = load_config( &args ).map_err( |err| err.to_string() )?;
    run_auto_iding( &args, &config ).map_err( |err| err.to_string() )?;
    info!( "Ran matching problems and saved results to CSV files in {}", config.output_dir.display() );
    Ok( () )
}

/// Config file first, command line flags on top
fn load_config( args: &Args ) -> idmatch::Result<MatchConfig> {
    let mut config = match &args.config {
	Some( path ) => MatchConfig::from_file( path )?,
	None => MatchConfig::default(),
    };
    if let Some( dir ) = &args.output_dir {
	config.output_dir = dir.clone();
    }
    if !args.strategies.is_empty() {
	config.strategies = args.strategies.clone();
    }
    config.parallel |= args.parallel;
    config.validate()?;
    Ok( config )
}

fn run_auto_iding( args: &Args, config: &MatchConfig ) -> idmatch::Result<()> {
    info!( "Getting the classlist" );
    let sids = io::read_classlist( &args.classlist )?;
    info!( "Getting probability heatmaps" );
    let heatmaps = io::read_heatmaps( &args.heatmaps )?;

    for strategy in &config.strategies {
	match strategy {
	    MatchingStrategy::Greedy => predict_id_greedy( &sids, &heatmaps, config )?,
	    MatchingStrategy::ExactAssignment => predict_id_lap_solver( args, &sids, &heatmaps, config )?,
	}
    }
    Ok( () )
}

/// Best fit in the whole classlist for every auto-read paper.
fn predict_id_greedy( sids: &[StudentId], heatmaps: &Heatmaps, config: &MatchConfig ) -> idmatch::Result<()> {
    let strategy = MatchingStrategy::Greedy;
    let papers: Vec<PaperNumber> = heatmaps.keys().copied().collect();
    let predictions = strategy.matcher( config )?.predict( &papers, sids, heatmaps )?;
    predictions.log( "greedy", Level::DEBUG );
    report_reused( &predictions );
    save( strategy, &predictions, config )
}

/// One-to-one assignment of the unidentified, auto-read papers to students not yet matched.
fn predict_id_lap_solver( args: &Args, sids: &[StudentId], heatmaps: &Heatmaps, config: &MatchConfig ) -> idmatch::Result<()> {
    let strategy = MatchingStrategy::ExactAssignment;
    info!( "Original class list has {} students", sids.len() );
    let unused = match &args.matched {
	Some( path ) => remove_matched( sids, &io::read_id_list( path )? ),
	None => sids.to_vec(),
    };

    let unidentified: Vec<PaperNumber> = match &args.unidentified {
	Some( path ) => io::read_paper_list( path )?,
	None => heatmaps.keys().copied().collect(),
    };
    info!( "Assignment problem: {} unidentified papers to match with {} unused names in the classlist",
	   unidentified.len(), unused.len() );

    let (papers, unread) = readable_papers( &unidentified, heatmaps );
    if unread > 0 {
	warn!( "{unread} papers were not autoread; have {} papers to match", papers.len() );
    }

    info!( "Building cost matrix and solving assignment problem..." );
    let start = Instant::now();
    let predictions = strategy.matcher( config )?.predict( &papers, &unused, heatmaps )?;
    info!( "done in {:.2} seconds", start.elapsed().as_secs_f64() );
    predictions.log( "lap", Level::DEBUG );
    save( strategy, &predictions, config )
}

/// Warns about students predicted for several papers
fn report_reused( predictions: &[Prediction] ) {
    let mut uses: FxHashMap<&StudentId, usize> = FxHashMap::default();
    for prediction in predictions {
	*uses.entry( &prediction.student_id ).or_insert( 0 ) += 1;
    }
    let reused = uses.values().filter( |count| **count > 1 ).count();
    if reused > 0 {
	warn!( "{reused} students are the greedy prediction for more than one paper" );
    }
}

fn save( strategy: MatchingStrategy, predictions: &[Prediction], config: &MatchConfig ) -> idmatch::Result<()> {
    let path = config.output_dir.join( strategy.output_filename() );
    io::write_predictions( &path, predictions )?;
    info!( "Wrote {} {strategy} predictions to {}", predictions.len(), path.display() );
    Ok( () )
}

fn prepare_logging( verbose: bool ) {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let tracer = tracing_subscriber::fmt::fmt()
        .with_max_level( level )
        .finish();
    if let Err( err ) = tracing::subscriber::set_global_default( tracer ) {
	eprintln!( "could not install logger: {err}" );
    }
}
