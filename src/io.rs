use std::collections::BTreeMap;
use std::path::Path;
use std::fs::{self, File};
use std::io::{BufReader, BufRead, Write};

use crate::*;

/// Header of the prediction files read by the identification tooling
pub const PREDICTION_HEADER: &str = "paper_num,student_ID,certainty";

/// Column names accepted for the ID column of a classlist, lowercase
const ID_COLUMNS: [&str; 4] = [ "id", "student_id", "studentnumber", "sid" ];

/// Converts a structure into a string
pub trait PrettyFormatter<T: ?Sized> {
    fn format_pretty( &self, object: &T ) -> String;
}

/// Formats predictions as CSV rows.
pub struct CsvFormatter {
    show_header: bool,
}

impl PrettyFormatter<[Prediction]> for CsvFormatter {
    fn format_pretty( &self, predictions: &[Prediction] ) -> String {
	let mut output = String::new();
	if self.show_header {
	    output = join_lines( output, PREDICTION_HEADER.to_string() );
	}
	predictions.iter()
	    .map( format_prediction )
	    .fold( output, join_lines )
    }
}

impl CsvFormatter {
    pub fn new() -> CsvFormatter {
	CsvFormatter { show_header: false }
    }

    pub fn show_header( &mut self ) { self.show_header = true; }
}

impl Default for CsvFormatter {
    fn default() -> CsvFormatter {
	CsvFormatter::new()
    }
}

fn format_prediction( prediction: &Prediction ) -> String {
    format!( "{},{},{}", prediction.paper, prediction.student_id, prediction.certainty )
}

fn join_lines( mut accumulator: String, addition: String ) -> String {
    accumulator.push_str( addition.as_str() );
    accumulator.push( '\n' );
    accumulator
}

/// Writes predictions with the legacy header to a CSV file
pub fn write_predictions<P: AsRef<Path>>( path: P, predictions: &[Prediction] ) -> Result<()> {
    let mut formatter = CsvFormatter::new();
    formatter.show_header();
    let mut file = File::create( path.as_ref() )?;
    file.write_all( formatter.format_pretty( predictions ).as_bytes() )?;
    Ok( () )
}

/// Reads the classifier output, a JSON object from paper number to probability matrix.
pub fn read_heatmaps<P: AsRef<Path>>( path: P ) -> Result<Heatmaps> {
    let content = fs::read_to_string( path.as_ref() )?;
    parse_heatmaps( &content )
}

/// Parses heatmaps, converting the string keys to paper numbers and validating every probability.
pub fn parse_heatmaps( content: &str ) -> Result<Heatmaps> {
    let raw: BTreeMap<String, ProbabilityMatrix> = serde_json::from_str( content )?;
    let mut heatmaps = Heatmaps::new();
    for (key, matrix) in raw {
	let paper = parse_paper_number( &key )?;
	matrix.validate( paper )?;
	if heatmaps.insert( paper, matrix ).is_some() {
	    return Err( Error::Parse( format!( "paper {paper} appears twice in the heatmaps" )));
	}
    }
    Ok( heatmaps )
}

/// Reads the student IDs of a classlist CSV.
pub fn read_classlist<P: AsRef<Path>>( path: P ) -> Result<Vec<StudentId>> {
    let content = fs::read_to_string( path.as_ref() )?;
    parse_classlist( &content )
}

/// Extracts the ID column of a classlist.
///
/// The column is found by its header name; without a recognised header the
/// first column is used. A first row whose first field is already an ID is
/// taken as data rather than as a header.
pub fn parse_classlist( content: &str ) -> Result<Vec<StudentId>> {
    let mut lines = content.lines()
	.enumerate()
	.filter( |(_, line)| !line.trim().is_empty() );

    let mut ids = Vec::new();
    let column = match lines.next() {
	None => return Ok( ids ),
	Some( (_, first) ) => {
	    let fields = split_fields( first );
	    match fields.iter().position( |f| ID_COLUMNS.contains( &f.to_lowercase().as_str() )) {
		Some( column ) => column,
		None => {
		    if let Ok( id ) = StudentId::parse( &fields[ 0 ] ) {
			ids.push( id );
		    }
		    0
		},
	    }
	},
    };

    for (number, line) in lines {
	let fields = split_fields( line );
	let field = fields.get( column )
	    .ok_or_else( || Error::Parse( format!( "classlist line {} has no column {}", number + 1, column + 1 )))?;
	ids.push( StudentId::parse( field )? );
    }
    Ok( ids )
}

/// Reads one item per line, skipping blank lines.
pub fn read_list<T, F, P>( path: P, converter: F ) -> Result<Vec<T>> where
    F: Fn( &str ) -> Result<T>,
    P: AsRef<Path>,
{
    let reader = BufReader::new( File::open( path.as_ref() )? );
    let mut items = Vec::new();
    for line in reader.lines() {
	let line = line?;
	if !line.trim().is_empty() {
	    items.push( converter( line.trim() )? );
	}
    }
    Ok( items )
}

/// IDs already matched to papers, one per line
pub fn read_id_list<P: AsRef<Path>>( path: P ) -> Result<Vec<StudentId>> {
    read_list( path, StudentId::parse )
}

/// Paper numbers, one per line
pub fn read_paper_list<P: AsRef<Path>>( path: P ) -> Result<Vec<PaperNumber>> {
    read_list( path, parse_paper_number )
}

pub fn parse_paper_number( text: &str ) -> Result<PaperNumber> {
    match text.trim().parse::<PaperNumber>() {
	Ok( paper ) if paper > 0 => Ok( paper ),
	_ => Err( Error::Parse( format!( "{text:?} is not a positive paper number" ))),
    }
}

/// Splits a CSV line on commas outside double quotes.
/// Quotes are removed and a doubled quote inside a quoted field stands for one quote.
fn split_fields( line: &str ) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some( c ) = chars.next() {
	match c {
	    '"' if quoted && chars.peek() == Some( &'"' ) => {
		chars.next();
		field.push( '"' );
	    },
	    '"' => quoted = !quoted,
	    ',' if !quoted => fields.push( std::mem::take( &mut field ).trim().to_string() ),
	    _ => field.push( c ),
	}
    }
    fields.push( field.trim().to_string() );
    fields
}
