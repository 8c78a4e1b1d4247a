//! Rectangular linear assignment.
//!
//! Shortest augmenting path with dual potentials (the Jonker-Volgenant family,
//! as laid out by Crouse for rectangular problems). One row is added to the
//! matching per round, so a problem with `r <= c` takes `r` rounds of `O(r c)`.

use bit_set::BitSet;

use crate::*;

/// Dense row-major matrix of assignment costs.
#[derive( Debug, Clone, PartialEq )]
pub struct CostMatrix {
    rows: usize,
    cols: usize,
    costs: Vec<f64>,
}

impl CostMatrix {
    pub fn new( rows: usize, cols: usize, costs: Vec<f64> ) -> Result<CostMatrix> {
	if costs.len() != rows * cols {
	    return Err( Error::Parse( format!( "{} costs do not fill a {rows}x{cols} matrix", costs.len() )));
	}
	Ok( CostMatrix { rows, cols, costs } )
    }

    pub fn from_rows( rows: Vec<Vec<f64>> ) -> Result<CostMatrix> {
	let cols = rows.first().map_or( 0, |row| row.len() );
	if rows.iter().any( |row| row.len() != cols ) {
	    return Err( Error::Parse( "cost matrix rows differ in length".to_string() ));
	}
	let number_rows = rows.len();
	CostMatrix::new( number_rows, cols, rows.into_iter().flatten().collect() )
    }

    pub fn rows( &self ) -> usize { self.rows }
    pub fn cols( &self ) -> usize { self.cols }

    pub fn get( &self, row: usize, col: usize ) -> f64 {
	self.costs[ row * self.cols + col ]
    }

    pub fn row( &self, row: usize ) -> &[f64] {
	&self.costs[ row * self.cols .. ( row + 1 ) * self.cols ]
    }

    pub fn transpose( &self ) -> CostMatrix {
	let mut costs = Vec::with_capacity( self.costs.len() );
	for col in 0 .. self.cols {
	    for row in 0 .. self.rows {
		costs.push( self.get( row, col ));
	    }
	}
	CostMatrix { rows: self.cols, cols: self.rows, costs }
    }

    /// Sum of the costs of the given (row, col) pairs
    pub fn total( &self, assignment: &[(usize, usize)] ) -> f64 {
	assignment.iter().map( |&(row, col)| self.get( row, col )).sum()
    }

    fn check_entries( &self ) -> Result<()> {
	for (index, value) in self.costs.iter().enumerate() {
	    if value.is_nan() || *value == f64::NEG_INFINITY {
		return Err( Error::InvalidCost { row: index / self.cols, col: index % self.cols, value: *value });
	    }
	}
	Ok( () )
    }
}

impl Loggable for CostMatrix {
    fn log( &self, message: &str, level: Level ) {
	for row in 0 .. self.rows {
	    let line: Vec<String> = self.row( row ).iter().map( |cost| format!( "{cost:.3}" )).collect();
	    log_line( level, message, &line.join( " " ));
	}
    }
}

/// Finds a minimum-cost matching of `min(rows, cols)` (row, col) pairs.
///
/// Pairs are returned sorted by row. Entries may be `+inf` to forbid a pair;
/// NaN and `-inf` are rejected.
pub fn linear_sum_assignment( matrix: &CostMatrix ) -> Result<Vec<(usize, usize)>> {
    matrix.check_entries()?;
    if matrix.rows == 0 || matrix.cols == 0 {
	return Ok( Vec::new() );
    }

    // the solver wants at least as many columns as rows
    if matrix.rows > matrix.cols {
	let transposed = matrix.transpose();
	let mut pairs: Vec<(usize, usize)> = AugmentingPathSolver::new( &transposed ).solve()?
	    .into_iter()
	    .map( |(row, col)| (col, row) )
	    .collect();
	pairs.sort_unstable();
	Ok( pairs )
    } else {
	AugmentingPathSolver::new( matrix ).solve()
    }
}

/// State of the solver for a matrix with `rows <= cols`.
struct AugmentingPathSolver<'a> {
    matrix: &'a CostMatrix,
    /// dual potentials
    u: Vec<f64>,
    v: Vec<f64>,
    shortest_path_costs: Vec<f64>,
    /// predecessor row of each column on the current shortest path tree
    path: Vec<usize>,
    col_for_row: Vec<Option<usize>>,
    row_for_col: Vec<Option<usize>>,
    scanned_rows: BitSet,
    scanned_cols: BitSet,
    remaining: Vec<usize>,
}

impl<'a> AugmentingPathSolver<'a> {
    fn new( matrix: &'a CostMatrix ) -> AugmentingPathSolver<'a> {
	let (rows, cols) = (matrix.rows, matrix.cols);
	AugmentingPathSolver {
	    matrix,
	    u: vec!( 0.0; rows ),
	    v: vec!( 0.0; cols ),
	    shortest_path_costs: vec!( f64::INFINITY; cols ),
	    path: vec!( 0; cols ),
	    col_for_row: vec!( None; rows ),
	    row_for_col: vec!( None; cols ),
	    scanned_rows: BitSet::with_capacity( rows ),
	    scanned_cols: BitSet::with_capacity( cols ),
	    remaining: Vec::with_capacity( cols ),
	}
    }

    fn solve( mut self ) -> Result<Vec<(usize, usize)>> {
	for current_row in 0 .. self.matrix.rows {
	    let (sink, min_value) = self.shortest_augmenting_path( current_row )?;

	    // update dual variables
	    self.u[ current_row ] += min_value;
	    for row in self.scanned_rows.iter() {
		if row != current_row {
		    if let Some( col ) = self.col_for_row[ row ] {
			self.u[ row ] += min_value - self.shortest_path_costs[ col ];
		    }
		}
	    }
	    for col in self.scanned_cols.iter() {
		self.v[ col ] -= min_value - self.shortest_path_costs[ col ];
	    }

	    self.augment( current_row, sink );
	}

	let pairs = self.col_for_row.iter()
	    .enumerate()
	    .filter_map( |(row, col)| col.map( |col| (row, col) ))
	    .collect();
	Ok( pairs )
    }

    /// Flips the alternating path ending in the free column `sink`.
    fn augment( &mut self, current_row: usize, sink: usize ) {
	let mut col = sink;
	loop {
	    let row = self.path[ col ];
	    self.row_for_col[ col ] = Some( row );
	    let previous = self.col_for_row[ row ].replace( col );
	    match previous {
		Some( previous ) if row != current_row => col = previous,
		_ => break,
	    }
	}
    }

    /// Dijkstra over reduced costs from `current_row` to the nearest unassigned column.
    fn shortest_augmenting_path( &mut self, current_row: usize ) -> Result<(usize, f64)> {
	let cols = self.matrix.cols;
	let mut min_value = 0.0;

	// scan columns in reverse so ties resolve like the reference solvers
	self.remaining.clear();
	self.remaining.extend( ( 0 .. cols ).rev() );
	self.scanned_rows.clear();
	self.scanned_cols.clear();
	self.shortest_path_costs.iter_mut().for_each( |cost| *cost = f64::INFINITY );

	let mut row = current_row;
	loop {
	    self.scanned_rows.insert( row );
	    let mut lowest = f64::INFINITY;
	    let mut index = None;

	    for (position, &col) in self.remaining.iter().enumerate() {
		let reduced = min_value + self.matrix.get( row, col ) - self.u[ row ] - self.v[ col ];
		if reduced < self.shortest_path_costs[ col ] {
		    self.path[ col ] = row;
		    self.shortest_path_costs[ col ] = reduced;
		}
		// prefer a free column on ties, it ends the search
		let candidate = self.shortest_path_costs[ col ];
		if candidate < lowest || ( candidate == lowest && self.row_for_col[ col ].is_none() ) {
		    lowest = candidate;
		    index = Some( position );
		}
	    }

	    min_value = lowest;
	    let position = match index {
		Some( position ) if min_value.is_finite() => position,
		_ => return Err( Error::Infeasible ),
	    };

	    let col = self.remaining.swap_remove( position );
	    self.scanned_cols.insert( col );
	    match self.row_for_col[ col ] {
		None => return Ok( (col, min_value) ),
		Some( next ) => row = next,
	    }
	}
    }
}
