pub mod spectrum;
pub mod table;

use std::path::Path;

pub use spectrum::{Spectrum, SpectrumError};
pub use table::{NamedTable, TableError, parse_columns, parse_named_columns};

/// Parse a fixed-width numeric table from a CSV file on disk.
pub fn load_columns_from_file(path: &Path, columns: usize) -> Result<Vec<Vec<f64>>, TableError> {
    let contents = std::fs::read_to_string(path).map_err(TableError::Io)?;
    parse_columns(&contents, columns)
}

/// Parse a table with a `wavelength_nm,<name>,...` header from a CSV file on disk.
pub fn load_named_from_file(path: &Path) -> Result<NamedTable, TableError> {
    let contents = std::fs::read_to_string(path).map_err(TableError::Io)?;
    parse_named_columns(&contents)
}
