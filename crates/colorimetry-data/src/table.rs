// --- CSV reference table parsing ---
//
// Shared by the compile-time baking macros in `cie-data` and by runtime
// loading of user supplied tables. Lines starting with `#` are comments.

#[derive(Debug)]
pub enum TableError {
    Io(std::io::Error),
    Csv(csv::Error),
    ColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },
    ParseFloat {
        line: u64,
        column: usize,
        err: std::num::ParseFloatError,
    },
    MissingHeader,
    TooFewRows,
    NotIncreasing {
        line: u64,
    },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::Io(err) => write!(f, "failed to read table: {err}"),
            TableError::Csv(err) => write!(f, "malformed CSV: {err}"),
            TableError::ColumnCount {
                line,
                expected,
                found,
            } => {
                write!(f, "line {line}: expected {expected} columns, got {found}")
            }
            TableError::ParseFloat { line, column, err } => {
                write!(f, "line {line}, column {column}: {err}")
            }
            TableError::MissingHeader => {
                write!(f, "missing `wavelength_nm,<name>,...` header row")
            }
            TableError::TooFewRows => write!(f, "need at least 2 rows for interpolation"),
            TableError::NotIncreasing { line } => {
                write!(f, "line {line}: wavelengths must be strictly increasing")
            }
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Io(err) => Some(err),
            TableError::Csv(err) => Some(err),
            TableError::ParseFloat { err, .. } => Some(err),
            _ => None,
        }
    }
}

/// A wavelength-keyed table whose value columns carry names, such as a set
/// of test color reflectances.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTable {
    pub names: Vec<String>,
    pub wavelengths: Vec<f64>,
    /// One vector per named column, parallel to `wavelengths`.
    pub columns: Vec<Vec<f64>>,
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes())
}

fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

fn parse_row(record: &csv::StringRecord, expected: usize) -> Result<Vec<f64>, TableError> {
    let line = record_line(record);
    if record.len() != expected {
        return Err(TableError::ColumnCount {
            line,
            expected,
            found: record.len(),
        });
    }
    record
        .iter()
        .enumerate()
        .map(|(column, field)| {
            field
                .parse::<f64>()
                .map_err(|err| TableError::ParseFloat { line, column, err })
        })
        .collect()
}

fn check_increasing(rows: &[(u64, f64)]) -> Result<(), TableError> {
    for pair in rows.windows(2) {
        if pair[1].1 <= pair[0].1 {
            return Err(TableError::NotIncreasing { line: pair[1].0 });
        }
    }
    Ok(())
}

/// Parse a numeric table with exactly `columns` columns per row, the first
/// being the wavelength in nm.
///
/// A leading non-numeric row is treated as a header and skipped.
pub fn parse_columns(text: &str, columns: usize) -> Result<Vec<Vec<f64>>, TableError> {
    let mut rdr = reader(text);
    let mut rows = Vec::new();
    let mut keys = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(TableError::Csv)?;
        let is_header = idx == 0
            && record
                .get(0)
                .is_some_and(|first| first.parse::<f64>().is_err());
        if is_header {
            continue;
        }
        let row = parse_row(&record, columns)?;
        keys.push((record_line(&record), row[0]));
        rows.push(row);
    }

    if rows.len() < 2 {
        return Err(TableError::TooFewRows);
    }
    check_increasing(&keys)?;
    Ok(rows)
}

/// Parse a table with a `wavelength_nm,<name>,<name>,...` header into
/// named columns.
pub fn parse_named_columns(text: &str) -> Result<NamedTable, TableError> {
    let mut rdr = reader(text);
    let mut records = rdr.records();

    let header = match records.next() {
        Some(result) => result.map_err(TableError::Csv)?,
        None => return Err(TableError::MissingHeader),
    };
    let first_is_label = header
        .get(0)
        .is_some_and(|first| first.parse::<f64>().is_err());
    if !first_is_label || header.len() < 2 {
        return Err(TableError::MissingHeader);
    }
    let names: Vec<String> = header.iter().skip(1).map(str::to_string).collect();

    let mut wavelengths = Vec::new();
    let mut columns = vec![Vec::new(); names.len()];
    let mut keys = Vec::new();
    for result in records {
        let record = result.map_err(TableError::Csv)?;
        let row = parse_row(&record, names.len() + 1)?;
        keys.push((record_line(&record), row[0]));
        wavelengths.push(row[0]);
        for (column, value) in columns.iter_mut().zip(&row[1..]) {
            column.push(*value);
        }
    }

    if wavelengths.len() < 2 {
        return Err(TableError::TooFewRows);
    }
    check_increasing(&keys)?;
    Ok(NamedTable {
        names,
        wavelengths,
        columns,
    })
}
