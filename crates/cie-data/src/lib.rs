//! Proc macros that embed CIE reference tables from CSV files at compile time.
//!
//! - CIE 1931 2-degree standard observer color matching functions
//!   ([CIE 018:2019](https://cie.co.at/datatable/cie-1931-colour-matching-functions-2-degree-observer))
//! - CIE 1951 scotopic luminous efficiency function V'(λ)
//! - CIE 13.3 test color sample reflectances
//! - CIE daylight basis functions S0, S1, S2 (CIE 15:2004, table T.2)
//!
//! Parsing goes through `colorimetry-data`, so the baked tables and tables
//! loaded at runtime accept exactly the same CSV dialect.

use proc_macro::TokenStream;
use std::path::PathBuf;
use syn::{LitStr, parse_macro_input};

/// Reads a CIE observer CSV and expands to an array literal of
/// `(f32, f64, f64, f64)` tuples: `(wavelength_nm, x_bar, y_bar, z_bar)`.
///
/// The path is resolved relative to the calling crate's `CARGO_MANIFEST_DIR`.
///
/// ```ignore
/// const CIE_1931_DATA: [(f32, f64, f64, f64); 81] =
///     cie_data::cie_1931_table!("data/cie_1931_2deg_5nm.csv");
/// ```
#[proc_macro]
pub fn cie_1931_table(input: TokenStream) -> TokenStream {
    let lit = parse_macro_input!(input as LitStr);
    four_column_table(&lit.value())
}

/// Reads the daylight basis CSV and expands to an array literal of
/// `(f32, f64, f64, f64)` tuples: `(wavelength_nm, s0, s1, s2)`.
#[proc_macro]
pub fn cie_daylight_table(input: TokenStream) -> TokenStream {
    let lit = parse_macro_input!(input as LitStr);
    four_column_table(&lit.value())
}

/// Reads a two-column CSV and expands to an array literal of
/// `(f32, f64)` tuples: `(wavelength_nm, value)`.
///
/// ```ignore
/// const SCOTOPIC_DATA: [(f32, f64); 41] =
///     cie_data::scotopic_table!("data/cie_1951_scotopic_10nm.csv");
/// ```
#[proc_macro]
pub fn scotopic_table(input: TokenStream) -> TokenStream {
    let lit = parse_macro_input!(input as LitStr);
    let path = resolve_path(&lit.value());
    let rows = read_rows(&path, 2);

    let entries: Vec<String> = rows
        .iter()
        .map(|row| format!("({}_f32, {}_f64)", row[0], row[1]))
        .collect();
    array_literal(&entries)
}

/// Reads a reflectance CSV with a `wavelength_nm,<name>,...` header and
/// expands to a tuple `([&'static str; K], [(f32, [f64; K]); N])` of sample
/// names and rows.
///
/// ```ignore
/// const TCS_DATA: ([&str; 8], [(f32, [f64; 8]); 81]) =
///     cie_data::reflectance_table!("data/cie_13_3_tcs_5nm.csv");
/// ```
#[proc_macro]
pub fn reflectance_table(input: TokenStream) -> TokenStream {
    let lit = parse_macro_input!(input as LitStr);
    let path = resolve_path(&lit.value());

    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
    let table = colorimetry_data::parse_named_columns(&contents)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()));

    let names: Vec<String> = table.names.iter().map(|n| format!("{n:?}")).collect();
    let rows: Vec<String> = table
        .wavelengths
        .iter()
        .enumerate()
        .map(|(i, wl)| {
            let values: Vec<String> = table
                .columns
                .iter()
                .map(|column| format!("{}_f64", column[i]))
                .collect();
            format!("({wl}_f32, [{}])", values.join(", "))
        })
        .collect();

    let code = format!(
        "([{}], [\n    {}\n])",
        names.join(", "),
        rows.join(",\n    ")
    );
    code.parse()
        .expect("failed to parse generated reflectance table")
}

fn four_column_table(relative: &str) -> TokenStream {
    let path = resolve_path(relative);
    let rows = read_rows(&path, 4);

    let entries: Vec<String> = rows
        .iter()
        .map(|row| {
            format!(
                "({}_f32, {}_f64, {}_f64, {}_f64)",
                row[0], row[1], row[2], row[3]
            )
        })
        .collect();
    array_literal(&entries)
}

fn read_rows(path: &PathBuf, columns: usize) -> Vec<Vec<f64>> {
    let contents = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
    colorimetry_data::parse_columns(&contents, columns)
        .unwrap_or_else(|e| panic!("CSV parse error in {}: {e}", path.display()))
}

fn array_literal(entries: &[String]) -> TokenStream {
    assert!(!entries.is_empty(), "CSV table is empty");
    let body = entries.join(",\n    ");
    let code = format!("[\n    {body}\n]");

    code.parse()
        .expect("failed to parse generated array literal")
}

/// Resolve a path relative to the calling crate's CARGO_MANIFEST_DIR.
fn resolve_path(relative: &str) -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let path = PathBuf::from(manifest_dir).join(relative);
    assert!(
        path.exists(),
        "CIE data file not found at {}",
        path.display()
    );
    path
}
