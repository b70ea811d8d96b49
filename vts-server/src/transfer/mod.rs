//! Spreadsheet import and export
//!
//! Rows travel as CSV with a fixed header set. Import is lenient about
//! level spellings and section/offense names (fuzzy matching against the
//! catalog); export renders levels as ordinal text. The byte format is
//! delegated entirely to the `csv` codec.

pub mod export;
pub mod import;

/// Column headers, in order, for both import and export.
pub const HEADERS: [&str; 11] = [
    "No.",
    "Name",
    "Plate Number",
    "Date",
    "Section",
    "Offenses",
    "Level",
    "Fine",
    "Status",
    "Official Receipt Number",
    "Date Paid",
];
