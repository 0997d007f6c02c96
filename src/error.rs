//! Error taxonomy shared by the parser and the driver.
//!
//! Translation fails fast: the first invalid command aborts its unit, and
//! nothing is written to disk until every unit has translated cleanly.

use std::io;
use std::path::PathBuf;

use snafu::Snafu;

pub type TranslateResult<T> = Result<T, TranslateError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TranslateError {
    #[snafu(display("line {line_no}: malformed command '{line}'"))]
    MalformedCommand { line: String, line_no: usize },

    #[snafu(display("line {line_no}: unknown command '{keyword}'"))]
    UnknownKeyword { keyword: String, line_no: usize },

    #[snafu(display("line {line_no}: unknown segment '{segment}'"))]
    UnknownSegment { segment: String, line_no: usize },

    #[snafu(display("line {line_no}: {message}"))]
    Arity { message: String, line_no: usize },

    #[snafu(display("{}: {source}", path.display()))]
    Io { source: io::Error, path: PathBuf },

    #[snafu(display("{}: {reason}", path.display()))]
    InvalidInput { path: PathBuf, reason: String },

    // Attached by the driver so a failure among several units names its file.
    #[snafu(display("{}: {source}", path.display()))]
    Unit {
        #[snafu(source(from(TranslateError, Box::new)))]
        source: Box<TranslateError>,
        path: PathBuf,
    },
}
