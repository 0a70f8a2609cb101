use std::io;
use std::path::PathBuf;
use std::result;

use thiserror::Error;

use crate::Row;

/// An error found somewhere in the transformation chain.
///
/// Record-level errors travel down the chain as `Err` items and never stop the
/// stream; run-level errors are returned before any output is produced.
#[derive(Debug, Error)]
pub enum Error {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("inconsistent headers among files in {0:?}")]
    InconsistentHeaders(PathBuf),

    #[error("record {offset} of {path:?} has {found} fields, expected {expected}")]
    InconsistentSizeOfRows {
        path: PathBuf,
        offset: usize,
        found: usize,
        expected: usize,
    },

    /// The workspace or the run's output already exists, most likely left
    /// behind by a run that did not finish.
    #[error("{0:?} already exists, a previous run did not finish")]
    ConfigurationConflict(PathBuf),

    #[error("record {offset} (key {key:?}): no lookup entry for {value:?}")]
    LookupMiss {
        offset: usize,
        key: String,
        value: String,
    },

    #[error(
        "record {offset}{} has {found} fields, expected at least {expected}",
        describe_key(.key)
    )]
    MalformedRecord {
        offset: usize,
        key: Option<String>,
        found: usize,
        expected: usize,
    },

    #[error("could not remove workspace {path:?}: {source}")]
    ResourceCleanupFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("lookup table {path:?} line {line}: {reason}")]
    InvalidLookup {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("unknown encoding label {0:?}")]
    UnknownEncoding(String),

    #[error("no input files matching {pattern:?} in {dir:?}")]
    NoInput { dir: PathBuf, pattern: String },

    #[error("every input file is empty: {0:?}")]
    EmptyInput(Vec<PathBuf>),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("could not build output name from {template:?}: {reason}")]
    OutputTemplate { template: String, reason: String },

    #[error("could not write {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A group of exports does not hold the same kinds of file as the first
    /// group found.
    #[error(
        "files of group {group} differ from group {reference}: missing {missing:?}, unexpected {unexpected:?}"
    )]
    InconsistentFileSet {
        group: String,
        reference: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

fn describe_key(key: &Option<String>) -> String {
    match key {
        Some(key) => format!(" (key {})", key),
        None => String::new(),
    }
}

impl Error {
    /// Errors that concern a single record. These are reported and skipped,
    /// the rest of the stream keeps flowing.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            Error::Csv(_)
                | Error::InconsistentHeaders(_)
                | Error::InconsistentSizeOfRows { .. }
                | Error::LookupMiss { .. }
                | Error::MalformedRecord { .. }
        )
    }
}

pub type Result<T> = result::Result<T, Error>;

/// The type that actually flows the transformation chain. Either a row or an
/// error.
pub type RowResult = result::Result<Row, Error>;
