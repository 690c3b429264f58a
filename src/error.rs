use crate::table::Attribute;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while deriving or labeling heatmaps
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A grid was ragged or empty
    #[error("invalid grid shape: {0}")]
    InvalidShape(String),

    /// A selector string did not name a known option
    #[error("unsupported {kind}: {value:?}")]
    UnsupportedOption { kind: &'static str, value: String },

    /// The measurement table has no rows
    #[error("measurement table is empty")]
    EmptyTable,

    /// No candidate implementations were supplied
    #[error("no candidate implementations supplied")]
    NoCandidates,

    /// An axis attribute produced no values
    #[error("attribute {0} has no values in the measurement table")]
    EmptyAxis(Attribute),

    /// A heatmap cell had no measurements for any candidate
    #[error("no data for cell ({row_attr}={row}, {col_attr}={col})")]
    NoData {
        row_attr: Attribute,
        row: f64,
        col_attr: Attribute,
        col: f64,
    },

    /// An implementation identifier has no entry in the display tables
    #[error("missing display metadata for {0:?}; add it to the display name table")]
    MissingMetadata(String),
}

impl Error {
    pub(crate) fn unsupported(kind: &'static str, value: &str) -> Self {
        Error::UnsupportedOption {
            kind,
            value: value.to_string(),
        }
    }
}
