//! Error types for the boleto_cnab library.

use std::io;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while composing, writing or reading CNAB data.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred during read or write operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reading or writing CSV.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error writing JSON.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A value cannot be rendered in its declared width or mode.
    #[error("cannot format {target}: {reason}")]
    Format { target: String, reason: String },

    /// A column range is inconsistent with the line or with the value width.
    #[error("invalid column range {start}-{end} (line width {width})")]
    ColumnRange {
        start: usize,
        end: usize,
        width: usize,
    },

    /// A field the bank requires was never set.
    #[error("bank {bank} requires field '{field}'")]
    MissingField { bank: String, field: &'static str },

    /// A checksum input contained something other than ASCII digits.
    #[error("check digit input must contain only digits: {0:?}")]
    InvalidDigitInput(String),

    /// No profile exists for the bank code.
    #[error("unsupported bank code: {0}")]
    UnsupportedBank(String),

    /// The wallet is not offered by the bank.
    #[error("bank {bank} does not accept wallet {wallet}")]
    UnsupportedWallet { bank: String, wallet: String },

    /// The bank has no layout of the requested width for this file kind.
    #[error("bank {bank} has no CNAB {layout} {kind} layout")]
    UnsupportedLayout {
        bank: String,
        layout: usize,
        kind: &'static str,
    },

    /// The document species has no code at the bank.
    #[error("bank {bank} has no code for species {species}")]
    UnknownSpecies { bank: String, species: String },

    /// A slip issued for one bank was handed to another bank's file.
    #[error("slip belongs to bank {found}, file is for bank {expected}")]
    BankMismatch { expected: String, found: String },

    /// A slip's own agency, account or contract disagrees with the file's.
    #[error("slip {field} {slip} differs from file {field} {file}")]
    SlipMismatch {
        field: &'static str,
        file: String,
        slip: String,
    },

    /// The remessa file was already finalized.
    #[error("remessa already finalized")]
    Finalized,

    /// Rendering a record failed.
    #[error("bank {bank}, {record}: {source}")]
    Record {
        bank: String,
        record: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// Invalid date format.
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid amount format.
    #[error("Invalid amount format: {0}")]
    InvalidAmount(String),

    /// Invalid layout specified.
    #[error("Invalid layout: {0}")]
    InvalidFormat(String),

    /// General parsing error.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl Error {
    pub(crate) fn format(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Format {
            target: target.into(),
            reason: reason.into(),
        }
    }
}
