use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("The file is violating the expected format, because: {reason}")]
    FormatError { reason: &'static str },

    #[error("The {asset} record is invalid: {reason}")]
    InvalidRecord { asset: &'static str, reason: String },

    #[error("Source contains no data")]
    EmptySource,

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

pub mod adt;
pub mod blp;
pub mod common;
pub mod decoder;
pub mod extracted;
pub mod m2;
pub mod wdt;
pub mod wmo;
