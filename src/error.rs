use thiserror::Error;

/// Errors raised by the classification core and its input adapters.
#[derive(Error, Debug)]
pub enum QcError {
    /// The CIGAR of an alignment carried an operation code outside `MIDNSHP=X`.
    #[error("malformed alignment {query_name}: unrecognized CIGAR operation code {op}")]
    MalformedAlignment { op: u8, query_name: String },

    #[error("annotation error: {0}")]
    Annotation(String),

    #[error("reference sequence error: {0}")]
    Reference(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type QcResult<T> = std::result::Result<T, QcError>;
