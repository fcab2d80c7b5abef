//! Error types for queryopt

use crate::model::SourceId;
use thiserror::Error;

/// The result type for queryopt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rewriting a query model
#[derive(Debug, Error)]
pub enum Error {
    /// A query-source reference had no replacement in the mapping and the
    /// rewrite was configured to treat that as an error.
    #[error("no replacement mapped for query source {0}")]
    UnmappedSourceReference(SourceId),

    /// An API precondition was violated by the caller (e.g. asking the
    /// flattener to flatten a clause whose source is not a subquery).
    #[error("precondition violated: {0}")]
    Precondition(String),
}

impl Error {
    /// Create an unmapped-reference error
    pub fn unmapped(source: SourceId) -> Self {
        Error::UnmappedSourceReference(source)
    }

    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Error::Precondition(message.into())
    }
}
