use thiserror::Error;

/// Error type for the core (geometry + reallocation) layer.
///
/// The loader and CLI layers use `anyhow` instead; this enum exists so that
/// callers can tell a hard data-integrity failure (`NotFound`) apart from a
/// malformed input document (`Shape`).
#[derive(Error, Debug)]
pub enum Error {
    /// A named district was looked up but does not exist in the set/table.
    /// Always fatal: it means the table and the geometry disagree.
    #[error("no district named {0:?}")]
    NotFound(String),

    /// A shape document or table row failed validation at construction.
    #[error("malformed input: {0}")]
    Shape(String),

    /// A geometric operation failed on a specific polygon pair. Recoverable:
    /// the reallocator treats the pair as zero overlap and counts it.
    #[error("geometry operation failed: {0}")]
    Geometry(String),
}

impl Error {
    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::Shape(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
