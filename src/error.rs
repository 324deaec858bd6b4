//! Error types for the assembly engine.
//!
//! Every fallible operation in the crate returns [`Result`]. Protocol
//! violations surface as [`Error::IllegalState`], feature/version mismatches
//! as [`Error::Unsupported`] before any byte of the feature is emitted, and
//! sink failures as [`Error::Io`] exactly as the sink reported them.

/// Result type alias for assembly operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while assembling a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error from the underlying byte sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writer or builder used out of protocol order
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Feature not available for the configured PDF version
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// An allocated reference was never written as an object
    #[error("Object {0} 0 R was allocated but never written")]
    UnresolvedReference(u32),

    /// Page geometry outside the allowed range
    #[error("Invalid page size {width}x{height}: each side must be between {min} and {max}")]
    InvalidPageSize {
        /// Requested width in points
        width: f32,
        /// Requested height in points
        height: f32,
        /// Smallest allowed side
        min: f32,
        /// Largest allowed side
        max: f32,
    },

    /// Caller-supplied value rejected before anything was written
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Key derivation or cipher failure
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Image could not be read or described
    #[error("Image error: {0}")]
    Image(String),

    /// Font program could not be embedded
    #[error("Font error: {0}")]
    Font(String),
}

impl Error {
    /// Shorthand for [`Error::IllegalState`].
    pub(crate) fn illegal(message: impl Into<String>) -> Self {
        Error::IllegalState(message.into())
    }

    /// Recover a crate error that crossed an `io::Write` boundary.
    pub(crate) fn from_io(err: std::io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            return Error::Io(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(inner)) => *inner,
            _ => Error::illegal("lost error while unwrapping an I/O failure"),
        }
    }
}
