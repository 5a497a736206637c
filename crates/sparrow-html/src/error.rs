use thiserror::Error;

/// Failures while turning a byte stream into a tree.
///
/// Malformed markup is never an error; only the bytes themselves can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The caller asked for an encoding this crate cannot decode.
    #[error("unsupported encoding `{0}`")]
    UnsupportedEncoding(String),
    /// The reader failed before the end of the stream.
    #[error("input stream ended before completion: {0}")]
    UnterminatedStream(String),
}

/// Result alias for parsing.
pub type Result<T> = std::result::Result<T, ParseError>;
