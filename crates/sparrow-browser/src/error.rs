use sparrow_common::NetworkError;
use sparrow_forms::FormError;
use sparrow_html::ParseError;
use thiserror::Error;

/// Failures of a browsing session.
///
/// Navigation failures leave the last loaded document and the history in
/// place; only [`SessionState`](crate::SessionState) changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A document query was made before any navigation succeeded.
    #[error("no document loaded")]
    NoDocumentLoaded,
    /// No form matches the given name, id or index.
    #[error("no such form: {0}")]
    NoSuchForm(String),
    /// The transport failed.
    #[error("navigation failed: {0}")]
    NavigationFailed(#[from] NetworkError),
    /// More redirect hops than the session allows.
    #[error("too many redirects (limit {limit}) while loading {url}")]
    TooManyRedirects {
        /// The configured hop limit.
        limit: usize,
        /// The URL the last redirect pointed to.
        url: String,
    },
    /// The final response of a navigation was not a 2xx.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Response status.
        status: u16,
        /// The URL that answered.
        url: String,
    },
    /// A URL or `Location` could not be resolved.
    #[error("invalid URL `{0}`")]
    InvalidUrl(String),
    /// The response body could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Building a form submission failed.
    #[error(transparent)]
    Form(#[from] FormError),
    /// Another navigation holds the shared session.
    #[error("session is busy with another navigation")]
    SessionBusy,
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
