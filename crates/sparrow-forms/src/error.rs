use thiserror::Error;

/// Failures while reading, mutating or submitting a form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// The node handed to [`FormModel::from_element`](crate::FormModel::from_element)
    /// is not a `<form>` element.
    #[error("element is not a <form>")]
    NotAForm,
    /// The control is disabled, or the operation does not apply to its kind.
    #[error("invalid control state: {0}")]
    InvalidControlState(String),
    /// No control matches the given id or name.
    #[error("no such control: {0}")]
    NoSuchControl(String),
    /// A select control has no option with this value.
    #[error("control `{control}` has no option `{value}`")]
    NoSuchOption {
        /// Name of the select control, or its index when unnamed.
        control: String,
        /// The requested option value.
        value: String,
    },
    /// The form (or submitter) action does not resolve to a URL.
    #[error("invalid form action `{0}`")]
    InvalidAction(String),
    /// A file chosen by path could not be read.
    #[error("cannot read `{path}`: {message}")]
    FileRead {
        /// Path as given.
        path: String,
        /// The I/O error, rendered.
        message: String,
    },
    /// A name lookup matched several controls that cannot be treated as one.
    #[error("name `{0}` matches several controls")]
    Ambiguous(String),
}

/// Result alias for form operations.
pub type Result<T> = std::result::Result<T, FormError>;
