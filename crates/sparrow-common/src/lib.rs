//! Common infrastructure for the Sparrow browser.
//!
//! This crate provides shared types used by all browser components:
//! - **URL helpers** - relative URL resolution and fragment handling
//! - **Wire records** - [`Method`], [`Headers`], [`Request`], [`Response`]
//! - **Transport** - the [`Transport`] collaborator trait and the default
//!   [`HttpTransport`] built on reqwest

pub mod net;
pub mod transport;
pub mod urls;

pub use net::{Headers, Method, NetworkError, Request, Response, Transport};
pub use transport::{DataUrl, HttpTransport};
pub use url::Url;
