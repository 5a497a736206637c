//! Browsing sessions for the Sparrow browser.
//!
//! # Scope
//!
//! This crate provides:
//! - **Navigation** - fetch, follow redirects and refreshes, parse
//! - **History** - back/forward over parsed snapshots, no refetching
//! - **Cookies** - an optional [`CookieStore`] consulted around every hop
//! - **Forms** - discovery on the current document and submission through
//!   [`sparrow_forms::FormModel`]
//!
//! ```no_run
//! use sparrow_browser::BrowserSession;
//!
//! # fn main() -> sparrow_browser::Result<()> {
//! let mut session = BrowserSession::from_config(Default::default())?;
//! let _ = session.open("https://example.com/login")?;
//! let mut form = session.form(0)?;
//! form.set_field("user", "jo")?;
//! let _ = session.submit_form(&form, None)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Not Implemented
//!
//! - Refresh delays: a refresh with a target is followed at once

mod config;
mod cookies;
mod error;
mod history;
mod session;
mod shared;

pub use config::{DEFAULT_ACCEPT, DEFAULT_USER_AGENT, SessionConfig};
pub use cookies::{Cookie, CookieJar, CookieStore};
pub use error::{Result, SessionError};
pub use history::{History, HistoryEntry};
pub use session::{BrowserSession, SessionState};
pub use shared::SharedSession;

pub use sparrow_common as common;
pub use sparrow_forms as forms;
pub use sparrow_html as html;
