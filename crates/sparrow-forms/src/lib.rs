//! HTML forms for the Sparrow browser.
//!
//! [§ 4.10 Forms](https://html.spec.whatwg.org/multipage/forms.html)
//!
//! A [`FormModel`] is read out of a parsed [`HtmlTree`](sparrow_html::HtmlTree)
//! once. Its controls are then filled in locally and
//! [`FormModel::build_request`] produces the [`Request`](sparrow_common::Request)
//! that submits it.
//!
//! # Scope
//!
//! - Control association: nearest `<form>` ancestor and the `form` attribute
//! - Disabled controls, including `<fieldset disabled>`
//! - Select defaults, radio groups, file selections
//! - `application/x-www-form-urlencoded`, `multipart/form-data` and
//!   `text/plain` encodings, with submitter overrides
//! - `accept-charset`, falling back to the document's encoding
//!
//! # Not Implemented
//!
//! - Constraint validation, `dirname`

mod control;
/// Entry lists and submission encodings.
pub mod encoding;
mod error;
mod model;
mod submission;

pub use control::{Control, ControlId, ControlKind, FileSelection, SelectOption};
pub use encoding::{Enctype, FormEntry, FormValue, Multipart};
pub use error::{FormError, Result};
pub use model::FormModel;
