//! HTML tokenizer.
//!
//! [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization),
//! trimmed to what reading a page needs.

pub mod character_reference;
pub mod core;
mod helpers;
pub mod token;

pub use self::core::{HtmlTokenizer, TokenizerState};
pub use token::{Attribute, Token};
