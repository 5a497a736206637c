//! HTML parsing for the Sparrow browser.
//!
//! # Scope
//!
//! - **Tokenizer** ([WHATWG § 13.2.5](https://html.spec.whatwg.org/multipage/parsing.html#tokenization))
//!   - Data, RCDATA and RAWTEXT states, tags, attributes, comments, DOCTYPE
//!   - Numeric and common named character references
//! - **Tree builder** ([WHATWG § 13.2.6](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction))
//!   - Stack of open elements with implied end tags and scope checks
//!   - Void elements, stray end tags, `<html>` attribute merging
//! - **Encoding sniffing** ([WHATWG § 13.2.3](https://html.spec.whatwg.org/multipage/parsing.html#the-input-byte-stream))
//! - [`HtmlTree`], the parsed document with base-URL aware queries
//!
//! # Not Implemented
//!
//! - Head/body synthesis, foster parenting, the adoption agency algorithm
//! - Script data escape states, foreign content

/// Character encoding detection and decoding.
pub mod charset;
mod document;
mod error;
/// HTML tree construction.
pub mod parser;
/// `Refresh` parsing.
pub mod refresh;
/// HTML tokenizer for converting input into tokens.
pub mod tokenizer;

pub use charset::Charset;
pub use document::{HtmlTree, Link};
pub use error::{ParseError, Result};
pub use refresh::{Refresh, parse_refresh};
pub use sparrow_dom::{DomTree, NodeId, NodeType};
