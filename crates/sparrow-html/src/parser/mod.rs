//! HTML tree construction.
//!
//! [§ 13.2.6 Tree construction](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction)

/// Tree builder and insertion modes.
pub mod core;
/// Element categories: void elements, scopes, implied end tags.
pub mod rules;

pub use self::core::{InsertionMode, TreeBuilder};
