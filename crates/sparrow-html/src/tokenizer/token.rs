//! Tokens, and the builder the state machine fills in before emitting one.

use std::fmt;

/// One `name="value"` pair on a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased name.
    pub name: String,
    /// Value with character references decoded.
    pub value: String,
}

/// [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization)
///
/// "The output of the tokenization step is a series of zero or more of the
/// following tokens: DOCTYPE, start tag, end tag, comment, character,
/// end-of-file."
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<!DOCTYPE name ...>`; public and system identifiers are not kept.
    Doctype {
        /// Lowercased name, if one was given.
        name: Option<String>,
    },
    /// `<name attr=value ...>`
    StartTag {
        /// Lowercased tag name.
        name: String,
        /// Set by a trailing `/>`.
        self_closing: bool,
        /// Attributes in source order. Duplicates are still present here.
        attributes: Vec<Attribute>,
    },
    /// `</name>`
    EndTag {
        /// Lowercased tag name.
        name: String,
    },
    /// `<!-- data -->`, or a bogus comment such as `<?xml ...?>`.
    Comment {
        /// Text between the delimiters.
        data: String,
    },
    /// A single character of text.
    Character {
        /// The character.
        data: char,
    },
    /// Always the last token.
    EndOfFile,
}

impl Token {
    /// Returns true for [`Token::EndOfFile`].
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::EndOfFile)
    }

    /// Tag name of a start or end tag.
    #[must_use]
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Self::StartTag { name, .. } | Self::EndTag { name } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doctype { name } => write!(f, "<!DOCTYPE {}>", name.as_deref().unwrap_or("")),
            Self::StartTag {
                name,
                self_closing: true,
                ..
            } => write!(f, "<{name}/>"),
            Self::StartTag { name, .. } => write!(f, "<{name}>"),
            Self::EndTag { name } => write!(f, "</{name}>"),
            Self::Comment { data } => write!(f, "<!--{data}-->"),
            Self::Character { data } => write!(f, "{}", data.escape_debug()),
            Self::EndOfFile => f.write_str("EOF"),
        }
    }
}

/// A tag, comment or DOCTYPE under construction.
///
/// End tags collect attributes like start tags do; they are dropped when the
/// token is finished.
#[derive(Debug)]
pub(super) enum Pending {
    Tag {
        end: bool,
        name: String,
        self_closing: bool,
        attributes: Vec<Attribute>,
    },
    Comment(String),
    Doctype(Option<String>),
}

impl Pending {
    pub(super) const fn tag(end: bool) -> Self {
        Self::Tag {
            end,
            name: String::new(),
            self_closing: false,
            attributes: Vec::new(),
        }
    }

    pub(super) const fn comment() -> Self {
        Self::Comment(String::new())
    }

    /// Name of a pending end tag.
    pub(super) fn end_tag_name(&self) -> Option<&str> {
        match self {
            Self::Tag {
                end: true, name, ..
            } => Some(name),
            _ => None,
        }
    }

    pub(super) fn push_name(&mut self, c: char) {
        match self {
            Self::Tag { name, .. } => name.push(c),
            Self::Doctype(name) => name.get_or_insert_with(String::new).push(c),
            Self::Comment(_) => {}
        }
    }

    pub(super) fn has_name(&self) -> bool {
        match self {
            Self::Tag { name, .. } => !name.is_empty(),
            Self::Doctype(name) => name.is_some(),
            Self::Comment(_) => false,
        }
    }

    pub(super) fn begin_attribute(&mut self) {
        if let Self::Tag { attributes, .. } = self {
            attributes.push(Attribute {
                name: String::new(),
                value: String::new(),
            });
        }
    }

    pub(super) fn attribute(&mut self) -> Option<&mut Attribute> {
        match self {
            Self::Tag { attributes, .. } => attributes.last_mut(),
            _ => None,
        }
    }

    pub(super) fn close_self(&mut self) {
        if let Self::Tag {
            end: false,
            self_closing,
            ..
        } = self
        {
            *self_closing = true;
        }
    }

    pub(super) fn push_data(&mut self, c: char) {
        if let Self::Comment(data) = self {
            data.push(c);
        }
    }

    /// A `>` ends the comment here: right after `<!--` or `<!---`, or after
    /// `--` / `--!`. The closing dashes are removed.
    pub(super) fn try_close_comment(&mut self) -> bool {
        let Self::Comment(data) = self else {
            return false;
        };
        let keep = match data.as_str() {
            "" | "-" => 0,
            s if s.ends_with("--!") => s.len() - 3,
            s if s.ends_with("--") => s.len() - 2,
            _ => return false,
        };
        data.truncate(keep);
        true
    }

    pub(super) fn finish(self) -> Token {
        match self {
            Self::Tag {
                end: true, name, ..
            } => Token::EndTag { name },
            Self::Tag {
                name,
                self_closing,
                attributes,
                ..
            } => Token::StartTag {
                name,
                self_closing,
                attributes,
            },
            Self::Comment(data) => Token::Comment { data },
            Self::Doctype(name) => Token::Doctype { name },
        }
    }
}
