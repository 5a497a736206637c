//! The tokenizer state machine.

use strum_macros::Display;
use tracing::trace;

use super::helpers::is_space;
use super::token::{Pending, Token};

/// Tokenizer states.
///
/// [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization)
///
/// A lenient subset: script data shares the RAWTEXT states, character
/// references are decoded inline, the comment start/dash/end states are one
/// state, and DOCTYPE identifiers are skipped rather than parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenizerState {
    /// § 13.2.5.1
    Data,
    /// § 13.2.5.2
    RCDATA,
    /// § 13.2.5.3
    RAWTEXT,
    /// § 13.2.5.6
    TagOpen,
    /// § 13.2.5.7
    EndTagOpen,
    /// § 13.2.5.8
    TagName,
    /// § 13.2.5.9 and § 13.2.5.12
    TextLessThanSign,
    /// § 13.2.5.10 and § 13.2.5.13
    TextEndTagOpen,
    /// § 13.2.5.11 and § 13.2.5.14
    TextEndTagName,
    /// § 13.2.5.32
    BeforeAttributeName,
    /// § 13.2.5.33
    AttributeName,
    /// § 13.2.5.34
    AfterAttributeName,
    /// § 13.2.5.35
    BeforeAttributeValue,
    /// § 13.2.5.36 and § 13.2.5.37, with the closing quote.
    AttributeValueQuoted(char),
    /// § 13.2.5.38
    AttributeValueUnquoted,
    /// § 13.2.5.39
    AfterAttributeValueQuoted,
    /// § 13.2.5.40
    SelfClosingStartTag,
    /// § 13.2.5.41
    BogusComment,
    /// § 13.2.5.42
    MarkupDeclarationOpen,
    /// § 13.2.5.43 through § 13.2.5.52
    Comment,
    /// § 13.2.5.53 through § 13.2.5.55
    DOCTYPE,
    /// § 13.2.5.56 onwards; everything up to `>` is skipped.
    AfterDoctypeName,
}

/// [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization)
///
/// Turns decoded text into a flat token list.
///
/// ```
/// use sparrow_html::tokenizer::{HtmlTokenizer, Token};
///
/// let mut tokenizer = HtmlTokenizer::new("<p>hi");
/// tokenizer.run();
/// let tokens = tokenizer.into_tokens();
/// assert_eq!(tokens[0].tag_name(), Some("p"));
/// assert_eq!(tokens[1], Token::Character { data: 'h' });
/// ```
#[derive(Debug)]
pub struct HtmlTokenizer {
    pub(super) input: Vec<char>,
    pub(super) pos: usize,
    pub(super) state: TokenizerState,
    /// RCDATA or RAWTEXT: where the text end-tag states fall back to.
    pub(super) text_state: TokenizerState,
    pub(super) pending: Option<Pending>,
    pub(super) tokens: Vec<Token>,
    pub(super) last_start_tag: Option<String>,
    /// Letters of a candidate `</name` inside RCDATA or RAWTEXT, as written.
    end_tag_letters: String,
    pub(super) done: bool,
}

impl HtmlTokenizer {
    /// A tokenizer over `input`, with newlines normalized.
    ///
    /// [§ 13.2.3.5](https://html.spec.whatwg.org/multipage/parsing.html#preprocessing-the-input-stream)
    /// "Before the tokenization stage, the input stream must be preprocessed
    /// by normalizing newlines."
    #[must_use]
    pub fn new(input: &str) -> Self {
        let mut chars = Vec::with_capacity(input.len());
        let mut rest = input.chars().peekable();
        while let Some(c) = rest.next() {
            if c == '\r' {
                let _ = rest.next_if_eq(&'\n');
                chars.push('\n');
            } else {
                chars.push(c);
            }
        }
        Self {
            input: chars,
            pos: 0,
            state: TokenizerState::Data,
            text_state: TokenizerState::RAWTEXT,
            pending: None,
            tokens: Vec::new(),
            last_start_tag: None,
            end_tag_letters: String::new(),
            done: false,
        }
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> TokenizerState {
        self.state
    }

    /// The tokens produced so far.
    #[must_use]
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Tokenize the whole input. The last token is always
    /// [`Token::EndOfFile`].
    pub fn run(&mut self) {
        while !self.done {
            let c = self.next_char();
            self.step(c);
        }
        trace!(tokens = self.tokens.len(), "tokenized");
    }

    fn step(&mut self, c: Option<char>) {
        match self.state {
            TokenizerState::Data => self.data(c),
            TokenizerState::RCDATA | TokenizerState::RAWTEXT => self.text(c),
            TokenizerState::TagOpen => self.tag_open(c),
            TokenizerState::EndTagOpen => self.end_tag_open(c),
            TokenizerState::TagName => self.tag_name(c),
            TokenizerState::TextLessThanSign => self.text_less_than_sign(c),
            TokenizerState::TextEndTagOpen => self.text_end_tag_open(c),
            TokenizerState::TextEndTagName => self.text_end_tag_name(c),
            TokenizerState::BeforeAttributeName => self.before_attribute_name(c),
            TokenizerState::AttributeName => self.attribute_name(c),
            TokenizerState::AfterAttributeName => self.after_attribute_name(c),
            TokenizerState::BeforeAttributeValue => self.before_attribute_value(c),
            TokenizerState::AttributeValueQuoted(quote) => self.attribute_value_quoted(c, quote),
            TokenizerState::AttributeValueUnquoted => self.attribute_value_unquoted(c),
            TokenizerState::AfterAttributeValueQuoted => self.after_attribute_value_quoted(c),
            TokenizerState::SelfClosingStartTag => self.self_closing_start_tag(c),
            TokenizerState::BogusComment => self.bogus_comment(c),
            TokenizerState::MarkupDeclarationOpen => self.markup_declaration_open(c),
            TokenizerState::Comment => self.comment(c),
            TokenizerState::DOCTYPE => self.doctype(c),
            TokenizerState::AfterDoctypeName => self.after_doctype_name(c),
        }
    }

    // ========== text ==========

    /// [§ 13.2.5.1 Data state](https://html.spec.whatwg.org/multipage/parsing.html#data-state)
    fn data(&mut self, c: Option<char>) {
        match c {
            Some('&') => {
                let text = self.consume_character_reference(false);
                self.emit_str(&text);
            }
            Some('<') => self.state = TokenizerState::TagOpen,
            // unexpected-null-character; the tree builder would drop it.
            Some('\0') => {}
            Some(c) => self.emit_char(c),
            None => self.emit_eof(),
        }
    }

    /// [§ 13.2.5.2 RCDATA state](https://html.spec.whatwg.org/multipage/parsing.html#rcdata-state)
    /// and [§ 13.2.5.3 RAWTEXT state](https://html.spec.whatwg.org/multipage/parsing.html#rawtext-state).
    /// Only RCDATA decodes references.
    fn text(&mut self, c: Option<char>) {
        match c {
            Some('&') if self.state == TokenizerState::RCDATA => {
                let text = self.consume_character_reference(false);
                self.emit_str(&text);
            }
            Some('<') => self.state = TokenizerState::TextLessThanSign,
            Some('\0') => self.emit_char('\u{FFFD}'),
            Some(c) => self.emit_char(c),
            None => self.emit_eof(),
        }
    }

    /// [§ 13.2.5.9 RCDATA less-than sign state](https://html.spec.whatwg.org/multipage/parsing.html#rcdata-less-than-sign-state)
    fn text_less_than_sign(&mut self, c: Option<char>) {
        if c == Some('/') {
            self.end_tag_letters.clear();
            self.state = TokenizerState::TextEndTagOpen;
        } else {
            self.emit_char('<');
            self.reconsume_in(self.text_state, c);
        }
    }

    /// [§ 13.2.5.10 RCDATA end tag open state](https://html.spec.whatwg.org/multipage/parsing.html#rcdata-end-tag-open-state)
    fn text_end_tag_open(&mut self, c: Option<char>) {
        if c.is_some_and(|c| c.is_ascii_alphabetic()) {
            self.begin(Pending::tag(true));
            self.reconsume_in(TokenizerState::TextEndTagName, c);
        } else {
            self.emit_str("</");
            self.reconsume_in(self.text_state, c);
        }
    }

    /// [§ 13.2.5.11 RCDATA end tag name state](https://html.spec.whatwg.org/multipage/parsing.html#rcdata-end-tag-name-state)
    ///
    /// Anything that does not close the element is put back as text.
    fn text_end_tag_name(&mut self, c: Option<char>) {
        match c {
            Some(c) if c.is_ascii_alphabetic() => {
                self.push_name(c.to_ascii_lowercase());
                self.end_tag_letters.push(c);
            }
            Some('>') if self.is_appropriate_end_tag() => self.emit_pending(),
            Some('/') if self.is_appropriate_end_tag() => {
                self.state = TokenizerState::SelfClosingStartTag;
            }
            Some(c) if is_space(c) && self.is_appropriate_end_tag() => {
                self.state = TokenizerState::BeforeAttributeName;
            }
            _ => {
                self.pending = None;
                let letters = std::mem::take(&mut self.end_tag_letters);
                self.emit_str("</");
                self.emit_str(&letters);
                self.reconsume_in(self.text_state, c);
            }
        }
    }

    // ========== tags ==========

    /// [§ 13.2.5.6 Tag open state](https://html.spec.whatwg.org/multipage/parsing.html#tag-open-state)
    fn tag_open(&mut self, c: Option<char>) {
        match c {
            Some('!') => self.state = TokenizerState::MarkupDeclarationOpen,
            Some('/') => self.state = TokenizerState::EndTagOpen,
            Some(l) if l.is_ascii_alphabetic() => {
                self.begin(Pending::tag(false));
                self.reconsume_in(TokenizerState::TagName, c);
            }
            // unexpected-question-mark-instead-of-tag-name: `<?xml ...>`
            Some('?') => {
                self.begin(Pending::comment());
                self.reconsume_in(TokenizerState::BogusComment, c);
            }
            // invalid-first-character-of-tag-name: the `<` is text.
            _ => {
                self.emit_char('<');
                self.reconsume_in(TokenizerState::Data, c);
            }
        }
    }

    /// [§ 13.2.5.7 End tag open state](https://html.spec.whatwg.org/multipage/parsing.html#end-tag-open-state)
    fn end_tag_open(&mut self, c: Option<char>) {
        match c {
            Some(l) if l.is_ascii_alphabetic() => {
                self.begin(Pending::tag(true));
                self.reconsume_in(TokenizerState::TagName, c);
            }
            // missing-end-tag-name: `</>` vanishes.
            Some('>') => self.state = TokenizerState::Data,
            None => {
                self.emit_str("</");
                self.emit_eof();
            }
            Some(_) => {
                self.begin(Pending::comment());
                self.reconsume_in(TokenizerState::BogusComment, c);
            }
        }
    }

    /// [§ 13.2.5.8 Tag name state](https://html.spec.whatwg.org/multipage/parsing.html#tag-name-state)
    fn tag_name(&mut self, c: Option<char>) {
        match c {
            Some(c) if is_space(c) => self.state = TokenizerState::BeforeAttributeName,
            Some('/') => self.state = TokenizerState::SelfClosingStartTag,
            Some('>') => self.emit_pending(),
            Some('\0') => self.push_name('\u{FFFD}'),
            Some(c) => self.push_name(c.to_ascii_lowercase()),
            // eof-in-tag
            None => self.emit_eof(),
        }
    }

    /// [§ 13.2.5.32 Before attribute name state](https://html.spec.whatwg.org/multipage/parsing.html#before-attribute-name-state)
    fn before_attribute_name(&mut self, c: Option<char>) {
        match c {
            Some(c) if is_space(c) => {}
            Some('/' | '>') | None => self.reconsume_in(TokenizerState::AfterAttributeName, c),
            // unexpected-equals-sign-before-attribute-name: `=` starts the name.
            Some('=') => {
                self.begin_attribute();
                self.push_attribute_name('=');
                self.state = TokenizerState::AttributeName;
            }
            Some(_) => {
                self.begin_attribute();
                self.reconsume_in(TokenizerState::AttributeName, c);
            }
        }
    }

    /// [§ 13.2.5.33 Attribute name state](https://html.spec.whatwg.org/multipage/parsing.html#attribute-name-state)
    fn attribute_name(&mut self, c: Option<char>) {
        match c {
            Some('=') => self.state = TokenizerState::BeforeAttributeValue,
            Some('\0') => self.push_attribute_name('\u{FFFD}'),
            Some(ch) if !is_space(ch) && ch != '/' && ch != '>' => {
                self.push_attribute_name(ch.to_ascii_lowercase());
            }
            _ => self.reconsume_in(TokenizerState::AfterAttributeName, c),
        }
    }

    /// [§ 13.2.5.34 After attribute name state](https://html.spec.whatwg.org/multipage/parsing.html#after-attribute-name-state)
    fn after_attribute_name(&mut self, c: Option<char>) {
        match c {
            Some(c) if is_space(c) => {}
            Some('/') => self.state = TokenizerState::SelfClosingStartTag,
            Some('=') => self.state = TokenizerState::BeforeAttributeValue,
            Some('>') => self.emit_pending(),
            None => self.emit_eof(),
            Some(_) => {
                self.begin_attribute();
                self.reconsume_in(TokenizerState::AttributeName, c);
            }
        }
    }

    /// [§ 13.2.5.35 Before attribute value state](https://html.spec.whatwg.org/multipage/parsing.html#before-attribute-value-state)
    fn before_attribute_value(&mut self, c: Option<char>) {
        match c {
            Some(c) if is_space(c) => {}
            Some(quote @ ('"' | '\'')) => {
                self.state = TokenizerState::AttributeValueQuoted(quote);
            }
            // missing-attribute-value: `<a href=>`
            Some('>') => self.emit_pending(),
            _ => self.reconsume_in(TokenizerState::AttributeValueUnquoted, c),
        }
    }

    /// [§ 13.2.5.36 Attribute value (double-quoted) state](https://html.spec.whatwg.org/multipage/parsing.html#attribute-value-(double-quoted)-state)
    fn attribute_value_quoted(&mut self, c: Option<char>, quote: char) {
        match c {
            Some(q) if q == quote => self.state = TokenizerState::AfterAttributeValueQuoted,
            Some('&') => {
                let text = self.consume_character_reference(true);
                self.push_attribute_value(&text);
            }
            Some('\0') => self.push_attribute_value("\u{FFFD}"),
            Some(ch) => self.push_attribute_value(ch.encode_utf8(&mut [0; 4])),
            None => self.emit_eof(),
        }
    }

    /// [§ 13.2.5.38 Attribute value (unquoted) state](https://html.spec.whatwg.org/multipage/parsing.html#attribute-value-(unquoted)-state)
    fn attribute_value_unquoted(&mut self, c: Option<char>) {
        match c {
            Some(ch) if is_space(ch) => self.state = TokenizerState::BeforeAttributeName,
            Some('&') => {
                let text = self.consume_character_reference(true);
                self.push_attribute_value(&text);
            }
            Some('>') => self.emit_pending(),
            Some('\0') => self.push_attribute_value("\u{FFFD}"),
            Some(ch) => self.push_attribute_value(ch.encode_utf8(&mut [0; 4])),
            None => self.emit_eof(),
        }
    }

    /// [§ 13.2.5.39 After attribute value (quoted) state](https://html.spec.whatwg.org/multipage/parsing.html#after-attribute-value-(quoted)-state)
    fn after_attribute_value_quoted(&mut self, c: Option<char>) {
        match c {
            Some(ch) if is_space(ch) => self.state = TokenizerState::BeforeAttributeName,
            Some('/') => self.state = TokenizerState::SelfClosingStartTag,
            Some('>') => self.emit_pending(),
            None => self.emit_eof(),
            // missing-whitespace-between-attributes
            Some(_) => self.reconsume_in(TokenizerState::BeforeAttributeName, c),
        }
    }

    /// [§ 13.2.5.40 Self-closing start tag state](https://html.spec.whatwg.org/multipage/parsing.html#self-closing-start-tag-state)
    fn self_closing_start_tag(&mut self, c: Option<char>) {
        match c {
            Some('>') => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.close_self();
                }
                self.emit_pending();
            }
            None => self.emit_eof(),
            // unexpected-solidus-in-tag
            Some(_) => self.reconsume_in(TokenizerState::BeforeAttributeName, c),
        }
    }

    // ========== markup declarations ==========

    /// [§ 13.2.5.41 Bogus comment state](https://html.spec.whatwg.org/multipage/parsing.html#bogus-comment-state)
    fn bogus_comment(&mut self, c: Option<char>) {
        match c {
            Some('>') => self.emit_pending(),
            Some('\0') => self.push_data('\u{FFFD}'),
            Some(ch) => self.push_data(ch),
            None => self.emit_eof(),
        }
    }

    /// [§ 13.2.5.42 Markup declaration open state](https://html.spec.whatwg.org/multipage/parsing.html#markup-declaration-open-state)
    ///
    /// `c` is the character after `<!`.
    fn markup_declaration_open(&mut self, c: Option<char>) {
        if c == Some('-') && self.peek(0) == Some('-') {
            self.skip(1);
            self.begin(Pending::comment());
            self.state = TokenizerState::Comment;
        } else if c.is_some_and(|c| c.eq_ignore_ascii_case(&'d')) && self.lookahead_is("octype") {
            self.skip("octype".len());
            self.begin(Pending::Doctype(None));
            self.state = TokenizerState::DOCTYPE;
        } else {
            // incorrectly-opened-comment
            self.begin(Pending::comment());
            self.reconsume_in(TokenizerState::BogusComment, c);
        }
    }

    /// [§ 13.2.5.45 Comment state](https://html.spec.whatwg.org/multipage/parsing.html#comment-state)
    ///
    /// Ends at the first `-->` or `--!>`; `<!-->` and `<!--->` are empty
    /// comments.
    fn comment(&mut self, c: Option<char>) {
        match c {
            Some('>') if self.pending.as_mut().is_some_and(Pending::try_close_comment) => {
                self.emit_pending();
            }
            Some('\0') => self.push_data('\u{FFFD}'),
            Some(ch) => self.push_data(ch),
            // eof-in-comment: the comment is still emitted.
            None => self.emit_eof(),
        }
    }

    /// [§ 13.2.5.53 DOCTYPE state](https://html.spec.whatwg.org/multipage/parsing.html#doctype-state)
    fn doctype(&mut self, c: Option<char>) {
        match c {
            Some('>') => self.emit_pending(),
            Some(ch) if is_space(ch) => {
                if self.pending.as_ref().is_some_and(Pending::has_name) {
                    self.state = TokenizerState::AfterDoctypeName;
                }
            }
            Some(ch) => self.push_name(ch.to_ascii_lowercase()),
            None => self.emit_eof(),
        }
    }

    /// [§ 13.2.5.56 After DOCTYPE name state](https://html.spec.whatwg.org/multipage/parsing.html#after-doctype-name-state)
    fn after_doctype_name(&mut self, c: Option<char>) {
        match c {
            Some('>') => self.emit_pending(),
            Some(_) => {}
            None => self.emit_eof(),
        }
    }
}
