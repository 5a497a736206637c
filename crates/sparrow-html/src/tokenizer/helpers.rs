//! Input and output plumbing shared by the tokenizer states.

use super::core::{HtmlTokenizer, TokenizerState};
use super::token::{Pending, Token};

// =============================================================================
// Input
// =============================================================================

impl HtmlTokenizer {
    /// "Consume the next input character"
    pub(super) fn next_char(&mut self) -> Option<char> {
        let c = self.input.get(self.pos).copied()?;
        self.pos += 1;
        Some(c)
    }

    /// "Reconsume in the X state": `c` is read again by `state`.
    pub(super) const fn reconsume_in(&mut self, state: TokenizerState, c: Option<char>) {
        if c.is_some() {
            self.pos -= 1;
        }
        self.state = state;
    }

    /// The unconsumed character `offset` places ahead.
    pub(super) fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    /// Consume `count` characters already inspected with [`Self::peek`].
    pub(super) fn skip(&mut self, count: usize) {
        self.pos = (self.pos + count).min(self.input.len());
    }

    /// ASCII case-insensitive lookahead for `word`.
    pub(super) fn lookahead_is(&self, word: &str) -> bool {
        word.chars()
            .enumerate()
            .all(|(i, w)| self.peek(i).is_some_and(|c| c.eq_ignore_ascii_case(&w)))
    }
}

/// Tab, LF, FF and space. CR is gone after newline normalization.
pub(super) const fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0C')
}

// =============================================================================
// Pending token
// =============================================================================

impl HtmlTokenizer {
    pub(super) fn begin(&mut self, pending: Pending) {
        self.pending = Some(pending);
    }

    pub(super) fn push_name(&mut self, c: char) {
        if let Some(pending) = self.pending.as_mut() {
            pending.push_name(c);
        }
    }

    pub(super) fn begin_attribute(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            pending.begin_attribute();
        }
    }

    pub(super) fn push_attribute_name(&mut self, c: char) {
        if let Some(attr) = self.pending.as_mut().and_then(Pending::attribute) {
            attr.name.push(c);
        }
    }

    pub(super) fn push_attribute_value(&mut self, s: &str) {
        if let Some(attr) = self.pending.as_mut().and_then(Pending::attribute) {
            attr.value.push_str(s);
        }
    }

    pub(super) fn push_data(&mut self, c: char) {
        if let Some(pending) = self.pending.as_mut() {
            pending.push_data(c);
        }
    }

    /// [§ 13.2.5.11](https://html.spec.whatwg.org/multipage/parsing.html#appropriate-end-tag-token)
    ///
    /// True when the pending end tag names the last start tag emitted.
    pub(super) fn is_appropriate_end_tag(&self) -> bool {
        let pending = self.pending.as_ref().and_then(Pending::end_tag_name);
        pending.is_some() && pending == self.last_start_tag.as_deref()
    }
}

// =============================================================================
// Output
// =============================================================================

impl HtmlTokenizer {
    pub(super) fn emit_char(&mut self, c: char) {
        self.tokens.push(Token::Character { data: c });
    }

    pub(super) fn emit_str(&mut self, s: &str) {
        self.tokens.extend(s.chars().map(|c| Token::Character { data: c }));
    }

    /// "Emit the current token", then go back to the data state, or to the
    /// text state a raw-text start tag asks for.
    ///
    /// The tree builder runs only after tokenizing is done, so the switch it
    /// would make on `<title>` or `<script>` happens here.
    pub(super) fn emit_pending(&mut self) {
        self.state = TokenizerState::Data;
        let Some(pending) = self.pending.take() else {
            return;
        };
        let token = pending.finish();
        if let Token::StartTag { name, .. } = &token {
            if let Some(state) = text_state_for(name) {
                self.state = state;
                self.text_state = state;
            }
            self.last_start_tag = Some(name.clone());
        }
        self.tokens.push(token);
    }

    /// Emit end-of-file. A half-built tag is lost; a comment or DOCTYPE is
    /// emitted first.
    pub(super) fn emit_eof(&mut self) {
        if let Some(pending) = self.pending.take()
            && !matches!(pending, Pending::Tag { .. })
        {
            self.tokens.push(pending.finish());
        }
        self.tokens.push(Token::EndOfFile);
        self.done = true;
    }
}

/// [§ 13.2.6.2](https://html.spec.whatwg.org/multipage/parsing.html#generic-rcdata-element-parsing-algorithm)
/// and [§ 13.2.6.3](https://html.spec.whatwg.org/multipage/parsing.html#generic-raw-text-element-parsing-algorithm).
/// Script data is read as RAWTEXT.
fn text_state_for(tag: &str) -> Option<TokenizerState> {
    match tag {
        "title" | "textarea" => Some(TokenizerState::RCDATA),
        "style" | "script" | "xmp" | "iframe" | "noembed" | "noframes" => {
            Some(TokenizerState::RAWTEXT)
        }
        _ => None,
    }
}
