//! Character reference decoding.
//!
//! [§ 13.2.5.72 Character reference state](https://html.spec.whatwg.org/multipage/parsing.html#character-reference-state)
//!
//! The full named table has over two thousand entries; only the references
//! that show up in ordinary form pages are kept here. Unknown names are left
//! in the text as written.

use crate::charset::WINDOWS_1252_C1;

use super::core::HtmlTokenizer;

/// Named references with their replacement text. Names include the trailing
/// semicolon; the legacy forms that may omit it are listed in [`LEGACY`].
const NAMED: &[(&str, &str)] = &[
    ("amp;", "&"),
    ("lt;", "<"),
    ("gt;", ">"),
    ("quot;", "\""),
    ("apos;", "'"),
    ("nbsp;", "\u{00A0}"),
    ("copy;", "\u{00A9}"),
    ("reg;", "\u{00AE}"),
    ("trade;", "\u{2122}"),
    ("mdash;", "\u{2014}"),
    ("ndash;", "\u{2013}"),
    ("hellip;", "\u{2026}"),
    ("bull;", "\u{2022}"),
    ("middot;", "\u{00B7}"),
    ("lsquo;", "\u{2018}"),
    ("rsquo;", "\u{2019}"),
    ("ldquo;", "\u{201C}"),
    ("rdquo;", "\u{201D}"),
    ("laquo;", "\u{00AB}"),
    ("raquo;", "\u{00BB}"),
    ("cent;", "\u{00A2}"),
    ("pound;", "\u{00A3}"),
    ("euro;", "\u{20AC}"),
    ("yen;", "\u{00A5}"),
    ("sect;", "\u{00A7}"),
    ("para;", "\u{00B6}"),
    ("deg;", "\u{00B0}"),
    ("times;", "\u{00D7}"),
    ("divide;", "\u{00F7}"),
    ("plusmn;", "\u{00B1}"),
    ("ne;", "\u{2260}"),
    ("le;", "\u{2264}"),
    ("ge;", "\u{2265}"),
    ("frac12;", "\u{00BD}"),
    ("frac14;", "\u{00BC}"),
    ("frac34;", "\u{00BE}"),
    ("larr;", "\u{2190}"),
    ("rarr;", "\u{2192}"),
    ("uarr;", "\u{2191}"),
    ("darr;", "\u{2193}"),
    ("iexcl;", "\u{00A1}"),
    ("iquest;", "\u{00BF}"),
    ("shy;", "\u{00AD}"),
    ("zwnj;", "\u{200C}"),
    ("zwj;", "\u{200D}"),
    ("Agrave;", "\u{00C0}"),
    ("Aacute;", "\u{00C1}"),
    ("Auml;", "\u{00C4}"),
    ("Ccedil;", "\u{00C7}"),
    ("Eacute;", "\u{00C9}"),
    ("Ntilde;", "\u{00D1}"),
    ("Ouml;", "\u{00D6}"),
    ("Uuml;", "\u{00DC}"),
    ("szlig;", "\u{00DF}"),
    ("agrave;", "\u{00E0}"),
    ("aacute;", "\u{00E1}"),
    ("auml;", "\u{00E4}"),
    ("ccedil;", "\u{00E7}"),
    ("egrave;", "\u{00E8}"),
    ("eacute;", "\u{00E9}"),
    ("ntilde;", "\u{00F1}"),
    ("ouml;", "\u{00F6}"),
    ("uuml;", "\u{00FC}"),
];

/// "If the character reference was consumed as part of an attribute ... and
/// the last character matched is not a U+003B SEMICOLON" these names still
/// match without it.
const LEGACY: &[&str] = &["amp", "lt", "gt", "quot", "nbsp", "copy", "reg"];

/// Longest identifier in [`NAMED`], semicolon included.
const MAX_NAME_LEN: usize = 8;

/// Look up a named reference. `name` excludes the ampersand.
#[must_use]
pub fn lookup_entity(name: &str) -> Option<&'static str> {
    NAMED
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
        .or_else(|| {
            LEGACY.iter().find(|n| **n == name).and_then(|n| {
                NAMED
                    .iter()
                    .find(|(full, _)| full.strip_suffix(';') == Some(n))
                    .map(|(_, v)| *v)
            })
        })
}

/// [§ 13.2.5.80 Numeric character reference end state](https://html.spec.whatwg.org/multipage/parsing.html#numeric-character-reference-end-state)
///
/// Map a parsed code point to the character it stands for.
#[must_use]
pub fn numeric_reference_char(code: u32) -> char {
    match code {
        // "If the number is 0x00 ... set the character reference code to 0xFFFD."
        // "If the number is greater than 0x10FFFF ... set it to 0xFFFD."
        0 | 0x11_0000.. => '\u{FFFD}',
        // "If the number is one of the numbers in the first column of the
        // following table, then find the row with that number in the first
        // column, and set the character reference code to the number in the
        // second column." (the windows-1252 C1 block)
        0x80..=0x9F => WINDOWS_1252_C1[(code - 0x80) as usize],
        // Surrogates are rejected by char::from_u32.
        _ => char::from_u32(code).unwrap_or('\u{FFFD}'),
    }
}

impl HtmlTokenizer {
    /// Consume a character reference after an `&` has been consumed and
    /// return its replacement text. When nothing matches, nothing is consumed
    /// and `&` is returned, so the following characters are tokenized as usual.
    pub(super) fn consume_character_reference(&mut self, in_attribute: bool) -> String {
        match self.peek(0) {
            Some('#') => self.consume_numeric_reference(),
            Some(c) if c.is_ascii_alphanumeric() => self.consume_named_reference(in_attribute),
            _ => "&".to_string(),
        }
    }

    /// [§ 13.2.5.73 Named character reference state](https://html.spec.whatwg.org/multipage/parsing.html#named-character-reference-state)
    ///
    /// "Consume the maximum number of characters possible, where the consumed
    /// characters are one of the identifiers in the first column of the named
    /// character references table."
    fn consume_named_reference(&mut self, in_attribute: bool) -> String {
        let mut candidate = String::new();
        for offset in 0..MAX_NAME_LEN {
            match self.peek(offset) {
                Some(c) if c.is_ascii_alphanumeric() => candidate.push(c),
                Some(';') => {
                    candidate.push(';');
                    break;
                }
                _ => break,
            }
        }

        // Longest match first.
        let mut end = candidate.len();
        while end > 0 {
            let name = &candidate[..end];
            if let Some(replacement) = lookup_entity(name) {
                let next = self.peek(end);
                // "If the character reference was consumed as part of an
                // attribute, and the last character matched is not a U+003B
                // SEMICOLON character (;), and the next input character is
                // either a U+003D EQUALS SIGN character (=) or an ASCII
                // alphanumeric, then, for historical reasons, flush code points
                // consumed as a character reference."
                if in_attribute
                    && !name.ends_with(';')
                    && next.is_some_and(|c| c == '=' || c.is_ascii_alphanumeric())
                {
                    return "&".to_string();
                }
                self.skip(name.len());
                return replacement.to_string();
            }
            end -= 1;
        }
        "&".to_string()
    }

    /// [§ 13.2.5.75 Numeric character reference state](https://html.spec.whatwg.org/multipage/parsing.html#numeric-character-reference-state)
    fn consume_numeric_reference(&mut self) -> String {
        let hex = matches!(self.peek(1), Some('x' | 'X'));
        let prefix_len = if hex { 2 } else { 1 };
        let radix = if hex { 16 } else { 10 };

        let mut digits = String::new();
        while let Some(c) = self.peek(prefix_len + digits.len()) {
            if c.is_digit(radix) {
                digits.push(c);
            } else {
                break;
            }
        }

        // "absence-of-digits-in-numeric-character-reference parse error ...
        // flush code points consumed as a character reference"
        if digits.is_empty() {
            return "&".to_string();
        }

        let code = u32::from_str_radix(&digits, radix).unwrap_or(u32::MAX);
        self.skip(prefix_len + digits.len());
        // "missing-semicolon-after-character-reference parse error" is
        // recovered by not requiring it.
        if self.peek(0) == Some(';') {
            self.skip(1);
        }
        numeric_reference_char(code).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_entity_semicolon_and_legacy() {
        assert_eq!(lookup_entity("amp;"), Some("&"));
        assert_eq!(lookup_entity("amp"), Some("&"));
        assert_eq!(lookup_entity("hellip"), None);
        assert_eq!(lookup_entity("hellip;"), Some("\u{2026}"));
    }

    #[test]
    fn test_numeric_reference_remaps() {
        assert_eq!(numeric_reference_char(0x41), 'A');
        assert_eq!(numeric_reference_char(0), '\u{FFFD}');
        assert_eq!(numeric_reference_char(0x80), '\u{20AC}');
        assert_eq!(numeric_reference_char(0xD800), '\u{FFFD}');
        assert_eq!(numeric_reference_char(0x11_0000), '\u{FFFD}');
    }

    #[test]
    fn test_max_name_len_covers_table() {
        assert!(NAMED.iter().all(|(n, _)| n.len() <= MAX_NAME_LEN));
    }
}
