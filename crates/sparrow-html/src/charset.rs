//! Character encoding detection and decoding.
//!
//! [§ 13.2.3 The input byte stream](https://html.spec.whatwg.org/multipage/parsing.html#the-input-byte-stream)
//!
//! Only the encodings that real form pages use are supported: UTF-8,
//! UTF-16 in both byte orders, and windows-1252 (which also serves every
//! label that the Encoding Standard maps to it, such as `iso-8859-1`).

use std::borrow::Cow;

use strum_macros::{Display, EnumString};
use tracing::debug;

/// A supported character encoding.
///
/// Parsing accepts the usual labels, case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Charset {
    /// UTF-8.
    #[strum(
        to_string = "UTF-8",
        serialize = "utf8",
        serialize = "unicode-1-1-utf-8"
    )]
    Utf8,
    /// UTF-16, little endian.
    #[strum(to_string = "UTF-16LE", serialize = "utf-16", serialize = "unicode")]
    Utf16Le,
    /// UTF-16, big endian.
    #[strum(to_string = "UTF-16BE")]
    Utf16Be,
    /// windows-1252, the superset of ISO-8859-1 that browsers use for it.
    #[strum(
        to_string = "windows-1252",
        serialize = "iso-8859-1",
        serialize = "iso8859-1",
        serialize = "iso_8859-1",
        serialize = "latin1",
        serialize = "l1",
        serialize = "cp1252",
        serialize = "x-cp1252",
        serialize = "cp819",
        serialize = "ascii",
        serialize = "us-ascii"
    )]
    Windows1252,
}

impl Charset {
    /// [Encoding § 4.2 Names and labels](https://encoding.spec.whatwg.org/#concept-encoding-get)
    ///
    /// "Remove any leading and trailing ASCII whitespace from label." then
    /// match it case-insensitively. Returns `None` for unsupported labels.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        label
            .trim_matches(|c: char| c.is_ascii_whitespace())
            .parse()
            .ok()
    }

    /// Decode `bytes` to a string. Invalid sequences become U+FFFD.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Self::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Self::Windows1252 => bytes.iter().map(|&b| windows_1252_char(b)).collect(),
        }
    }

    /// [Encoding § 4.3 Output encodings](https://encoding.spec.whatwg.org/#get-an-output-encoding)
    ///
    /// "If encoding is replacement or UTF-16BE/LE, then return UTF-8."
    #[must_use]
    pub const fn output(self) -> Self {
        match self {
            Self::Utf16Le | Self::Utf16Be => Self::Utf8,
            other => other,
        }
    }

    /// Encode `text` in this charset's output encoding.
    ///
    /// A character windows-1252 cannot represent becomes a `&#N;` decimal
    /// reference, the "html" error mode form submission uses.
    #[must_use]
    pub fn encode(self, text: &str) -> Cow<'_, [u8]> {
        match self.output() {
            Self::Windows1252 if !text.is_ascii() => {
                let mut out = Vec::with_capacity(text.len());
                for c in text.chars() {
                    match windows_1252_byte(c) {
                        Some(b) => out.push(b),
                        None => out.extend_from_slice(format!("&#{};", u32::from(c)).as_bytes()),
                    }
                }
                Cow::Owned(out)
            }
            _ => Cow::Borrowed(text.as_bytes()),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let chunks = bytes.chunks_exact(2);
    let odd_tail = !chunks.remainder().is_empty();
    let units = chunks.map(|pair| unit([pair[0], pair[1]]));
    let mut out: String = char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if odd_tail {
        out.push(char::REPLACEMENT_CHARACTER);
    }
    out
}

/// windows-1252 mappings for bytes 0x80 to 0x9F. Bytes the encoding leaves
/// undefined map to the C1 control of the same value.
pub(crate) const WINDOWS_1252_C1: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

fn windows_1252_char(b: u8) -> char {
    match b {
        0x80..=0x9F => WINDOWS_1252_C1[usize::from(b - 0x80)],
        _ => char::from(b),
    }
}

fn windows_1252_byte(c: char) -> Option<u8> {
    match u32::from(c) {
        0x00..=0x7F | 0xA0..=0xFF => u8::try_from(u32::from(c)).ok(),
        _ => WINDOWS_1252_C1
            .iter()
            .position(|&mapped| mapped == c)
            .and_then(|index| u8::try_from(0x80 + index).ok()),
    }
}

/// Outcome of encoding sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detected {
    /// The encoding to decode with.
    pub charset: Charset,
    /// Length of the byte order mark to skip, 0 if none.
    pub bom_len: usize,
}

/// [§ 13.2.3.2 Determining the character encoding](https://html.spec.whatwg.org/multipage/parsing.html#determining-the-character-encoding)
///
/// STEP 1: BOM sniffing.
/// STEP 2: the transport layer's declared encoding (`transport`).
/// STEP 3: the `<meta>` prescan of the first 1024 bytes.
/// STEP 4: UTF-8 if the bytes are valid UTF-8, else windows-1252.
///
/// An unsupported `transport` label is skipped here; callers that need to
/// reject it check [`Charset::from_label`] first.
#[must_use]
pub fn detect(bytes: &[u8], transport: Option<&str>) -> Detected {
    // STEP 1
    if let Some(detected) = sniff_bom(bytes) {
        debug!(charset = %detected.charset, "encoding from BOM");
        return detected;
    }

    // STEP 2
    if let Some(charset) = transport.and_then(Charset::from_label) {
        debug!(%charset, "encoding from transport");
        return Detected {
            charset,
            bom_len: 0,
        };
    }

    // STEP 3
    if let Some(charset) = prescan(bytes) {
        debug!(%charset, "encoding from <meta> prescan");
        return Detected {
            charset,
            bom_len: 0,
        };
    }

    // STEP 4
    let charset = if std::str::from_utf8(bytes).is_ok() {
        Charset::Utf8
    } else {
        Charset::Windows1252
    };
    debug!(%charset, "encoding from content");
    Detected {
        charset,
        bom_len: 0,
    }
}

/// [Encoding § 6 BOM sniff](https://encoding.spec.whatwg.org/#bom-sniff)
fn sniff_bom(bytes: &[u8]) -> Option<Detected> {
    let (charset, bom_len) = match bytes {
        [0xEF, 0xBB, 0xBF, ..] => (Charset::Utf8, 3),
        [0xFE, 0xFF, ..] => (Charset::Utf16Be, 2),
        [0xFF, 0xFE, ..] => (Charset::Utf16Le, 2),
        _ => return None,
    };
    Some(Detected { charset, bom_len })
}

/// [§ 13.2.3.3 Prescan a byte stream to determine its encoding](https://html.spec.whatwg.org/multipage/parsing.html#prescan-a-byte-stream-to-determine-its-encoding)
///
/// Simplified: every `<meta` tag in the first 1024 bytes is searched for a
/// `charset=` value, which covers both `<meta charset=...>` and the
/// `content="text/html; charset=..."` pragma.
fn prescan(bytes: &[u8]) -> Option<Charset> {
    let head = &bytes[..bytes.len().min(1024)];
    let lower: Vec<u8> = head.iter().map(u8::to_ascii_lowercase).collect();

    let mut pos = 0;
    while let Some(start) = find(&lower[pos..], b"<meta") {
        let tag_start = pos + start + 5;
        let tag_end = find(&lower[tag_start..], b">").map_or(lower.len(), |e| tag_start + e);
        let tag = &lower[tag_start..tag_end];
        if let Some(label) = charset_in_tag(tag)
            && let Some(charset) = Charset::from_label(&label)
        {
            // "If charset is UTF-16BE/LE, then set charset to UTF-8."
            return Some(match charset {
                Charset::Utf16Le | Charset::Utf16Be => Charset::Utf8,
                other => other,
            });
        }
        pos = tag_end;
    }
    None
}

fn charset_in_tag(tag: &[u8]) -> Option<String> {
    let at = find(tag, b"charset")?;
    let rest = &tag[at + 7..];
    let rest = trim_start(rest);
    let rest = trim_start(rest.strip_prefix(b"=")?);
    let rest = rest
        .strip_prefix(b"\"")
        .or_else(|| rest.strip_prefix(b"'"))
        .unwrap_or(rest);
    let end = rest
        .iter()
        .position(|b| matches!(b, b'"' | b'\'' | b';' | b'/' | b'>') || b.is_ascii_whitespace())
        .unwrap_or(rest.len());
    (end > 0).then(|| String::from_utf8_lossy(&rest[..end]).into_owned())
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &bytes[skip..]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
