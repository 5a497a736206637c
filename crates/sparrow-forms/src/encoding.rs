//! Entry lists and the three form submission encodings.
//!
//! [§ 4.10.21.8 Plain text form data](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#text/plain-encoding-algorithm),
//! [§ 4.10.21.7 Multipart form data](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#multipart-form-data),
//! and the `application/x-www-form-urlencoded` serializer from the URL
//! standard.

use std::borrow::Cow;

use sparrow_html::Charset;
use strum_macros::{Display, EnumString};
use tracing::{debug, trace};
use url::form_urlencoded::{self, EncodingOverride};
use uuid::Uuid;

use crate::control::FileSelection;

/// [§ 4.10.18.6](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#attr-fs-enctype)
/// The `enctype` attribute. "The invalid value default and missing value
/// default are both the application/x-www-form-urlencoded state."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Enctype {
    /// `application/x-www-form-urlencoded`
    #[default]
    #[strum(to_string = "application/x-www-form-urlencoded")]
    UrlEncoded,
    /// `multipart/form-data`
    #[strum(to_string = "multipart/form-data")]
    Multipart,
    /// `text/plain`
    #[strum(to_string = "text/plain")]
    TextPlain,
}

impl Enctype {
    /// Interpret an `enctype`/`formenctype` attribute value.
    #[must_use]
    pub fn from_attribute(value: &str) -> Self {
        value.trim().parse().unwrap_or_default()
    }
}

/// The value half of a form entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// A string value.
    Text(String),
    /// A file, sent as a file part by multipart and as its name otherwise.
    File(FileSelection),
}

impl FormValue {
    /// The value as the string encodings see it.
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::File(file) => &file.filename,
        }
    }
}

/// One `(name, value)` pair of an entry list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormEntry {
    /// Entry name.
    pub name: String,
    /// Entry value.
    pub value: FormValue,
}

impl FormEntry {
    /// A string entry.
    #[must_use]
    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: FormValue::Text(value.to_string()),
        }
    }

    /// A file entry.
    #[must_use]
    pub fn file(name: &str, file: FileSelection) -> Self {
        Self {
            name: name.to_string(),
            value: FormValue::File(file),
        }
    }
}

/// [§ 4.10.21.4](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#constructing-the-form-data-set)
///
/// "Replace every occurrence of U+000D (CR) not followed by U+000A (LF), and
/// every occurrence of U+000A (LF) not preceded by U+000D (CR), by a string
/// consisting of a U+000D (CR) and U+000A (LF)."
#[must_use]
pub fn normalize_newlines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    let _ = chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            c => out.push(c),
        }
    }
    out
}

/// `application/x-www-form-urlencoded` serialization in `charset`. Spaces
/// become `+`.
#[must_use]
pub fn urlencoded(entries: &[FormEntry], charset: Charset) -> String {
    let encoding: EncodingOverride<'_> = match charset.output() {
        Charset::Windows1252 => Some(&encode_windows_1252),
        _ => None,
    };
    form_urlencoded::Serializer::new(String::new())
        .encoding_override(encoding)
        .extend_pairs(entries.iter().map(|e| (e.name.as_str(), e.value.as_text())))
        .finish()
}

fn encode_windows_1252(s: &str) -> Cow<'_, [u8]> {
    Charset::Windows1252.encode(s)
}

/// [text/plain encoding algorithm](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#text/plain-encoding-algorithm)
///
/// "For each name → value of pairs: Append name, a single U+003D EQUALS
/// SIGN character (=), value, a U+000D CARRIAGE RETURN (CR) character, and a
/// U+000A LINE FEED (LF) character to result." The result is encoded in
/// `charset`.
#[must_use]
pub fn text_plain(entries: &[FormEntry], charset: Charset) -> Vec<u8> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.name);
        out.push('=');
        out.push_str(entry.value.as_text());
        out.push_str("\r\n");
    }
    charset.encode(&out).into_owned()
}

/// An encoded `multipart/form-data` body (RFC 7578).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multipart {
    /// The boundary delimiting parts. Occurs in no name, filename or payload.
    pub boundary: String,
    /// The encoded body.
    pub body: Vec<u8>,
}

/// Caller-supplied boundary candidates tried before falling back to random
/// ones.
const MAX_BOUNDARY_DRAWS: usize = 32;

/// One entry with its name and payload already encoded.
struct Part<'a> {
    name: Vec<u8>,
    filename: Option<Vec<u8>>,
    content_type: Option<&'a str>,
    payload: Cow<'a, [u8]>,
}

impl Part<'_> {
    fn contains(&self, needle: &[u8]) -> bool {
        contains(&self.name, needle)
            || self.filename.as_deref().is_some_and(|f| contains(f, needle))
            || self.content_type.is_some_and(|t| contains(t.as_bytes(), needle))
            || contains(&self.payload, needle)
    }
}

impl Multipart {
    /// Encode `entries` in `charset` with a fresh random boundary.
    #[must_use]
    pub fn encode(entries: &[FormEntry], charset: Charset) -> Self {
        Self::encode_with(entries, charset, random_boundary)
    }

    /// Encode `entries` in `charset`, drawing boundary candidates from
    /// `next_boundary` until one occurs in none of the entries.
    ///
    /// After a bounded number of rejected candidates, random boundaries are
    /// drawn instead.
    #[must_use]
    pub fn encode_with(
        entries: &[FormEntry],
        charset: Charset,
        mut next_boundary: impl FnMut() -> String,
    ) -> Self {
        let parts: Vec<Part<'_>> = entries
            .iter()
            .map(|entry| encode_part(entry, charset))
            .collect();

        let mut draws = 0;
        let boundary = loop {
            let candidate = if draws < MAX_BOUNDARY_DRAWS {
                next_boundary()
            } else {
                random_boundary()
            };
            draws += 1;
            if !parts.iter().any(|part| part.contains(candidate.as_bytes())) {
                break candidate;
            }
            trace!(%candidate, "boundary occurs in form data, drawing another");
            if draws == MAX_BOUNDARY_DRAWS {
                debug!("boundary candidates exhausted, using random boundaries");
            }
        };

        let mut body = Vec::new();
        for part in &parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(b"Content-Disposition: form-data; name=\"");
            body.extend_from_slice(&part.name);
            body.push(b'"');
            if let Some(filename) = &part.filename {
                body.extend_from_slice(b"; filename=\"");
                body.extend_from_slice(filename);
                body.push(b'"');
            }
            if let Some(content_type) = part.content_type {
                body.extend_from_slice(format!("\r\nContent-Type: {content_type}").as_bytes());
            }
            body.extend_from_slice(b"\r\n\r\n");
            body.extend_from_slice(&part.payload);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Self { boundary, body }
    }

    /// The `Content-Type` header value for this body.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("{}; boundary={}", Enctype::Multipart, self.boundary)
    }
}

/// "For field names and filenames for file fields, the result of the
/// encoding in the previous bullet point must be escaped by replacing any
/// 0x0A (LF) bytes with the byte sequence `%0A`, 0x0D (CR) with `%0D` and
/// 0x22 (") with `%22`."
fn escape_field(s: &str) -> String {
    s.replace('\n', "%0A")
        .replace('\r', "%0D")
        .replace('"', "%22")
}

fn random_boundary() -> String {
    format!("sparrow-{}", Uuid::new_v4().simple())
}

fn encode_part(entry: &FormEntry, charset: Charset) -> Part<'_> {
    let name = charset.encode(&escape_field(&entry.name)).into_owned();
    match &entry.value {
        FormValue::Text(value) => Part {
            name,
            filename: None,
            content_type: None,
            payload: charset.encode(value),
        },
        FormValue::File(file) => Part {
            name,
            filename: Some(charset.encode(&escape_field(&file.filename)).into_owned()),
            content_type: Some(&file.content_type),
            payload: Cow::Borrowed(&file.data),
        },
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    // An empty boundary would delimit nothing.
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enctype_from_attribute() {
        assert_eq!(Enctype::from_attribute("Multipart/Form-Data"), Enctype::Multipart);
        assert_eq!(Enctype::from_attribute(" text/plain "), Enctype::TextPlain);
        assert_eq!(Enctype::from_attribute("application/json"), Enctype::UrlEncoded);
        assert_eq!(Enctype::UrlEncoded.to_string(), "application/x-www-form-urlencoded");
    }

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines("a\nb\rc\r\nd\r"), "a\r\nb\r\nc\r\nd\r\n");
        assert_eq!(normalize_newlines("plain"), "plain");
    }

    #[test]
    fn test_urlencoded_space_and_reserved() {
        let entries = [FormEntry::text("q", "a b&c=d"), FormEntry::text("é", "~")];
        assert_eq!(urlencoded(&entries, Charset::Utf8), "q=a+b%26c%3Dd&%C3%A9=%7E");
    }

    #[test]
    fn test_text_plain() {
        let entries = [
            FormEntry::text("a", "1"),
            FormEntry::file("f", FileSelection::new("x.txt", b"ignored".to_vec())),
        ];
        assert_eq!(text_plain(&entries, Charset::Utf8), b"a=1\r\nf=x.txt\r\n");
    }

    #[test]
    fn test_multipart_layout() {
        let entries = [
            FormEntry::text("say\"hi\"", "hello"),
            FormEntry::file(
                "upload",
                FileSelection::new("a.txt", b"data".to_vec()).with_content_type("text/plain"),
            ),
        ];
        let multipart = Multipart::encode_with(&entries, Charset::Utf8, || "XYZ".to_string());
        let expected = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"say%22hi%22\"\r\n\r\nhello\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\r\ndata\r\n\
            --XYZ--\r\n";
        assert_eq!(String::from_utf8(multipart.body).unwrap(), expected);
    }

    #[test]
    fn test_multipart_boundary_redrawn_on_collision() {
        let entries = [FormEntry::text("a", "contains BOUNDARY-1 inside")];
        let mut candidates = ["BOUNDARY-1", "", "BOUNDARY-2"].into_iter();
        let multipart = Multipart::encode_with(&entries, Charset::Utf8, || {
            candidates.next().unwrap_or_default().to_string()
        });
        assert_eq!(multipart.boundary, "BOUNDARY-2");
        assert_eq!(
            multipart.content_type(),
            "multipart/form-data; boundary=BOUNDARY-2"
        );
    }

    #[test]
    fn test_multipart_gives_up_on_colliding_candidates() {
        let entries = [FormEntry::text("a", "1")];
        let mut draws = 0;
        let multipart = Multipart::encode_with(&entries, Charset::Utf8, || {
            draws += 1;
            String::new()
        });
        assert_eq!(draws, MAX_BOUNDARY_DRAWS);
        assert!(multipart.boundary.starts_with("sparrow-"));
        assert!(!entries[0].value.as_text().contains(&multipart.boundary));
    }

    #[test]
    fn test_windows_1252_encodings() {
        let entries = [FormEntry::text("q", "caf\u{e9} \u{3042}")];
        assert_eq!(
            urlencoded(&entries, Charset::Windows1252),
            "q=caf%E9+%26%2312354%3B"
        );
        assert_eq!(
            text_plain(&entries, Charset::Windows1252),
            b"q=caf\xE9 &#12354;\r\n"
        );
        let multipart = Multipart::encode_with(&entries, Charset::Windows1252, || "B".to_string());
        assert_eq!(
            multipart.body,
            b"--B\r\nContent-Disposition: form-data; name=\"q\"\r\n\r\ncaf\xE9 &#12354;\r\n--B--\r\n"
        );
    }
}
