//! The parsed document: a [`DomTree`] plus the URL it was loaded from.

use std::io::Read;

use sparrow_common::urls::{resolve_url, without_fragment};
use sparrow_dom::{DomTree, MatchingElements, NodeId};
use tracing::debug;
use url::Url;

use crate::charset::{self, Charset};
use crate::error::{ParseError, Result};
use crate::parser::TreeBuilder;
use crate::refresh::{Refresh, parse_refresh};
use crate::tokenizer::HtmlTokenizer;

/// A hyperlink found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The `href` attribute as written.
    pub href: String,
    /// `href` resolved against the document's base URL.
    pub url: Url,
    /// Text content of the anchor, whitespace collapsed.
    pub text: String,
    /// The `a` element.
    pub node: NodeId,
}

/// A parsed HTML document.
///
/// Immutable once built; sessions share it behind an `Arc` and replace it
/// wholesale on navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTree {
    dom: DomTree,
    url: Url,
    charset: Charset,
}

impl HtmlTree {
    /// Parse `bytes` fetched from `url`.
    ///
    /// `encoding_hint` is an explicitly requested encoding label, such as the
    /// `charset` parameter of a `Content-Type` header. Without it the
    /// encoding is sniffed.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnsupportedEncoding`] if `encoding_hint` names an
    /// encoding that cannot be decoded. Markup errors are always recovered.
    pub fn parse(bytes: &[u8], encoding_hint: Option<&str>, url: Url) -> Result<Self> {
        if let Some(label) = encoding_hint
            && Charset::from_label(label).is_none()
        {
            return Err(ParseError::UnsupportedEncoding(label.to_string()));
        }

        let detected = charset::detect(bytes, encoding_hint);
        let text = detected.charset.decode(&bytes[detected.bom_len..]);
        debug!(%url, charset = %detected.charset, bytes = bytes.len(), "parsing document");
        Ok(Self::build(&text, url, detected.charset))
    }

    /// Parse an already-decoded string.
    #[must_use]
    pub fn parse_str(html: &str, url: Url) -> Self {
        Self::build(html, url, Charset::Utf8)
    }

    /// Read `reader` to the end, then parse as [`HtmlTree::parse`] does.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnterminatedStream`] if the reader fails before
    /// end of input, and [`ParseError::UnsupportedEncoding`] as for
    /// [`HtmlTree::parse`].
    pub fn parse_reader<R: Read>(
        mut reader: R,
        encoding_hint: Option<&str>,
        url: Url,
    ) -> Result<Self> {
        let mut bytes = Vec::new();
        let _ = reader
            .read_to_end(&mut bytes)
            .map_err(|e| ParseError::UnterminatedStream(e.to_string()))?;
        Self::parse(&bytes, encoding_hint, url)
    }

    fn build(text: &str, url: Url, charset: Charset) -> Self {
        // One leading BOM is dropped; the tokenizer would keep it as text.
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
        let mut tokenizer = HtmlTokenizer::new(text);
        tokenizer.run();
        let dom = TreeBuilder::new().build(tokenizer.into_tokens());
        Self { dom, url, charset }
    }

    /// The node tree.
    #[must_use]
    pub const fn dom(&self) -> &DomTree {
        &self.dom
    }

    /// The URL the document was loaded from.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The encoding the bytes were decoded with.
    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// [§ 2.4.1 Document base URL](https://html.spec.whatwg.org/multipage/urls-and-fetching.html#document-base-url)
    ///
    /// "If there is no base element that has an href attribute in the
    /// Document, then return the Document's fallback base URL. Otherwise,
    /// return the frozen base URL of the first base element in the Document
    /// that has an href attribute, in tree order."
    ///
    /// The fragment is always removed.
    #[must_use]
    pub fn base_url(&self) -> Url {
        let base_href = self
            .dom
            .find_all("base")
            .find_map(|id| self.dom.attr(id, "href"));
        let base = base_href
            .and_then(|href| resolve_url(href, &self.url).ok())
            .unwrap_or_else(|| self.url.clone());
        without_fragment(&base)
    }

    /// Resolve `href` against the document's base URL.
    ///
    /// # Errors
    ///
    /// Returns the URL parser's error when `href` cannot be resolved.
    pub fn resolve_url(&self, href: &str) -> std::result::Result<Url, url::ParseError> {
        resolve_url(href, &self.base_url())
    }

    /// Elements named `tag` in document order. The iterator is lazy and can
    /// be cloned to restart from any point.
    #[must_use]
    pub fn find_all(&self, tag: &str) -> MatchingElements<'_> {
        self.dom.find_all(tag)
    }

    /// Elements named `tag` whose attribute `attr` equals `value`.
    #[must_use]
    pub fn find_by_attribute(&self, tag: &str, attr: &str, value: &str) -> MatchingElements<'_> {
        self.dom.find_by_attribute(tag, attr, value)
    }

    /// The first element whose `id` is `id`.
    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.dom.find_by_attribute("*", "id", id).next()
    }

    /// Concatenated text of the whole document, whitespace as parsed.
    #[must_use]
    pub fn text(&self) -> String {
        self.dom.text_content(NodeId::ROOT)
    }

    /// [§ 3.1.3 document.title](https://html.spec.whatwg.org/multipage/dom.html#document.title)
    ///
    /// "the child text content of the title element, with ASCII whitespace
    /// stripped and collapsed". `None` when there is no `title` element.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.dom
            .find_all("title")
            .next()
            .map(|id| collapse_whitespace(&self.dom.text_content(id)))
    }

    /// Every `<a href>` in document order. Links whose `href` cannot be
    /// resolved are skipped.
    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        let base = self.base_url();
        self.dom
            .find_all("a")
            .filter_map(|node| {
                let href = self.dom.attr(node, "href")?;
                let Ok(url) = resolve_url(href, &base) else {
                    debug!(href, "skipping unresolvable link");
                    return None;
                };
                Some(Link {
                    href: href.to_string(),
                    url,
                    text: collapse_whitespace(&self.dom.text_content(node)),
                    node,
                })
            })
            .collect()
    }

    /// The first `<meta http-equiv="refresh">` with a usable `content`.
    #[must_use]
    pub fn meta_refresh(&self) -> Option<Refresh> {
        self.dom.find_all("meta").find_map(|node| {
            let equiv = self.dom.attr(node, "http-equiv")?;
            if !equiv.trim().eq_ignore_ascii_case("refresh") {
                return None;
            }
            parse_refresh(self.dom.attr(node, "content")?)
        })
    }
}

/// "Strip and collapse ASCII whitespace"
fn collapse_whitespace(s: &str) -> String {
    s.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}
