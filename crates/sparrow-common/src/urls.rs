//! URL resolution utilities.
//!
//! [§ 2.4 URLs](https://html.spec.whatwg.org/multipage/urls-and-fetching.html#urls)
//! [URL Standard](https://url.spec.whatwg.org/)

use url::Url;

/// [§ 2.4.2 Parsing URLs](https://html.spec.whatwg.org/multipage/urls-and-fetching.html#resolving-urls)
///
/// Resolve a potentially relative URL against a base URL.
///
/// # Algorithm
///
/// STEP 1: "Strip leading and trailing ASCII whitespace from url."
///
/// STEP 2: "Let urlRecord be the result of applying the URL parser to url,
/// with baseURL."
///
/// # Errors
///
/// Returns the URL parser's error when `href` cannot be resolved.
pub fn resolve_url(href: &str, base: &Url) -> Result<Url, url::ParseError> {
    // STEP 1
    let href = href.trim_matches(|c: char| c.is_ascii_whitespace());

    // STEP 2
    base.join(href)
}

/// Return a copy of `url` without its fragment.
///
/// Used for `Referer` headers and base URLs, which never carry a fragment.
#[must_use]
pub fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}
