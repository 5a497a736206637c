//! Request/response records and the transport collaborator.
//!
//! The browser never talks to the network directly. Every exchange goes
//! through a [`Transport`], which turns one [`Request`] into one
//! [`Response`]. Redirects, cookies and history are handled above this layer.

use std::fmt;

use strum_macros::{Display, EnumString};
use thiserror::Error;
use url::Url;

/// HTTP request method.
///
/// [§ 4.10.18.6 Form submission](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#attr-fs-method)
/// Forms only ever produce GET or POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Method {
    /// `GET`
    #[default]
    Get,
    /// `POST`
    Post,
}

/// Ordered, case-insensitive header list.
///
/// Order is kept because some headers (`Set-Cookie`) may repeat and their
/// order is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// First value of header `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of header `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if header `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replace every value of `name` with a single `value`.
    pub fn set(&mut self, name: &str, value: &str) {
        self.remove(name);
        self.append(name, value);
    }

    /// Add a value for `name`, keeping existing ones.
    pub fn append(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_string(), value.to_string()));
    }

    /// Remove every value of `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `charset` parameter of the `Content-Type` header, if any.
    ///
    /// `text/html; charset="ISO-8859-1"` yields `ISO-8859-1`.
    #[must_use]
    pub fn content_type_charset(&self) -> Option<&str> {
        let content_type = self.get("content-type")?;
        content_type.split(';').skip(1).find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
        })
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Headers {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// An immutable request record: method, absolute URL, headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl Request {
    /// A body-less GET request.
    #[must_use]
    pub const fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: Headers::new(),
            body: None,
        }
    }

    /// A POST request carrying `body` with the given `Content-Type`.
    #[must_use]
    pub fn post(url: Url, content_type: &str, body: Vec<u8>) -> Self {
        let mut headers = Headers::new();
        headers.set("Content-Type", content_type);
        Self {
            method: Method::Post,
            url,
            headers,
            body: Some(body),
        }
    }

    /// Copy of this request with header `name` set to `value`.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Copy of this request with header `name` set only when absent.
    #[must_use]
    pub fn with_default_header(mut self, name: &str, value: &str) -> Self {
        if !self.headers.contains(name) {
            self.headers.set(name, value);
        }
        self
    }

    /// Copy of this request sent to `url` instead, keeping method, headers
    /// and body.
    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }

    /// Copy of this request without header `name`.
    #[must_use]
    pub fn without_header(mut self, name: &str) -> Self {
        self.headers.remove(name);
        self
    }

    /// Request method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Absolute request URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Request body, present for POST requests.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A response as delivered by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Raw response body.
    pub body: Vec<u8>,
    /// URL the body was actually served from. Transports that follow
    /// redirects internally report the last URL here.
    pub final_url: Url,
}

impl Response {
    /// A `200 OK` response with an HTML body, mostly useful for tests and
    /// in-memory transports.
    #[must_use]
    pub fn html(url: Url, body: &str) -> Self {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/html; charset=utf-8");
        Self {
            status: 200,
            headers,
            body: body.as_bytes().to_vec(),
            final_url: url,
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// [Fetch § 2.2.6 Statuses](https://fetch.spec.whatwg.org/#redirect-status)
    ///
    /// "A redirect status is a status that is 301, 302, 303, 307, or 308."
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    /// The `Location` header, trimmed, if present and non-empty.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get("location")
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

/// Errors raised by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The request could not be sent or the response could not be read.
    #[error("request to {url} failed: {message}")]
    Request {
        /// Target URL.
        url: String,
        /// Underlying error description.
        message: String,
    },
    /// The transport gave up waiting.
    #[error("request to {url} timed out")]
    Timeout {
        /// Target URL.
        url: String,
    },
    /// The URL could not be parsed or has no usable host.
    #[error("invalid URL `{0}`")]
    InvalidUrl(String),
    /// The transport cannot handle this URL scheme.
    #[error("unsupported URL scheme `{0}`")]
    UnsupportedScheme(String),
    /// A `data:` URL could not be decoded.
    #[error("invalid data URL: {0}")]
    DataUrl(String),
    /// A `file:` URL could not be read.
    #[error("failed to read {path}: {message}")]
    File {
        /// Local path.
        path: String,
        /// Underlying error description.
        message: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

/// The network collaborator.
///
/// Implementations perform exactly one exchange per call and must not be
/// surprised by being called from several sessions at once. A transport may
/// follow redirects itself; in that case it reports the last URL in
/// [`Response::final_url`] and the final response is not a redirect.
pub trait Transport: Send + Sync {
    /// Perform `request` and return the response.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] when no response could be obtained.
    /// Non-2xx statuses are responses, not errors.
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        (**self).fetch(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        (**self).fetch(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_case_insensitive() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("GeT".parse::<Method>().unwrap(), Method::Get);
        assert!("dialog".parse::<Method>().is_err());
        assert_eq!(Method::Post.to_string(), "POST");
    }

    #[test]
    fn test_headers_case_insensitive_and_ordered() {
        let mut headers: Headers = [("Set-Cookie", "a=1"), ("set-cookie", "b=2")]
            .into_iter()
            .collect();
        assert_eq!(headers.get_all("SET-COOKIE").collect::<Vec<_>>(), ["a=1", "b=2"]);
        headers.set("Set-Cookie", "c=3");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("set-cookie"), Some("c=3"));
    }

    #[test]
    fn test_content_type_charset() {
        let headers: Headers = [("Content-Type", "text/html; Charset=\"ISO-8859-1\"")]
            .into_iter()
            .collect();
        assert_eq!(headers.content_type_charset(), Some("ISO-8859-1"));

        let headers: Headers = [("Content-Type", "text/html")].into_iter().collect();
        assert_eq!(headers.content_type_charset(), None);
    }

    #[test]
    fn test_request_builders() {
        let url = Url::parse("http://example.com/").unwrap();
        let request = Request::post(url, "text/plain", b"x".to_vec())
            .with_header("Referer", "http://a/")
            .with_default_header("referer", "http://b/");
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.headers().get("REFERER"), Some("http://a/"));
        assert_eq!(request.headers().get("content-type"), Some("text/plain"));
        assert_eq!(request.body(), Some(&b"x"[..]));
        assert_eq!(request.to_string(), "POST http://example.com/");
    }

    #[test]
    fn test_response_redirect_helpers() {
        let url = Url::parse("http://example.com/").unwrap();
        let mut response = Response::html(url, "");
        assert!(response.is_success());
        response.status = 303;
        response.headers.set("Location", "  /next ");
        assert!(response.is_redirect());
        assert_eq!(response.location(), Some("/next"));
        response.status = 304;
        assert!(!response.is_redirect());
    }
}
