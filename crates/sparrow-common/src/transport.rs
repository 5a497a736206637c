//! Default [`Transport`]: HTTP(S) via reqwest, plus `data:` and `file:` URLs.
//!
//! Redirects are never followed here. The session owns redirect policy so it
//! can count hops, rewrite methods and store cookies for every response.

use std::time::Duration;

use base64::Engine;
use tracing::{debug, trace};
use url::Url;

use crate::net::{Headers, Method, NetworkError, Request, Response, Transport};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking transport backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport with the default 30 second timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Client`] if the TLS backend cannot be set up.
    pub fn new() -> Result<Self, NetworkError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Client`] if the TLS backend cannot be set up.
    pub fn with_timeout(timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| NetworkError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    fn fetch_http(&self, request: &Request) -> Result<Response, NetworkError> {
        let url = request.url();
        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, url.as_str());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().map_err(|e| map_reqwest_error(url, &e))?;

        let status = response.status().as_u16();
        let final_url = Url::parse(response.url().as_str()).unwrap_or_else(|_| url.clone());
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers.append(name.as_str(), &String::from_utf8_lossy(value.as_bytes()));
        }
        let body = response
            .bytes()
            .map_err(|e| map_reqwest_error(url, &e))?
            .to_vec();

        debug!(%url, status, bytes = body.len(), "HTTP response");
        Ok(Response {
            status,
            headers,
            body,
            final_url,
        })
    }
}

fn map_reqwest_error(url: &Url, error: &reqwest::Error) -> NetworkError {
    if error.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
        }
    } else {
        NetworkError::Request {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        trace!(%request, "fetch");
        match request.url().scheme() {
            "http" | "https" => self.fetch_http(request),
            "data" => DataUrl::parse(request.url().as_str())?.into_response(request.url()),
            "file" => fetch_file(request.url()),
            other => Err(NetworkError::UnsupportedScheme(other.to_string())),
        }
    }
}

fn fetch_file(url: &Url) -> Result<Response, NetworkError> {
    let path = url
        .to_file_path()
        .map_err(|()| NetworkError::InvalidUrl(url.to_string()))?;
    let body = std::fs::read(&path).map_err(|e| NetworkError::File {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut headers = Headers::new();
    let is_html = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
    if is_html {
        headers.set("Content-Type", "text/html");
    }

    Ok(Response {
        status: 200,
        headers,
        body,
        final_url: url.clone(),
    })
}

/// A parsed `data:` URL.
///
/// [RFC 2397](https://www.rfc-editor.org/rfc/rfc2397):
/// `data:[<mediatype>][;base64],<data>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Media type, defaulting to `text/plain;charset=US-ASCII`.
    pub media_type: String,
    /// Decoded payload.
    pub data: Vec<u8>,
}

impl DataUrl {
    /// Parse and decode a `data:` URL.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DataUrl`] if the comma separator is missing or
    /// the base64 payload is invalid.
    pub fn parse(raw: &str) -> Result<Self, NetworkError> {
        let rest = raw
            .strip_prefix("data:")
            .ok_or_else(|| NetworkError::DataUrl("missing `data:` prefix".to_string()))?;
        let (metadata, payload) = rest
            .split_once(',')
            .ok_or_else(|| NetworkError::DataUrl("missing comma".to_string()))?;

        let (media_type, is_base64) = match metadata.strip_suffix(";base64") {
            Some(media_type) => (media_type, true),
            None => (metadata, false),
        };
        let media_type = if media_type.is_empty() {
            "text/plain;charset=US-ASCII".to_string()
        } else {
            String::from_utf8_lossy(&percent_decode(media_type)).into_owned()
        };

        let bytes = percent_decode(payload);
        let data = if is_base64 {
            let cleaned: Vec<u8> = bytes
                .into_iter()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            base64::engine::general_purpose::STANDARD
                .decode(cleaned)
                .map_err(|e| NetworkError::DataUrl(format!("base64 decode error: {e}")))?
        } else {
            bytes
        };

        Ok(Self { media_type, data })
    }

    fn into_response(self, url: &Url) -> Result<Response, NetworkError> {
        let mut headers = Headers::new();
        headers.set("Content-Type", &self.media_type);
        Ok(Response {
            status: 200,
            headers,
            body: self.data,
            final_url: url.clone(),
        })
    }
}

/// Decode `%XX` escapes. Malformed escapes are kept literally.
fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(b) = hex {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_base64() {
        let data = DataUrl::parse("data:text/html;base64,PGI+aGk8L2I+").unwrap();
        assert_eq!(data.media_type, "text/html");
        assert_eq!(data.data, b"<b>hi</b>");
    }

    #[test]
    fn test_data_url_percent_encoded() {
        let data = DataUrl::parse("data:,Hello%2C%20World").unwrap();
        assert_eq!(data.media_type, "text/plain;charset=US-ASCII");
        assert_eq!(data.data, b"Hello, World");
    }

    #[test]
    fn test_data_url_missing_comma() {
        assert!(matches!(
            DataUrl::parse("data:text/plain"),
            Err(NetworkError::DataUrl(_))
        ));
    }

    #[test]
    fn test_percent_decode_malformed_kept() {
        assert_eq!(percent_decode("100%"), b"100%");
        assert_eq!(percent_decode("%zz%41"), b"%zzA");
    }

    #[test]
    fn test_transport_serves_data_url() {
        let transport = HttpTransport::new().unwrap();
        let url = Url::parse("data:text/html,%3Cp%3Ex").unwrap();
        let response = transport.fetch(&Request::get(url)).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.headers.get("content-type"), Some("text/html"));
        assert_eq!(response.body, b"<p>x");
    }

    #[test]
    fn test_transport_rejects_unknown_scheme() {
        let transport = HttpTransport::new().unwrap();
        let url = Url::parse("gopher://example.com/").unwrap();
        assert_eq!(
            transport.fetch(&Request::get(url)),
            Err(NetworkError::UnsupportedScheme("gopher".to_string()))
        );
    }
}
