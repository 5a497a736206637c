//! Cookie storage.
//!
//! [RFC 6265 HTTP State Management Mechanism](https://www.rfc-editor.org/rfc/rfc6265)

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use tracing::{debug, trace};
use url::Url;

/// Where a session keeps cookies between hops.
///
/// Implementations use interior mutability so one store can be shared by
/// several sessions.
pub trait CookieStore: Send + Sync {
    /// The `Cookie` header value for a request to `url`, if any cookie
    /// applies.
    fn cookie_header(&self, url: &Url) -> Option<String>;

    /// Store the `Set-Cookie` header values of a response from `url`.
    fn store(&self, url: &Url, set_cookie_values: &[&str]);
}

/// A stored cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain, lowercase, without a leading dot.
    pub domain: String,
    /// Only sent to exactly `domain`, not to its subdomains.
    pub host_only: bool,
    /// Path prefix.
    pub path: String,
    /// Only sent over `https`.
    pub secure: bool,
    /// Expiry; `None` for a session cookie.
    pub expires: Option<SystemTime>,
}

impl Cookie {
    /// [§ 5.2 The Set-Cookie Header](https://www.rfc-editor.org/rfc/rfc6265#section-5.2)
    ///
    /// Parse one `Set-Cookie` value received from `url`. Returns `None` for
    /// malformed values and for a `Domain` the origin may not set.
    #[must_use]
    pub fn parse(set_cookie: &str, url: &Url, now: SystemTime) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();
        let mut parts = set_cookie.split(';');

        // "If the name-value-pair string lacks a %x3D ("=") character,
        // ignore the set-cookie-string entirely."
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self {
            name: name.to_string(),
            value: value.trim().to_string(),
            domain: host.clone(),
            host_only: true,
            path: default_path(url),
            secure: false,
            expires: None,
        };

        let mut max_age_seen = false;
        for attribute in parts {
            let (key, value) = attribute
                .split_once('=')
                .map_or((attribute.trim(), ""), |(k, v)| (k.trim(), v.trim()));
            match key.to_ascii_lowercase().as_str() {
                "secure" => cookie.secure = true,
                // [§ 5.2.3](https://www.rfc-editor.org/rfc/rfc6265#section-5.2.3)
                "domain" if !value.is_empty() => {
                    let domain = value.trim_start_matches('.').to_ascii_lowercase();
                    if !domain_matches(&host, &domain) {
                        debug!(%host, %domain, "rejecting cookie for foreign domain");
                        return None;
                    }
                    cookie.domain = domain;
                    cookie.host_only = false;
                }
                // [§ 5.2.4](https://www.rfc-editor.org/rfc/rfc6265#section-5.2.4)
                "path" if value.starts_with('/') => cookie.path = value.to_string(),
                // [§ 5.2.2](https://www.rfc-editor.org/rfc/rfc6265#section-5.2.2)
                // "If delta-seconds is less than or equal to zero (0), let
                // expiry-time be the earliest representable date and time."
                // An expiry past what `SystemTime` can hold makes a session
                // cookie.
                "max-age" => {
                    if let Ok(seconds) = value.parse::<i64>() {
                        max_age_seen = true;
                        cookie.expires = match u64::try_from(seconds) {
                            Ok(seconds) if seconds > 0 => {
                                now.checked_add(Duration::from_secs(seconds))
                            }
                            _ => Some(SystemTime::UNIX_EPOCH),
                        };
                    }
                }
                // [§ 5.2.1](https://www.rfc-editor.org/rfc/rfc6265#section-5.2.1)
                // [§ 5.3](https://www.rfc-editor.org/rfc/rfc6265#section-5.3)
                // step 3: Max-Age wins over Expires.
                "expires" if !max_age_seen => match parse_cookie_date(value) {
                    Some(expires) => cookie.expires = Some(expires),
                    None => debug!(value, "ignoring unparseable cookie expiry"),
                },
                _ => trace!(attribute = key, "ignoring cookie attribute"),
            }
        }
        Some(cookie)
    }

    /// Returns true if the cookie has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// [§ 5.4 The Cookie Header](https://www.rfc-editor.org/rfc/rfc6265#section-5.4)
    ///
    /// Whether the cookie goes with a request to `url`.
    #[must_use]
    pub fn matches(&self, url: &Url, now: SystemTime) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&host, &self.domain)
        };
        domain_ok
            && path_matches(url.path(), &self.path)
            && (!self.secure || url.scheme() == "https")
            && !self.is_expired(now)
    }
}

/// [§ 5.1.1 Dates](https://www.rfc-editor.org/rfc/rfc6265#section-5.1.1)
///
/// HTTP dates, plus the `Wed, 21-Oct-2026 07:28:00 GMT` form servers still
/// send.
fn parse_cookie_date(value: &str) -> Option<SystemTime> {
    httpdate::parse_http_date(value)
        .or_else(|_| httpdate::parse_http_date(&value.replace('-', " ")))
        .ok()
}

/// [§ 5.1.3 Domain Matching](https://www.rfc-editor.org/rfc/rfc6265#section-5.1.3)
fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// [§ 5.1.4 Paths and Path-Match](https://www.rfc-editor.org/rfc/rfc6265#section-5.1.4)
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    request_path == cookie_path
        || (request_path.starts_with(cookie_path)
            && (cookie_path.ends_with('/')
                || request_path[cookie_path.len()..].starts_with('/')))
}

/// "Output the characters of the uri-path from the first character up to,
/// but not including, the right-most %x2F ("/")." `/` if that is empty.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(end) => path[..end].to_string(),
    }
}

/// In-memory [`CookieStore`].
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<Vec<Cookie>>,
}

impl CookieJar {
    /// Create an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a cookie. A cookie with the same name, domain and
    /// path is replaced; an expired cookie only removes its predecessor.
    pub fn insert(&self, cookie: Cookie, now: SystemTime) {
        let mut cookies = self.lock();
        cookies.retain(|c| {
            !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path)
        });
        if !cookie.is_expired(now) {
            cookies.push(cookie);
        }
    }

    /// All live cookies.
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie> {
        let now = SystemTime::now();
        self.lock()
            .iter()
            .filter(|c| !c.is_expired(now))
            .cloned()
            .collect()
    }

    /// Number of stored cookies, expired ones included until the next store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if the jar holds no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every cookie.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Cookie>> {
        // A poisoned jar still holds consistent cookies.
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CookieStore for CookieJar {
    fn cookie_header(&self, url: &Url) -> Option<String> {
        let now = SystemTime::now();
        let cookies = self.lock();
        let mut matching: Vec<&Cookie> = cookies.iter().filter(|c| c.matches(url, now)).collect();
        if matching.is_empty() {
            return None;
        }
        // "Cookies with longer paths are listed before cookies with shorter
        // paths."
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Some(
            matching
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn store(&self, url: &Url, set_cookie_values: &[&str]) {
        let now = SystemTime::now();
        for value in set_cookie_values {
            if let Some(cookie) = Cookie::parse(value, url, now) {
                trace!(name = %cookie.name, domain = %cookie.domain, "storing cookie");
                self.insert(cookie, now);
            }
        }
        self.lock().retain(|c| !c.is_expired(now));
    }
}
