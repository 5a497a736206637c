//! The navigation pipeline.
//!
//! One navigation is a single sequential pass:
//!
//! ```text
//! Request -> [cookies] -> Transport::fetch -> [store cookies]
//!         -> 3xx with Location?  -> next hop
//!         -> non-2xx?            -> HttpStatus
//!         -> parse -> refresh?   -> next hop
//!         -> commit to history   -> Loaded
//! ```

use std::fmt;
use std::sync::Arc;

use sparrow_common::urls::{resolve_url, without_fragment};
use sparrow_common::{Method, Request, Response, Transport};
use sparrow_forms::{ControlId, FormModel};
use sparrow_html::{Charset, HtmlTree, Link};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SessionConfig;
use crate::cookies::{CookieJar, CookieStore};
use crate::error::{Result, SessionError};
use crate::history::{History, HistoryEntry};

/// Where a session is in its lifecycle.
///
/// ```text
/// Idle ──open/submit──> Navigating ──ok──> Loaded
///                            │
///                            └──err──> Error
/// ```
///
/// `Loaded` and `Error` both accept a new navigation. `back`/`forward`
/// return to `Loaded` when they move.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing has been requested yet.
    #[default]
    Idle,
    /// A navigation to `url` is in flight.
    Navigating {
        /// The first URL of the navigation.
        url: Url,
    },
    /// The current history entry is displayed.
    Loaded,
    /// The last navigation failed. The previous document, if any, is still
    /// current.
    Error(SessionError),
}

/// A headless browser: one transport, one history, an optional cookie
/// store.
///
/// Navigation takes `&mut self`, so one session runs at most one navigation
/// at a time. Use [`SharedSession`](crate::SharedSession) to share a session
/// between threads.
pub struct BrowserSession {
    transport: Box<dyn Transport>,
    cookies: Option<Arc<dyn CookieStore>>,
    config: SessionConfig,
    history: History,
    state: SessionState,
    last_error: Option<SessionError>,
}

impl fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserSession")
            .field("config", &self.config)
            .field("has_cookie_store", &self.cookies.is_some())
            .field("history", &self.history.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl BrowserSession {
    /// A session over `transport` with the default configuration and no
    /// cookie store.
    #[must_use]
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// A session over `transport` with `config`.
    #[must_use]
    pub fn with_config<T: Transport + 'static>(transport: T, config: SessionConfig) -> Self {
        Self {
            transport: Box::new(transport),
            cookies: None,
            history: History::new(config.max_history),
            config,
            state: SessionState::Idle,
            last_error: None,
        }
    }

    /// A session over the HTTP transport described by `config`, with an
    /// in-memory [`CookieJar`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NavigationFailed`] if the HTTP client cannot
    /// be created.
    pub fn from_config(config: SessionConfig) -> Result<Self> {
        let transport = config.http_transport()?;
        Ok(Self::with_config(transport, config).with_cookie_store(Arc::new(CookieJar::new())))
    }

    /// Use `store` for `Cookie` and `Set-Cookie` headers.
    #[must_use]
    pub fn with_cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookies = Some(store);
        self
    }

    // ========== navigation ==========

    /// Navigate to `url`, resolved against the current document's base URL
    /// when one is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] if `url` cannot be resolved, and
    /// the errors of [`BrowserSession::submit`].
    pub fn open(&mut self, url: &str) -> Result<Arc<HtmlTree>> {
        let resolved = match self.current_document() {
            Some(document) => document.resolve_url(url),
            None => Url::parse(url.trim()),
        };
        match resolved {
            Ok(url) => self.open_url(url),
            Err(_) => Err(self.fail(SessionError::InvalidUrl(url.to_string()))),
        }
    }

    /// Navigate to an absolute URL with a GET request.
    ///
    /// # Errors
    ///
    /// As [`BrowserSession::submit`].
    pub fn open_url(&mut self, url: Url) -> Result<Arc<HtmlTree>> {
        self.submit(Request::get(url))
    }

    /// Run `request` through the navigation pipeline and make the result the
    /// current document.
    ///
    /// On failure the session enters [`SessionState::Error`]; the current
    /// document and the history are unchanged.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NavigationFailed`] if the transport fails
    /// - [`SessionError::TooManyRedirects`] past
    ///   [`SessionConfig::max_redirects`] hops
    /// - [`SessionError::HttpStatus`] if the final response is not a 2xx
    /// - [`SessionError::InvalidUrl`] for an unresolvable `Location`
    pub fn submit(&mut self, request: Request) -> Result<Arc<HtmlTree>> {
        self.state = SessionState::Navigating {
            url: request.url().clone(),
        };
        match self.run(request) {
            Ok((document, status)) => Ok(self.commit(document, status)),
            Err(error) => Err(self.fail(error)),
        }
    }

    /// Build the request for `form` as if `submitter` was clicked, then
    /// navigate with it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Form`] if the request cannot be built, and the
    /// errors of [`BrowserSession::submit`]. A form error sends nothing and
    /// leaves the session state as it was.
    pub fn submit_form(
        &mut self,
        form: &FormModel,
        submitter: Option<ControlId>,
    ) -> Result<Arc<HtmlTree>> {
        let request = form.build_request(submitter)?;
        self.submit(request)
    }

    /// Navigate to `link`.
    ///
    /// # Errors
    ///
    /// As [`BrowserSession::submit`].
    pub fn follow_link(&mut self, link: &Link) -> Result<Arc<HtmlTree>> {
        self.open_url(link.url.clone())
    }

    /// Show the previous history entry. Returns false, changing nothing, at
    /// the start of history.
    pub fn back(&mut self) -> bool {
        let moved = self.history.back();
        if moved {
            self.state = SessionState::Loaded;
        }
        moved
    }

    /// Show the next history entry. Returns false, changing nothing, at the
    /// end of history.
    pub fn forward(&mut self) -> bool {
        let moved = self.history.forward();
        if moved {
            self.state = SessionState::Loaded;
        }
        moved
    }

    fn run(&self, request: Request) -> Result<(HtmlTree, u16)> {
        let referer = self
            .current_url()
            .filter(|_| self.config.send_referer)
            .map(without_fragment);
        let mut request = self.prepare(request, referer.as_ref());
        let mut hops = 0;

        loop {
            let response = self.exchange(&request)?;

            // [Fetch § 4.4 HTTP-redirect fetch](https://fetch.spec.whatwg.org/#http-redirect-fetch)
            let next = if let Some(location) = response.location().filter(|_| response.is_redirect())
            {
                let target = resolve_url(location, &response.final_url)
                    .map_err(|_| SessionError::InvalidUrl(location.to_string()))?;
                debug!(status = response.status, %target, "following redirect");
                redirected(&request, response.status, target)
            } else if !response.is_success() {
                return Err(SessionError::HttpStatus {
                    status: response.status,
                    url: response.final_url.to_string(),
                });
            } else {
                let document = parse(&response)?;
                let Some(target) = self.refresh_target(&response, &document) else {
                    return Ok((document, response.status));
                };
                debug!(%target, "following refresh");
                let next = Request::get(target);
                if self.config.send_referer {
                    next.with_header("Referer", without_fragment(&response.final_url).as_str())
                } else {
                    next
                }
            };

            hops += 1;
            if hops > self.config.max_redirects {
                return Err(SessionError::TooManyRedirects {
                    limit: self.config.max_redirects,
                    url: next.url().to_string(),
                });
            }
            request = self.prepare(next, None);
        }
    }

    fn prepare(&self, request: Request, referer: Option<&Url>) -> Request {
        let request = request
            .with_default_header("User-Agent", &self.config.user_agent)
            .with_default_header("Accept", &self.config.accept);
        match referer {
            Some(referer) => request.with_default_header("Referer", referer.as_str()),
            None => request,
        }
    }

    /// One hop: attach cookies, fetch, store returned cookies.
    fn exchange(&self, request: &Request) -> Result<Response> {
        let cookie = self
            .cookies
            .as_ref()
            .and_then(|store| store.cookie_header(request.url()));
        let response = match cookie {
            Some(cookie) => self
                .transport
                .fetch(&request.clone().with_header("Cookie", &cookie))?,
            None => self.transport.fetch(request)?,
        };
        debug!(%request, status = response.status, final_url = %response.final_url, "fetched");

        if let Some(store) = &self.cookies {
            let set_cookies: Vec<&str> = response.headers.get_all("set-cookie").collect();
            if !set_cookies.is_empty() {
                store.store(&response.final_url, &set_cookies);
            }
        }
        Ok(response)
    }

    /// A `<meta http-equiv=refresh>` or `Refresh` header naming a target,
    /// on a 200 response. The meta element wins over the header.
    fn refresh_target(&self, response: &Response, document: &HtmlTree) -> Option<Url> {
        if !self.config.follow_refresh || response.status != 200 {
            return None;
        }
        let href = document
            .meta_refresh()
            .and_then(|refresh| refresh.url)
            .or_else(|| {
                response
                    .headers
                    .get("refresh")
                    .and_then(sparrow_html::parse_refresh)
                    .and_then(|refresh| refresh.url)
            })?;
        match document.resolve_url(&href) {
            Ok(url) => Some(url),
            Err(error) => {
                warn!(href, %error, "ignoring unresolvable refresh target");
                None
            }
        }
    }

    fn commit(&mut self, document: HtmlTree, status: u16) -> Arc<HtmlTree> {
        let document = Arc::new(document);
        let url = document.url().clone();
        info!(%url, status, "navigation committed");
        self.history.push(HistoryEntry {
            url,
            document: Arc::clone(&document),
            status,
        });
        self.state = SessionState::Loaded;
        self.last_error = None;
        document
    }

    fn fail(&mut self, error: SessionError) -> SessionError {
        warn!(%error, "navigation failed");
        self.state = SessionState::Error(error.clone());
        self.last_error = Some(error.clone());
        error
    }

    // ========== current document ==========

    /// The displayed document, once a navigation has succeeded.
    #[must_use]
    pub fn current_document(&self) -> Option<&Arc<HtmlTree>> {
        self.history.current().map(|entry| &entry.document)
    }

    /// URL of the displayed document.
    #[must_use]
    pub fn current_url(&self) -> Option<&Url> {
        self.history.current().map(|entry| &entry.url)
    }

    fn document(&self) -> Result<&HtmlTree> {
        self.current_document()
            .map(Arc::as_ref)
            .ok_or(SessionError::NoDocumentLoaded)
    }

    /// Every form of the displayed document, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoDocumentLoaded`] before the first
    /// successful navigation.
    pub fn current_forms(&self) -> Result<Vec<FormModel>> {
        Ok(FormModel::all(self.document()?))
    }

    /// Every link of the displayed document, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoDocumentLoaded`] before the first
    /// successful navigation.
    pub fn current_links(&self) -> Result<Vec<Link>> {
        Ok(self.document()?.links())
    }

    /// The first form whose `name` attribute is `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoDocumentLoaded`] before the first
    /// successful navigation and [`SessionError::NoSuchForm`] if no form
    /// matches.
    pub fn form_by_name(&self, name: &str) -> Result<FormModel> {
        self.current_forms()?
            .into_iter()
            .find(|form| form.name() == Some(name))
            .ok_or_else(|| SessionError::NoSuchForm(format!("name={name}")))
    }

    /// The form whose `id` attribute is `id`.
    ///
    /// # Errors
    ///
    /// As [`BrowserSession::form_by_name`].
    pub fn form_by_id(&self, id: &str) -> Result<FormModel> {
        self.current_forms()?
            .into_iter()
            .find(|form| form.id() == Some(id))
            .ok_or_else(|| SessionError::NoSuchForm(format!("id={id}")))
    }

    /// The `index`th form, counting from zero in document order.
    ///
    /// # Errors
    ///
    /// As [`BrowserSession::form_by_name`].
    pub fn form(&self, index: usize) -> Result<FormModel> {
        self.current_forms()?
            .into_iter()
            .nth(index)
            .ok_or_else(|| SessionError::NoSuchForm(format!("#{index}")))
    }

    // ========== status ==========

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// The error of the last navigation, cleared by the next successful one.
    #[must_use]
    pub const fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// The session history.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// The configuration the session was built with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The cookie store, if one is configured.
    #[must_use]
    pub fn cookie_store(&self) -> Option<&Arc<dyn CookieStore>> {
        self.cookies.as_ref()
    }
}

/// The request for the next hop after a redirect `status`.
///
/// A 303 turns the request into a body-less GET, as [Fetch § 4.4](https://fetch.spec.whatwg.org/#http-redirect-fetch)
/// STEP 12 does for a non-`GET` request. Every other redirect status keeps
/// method, body and headers, including a POST answered with 301 or 302.
/// The `Referer` of the first hop is carried along either way.
fn redirected(previous: &Request, status: u16, target: Url) -> Request {
    if previous.method() == Method::Post && status != 303 {
        return previous.clone().with_url(target);
    }
    let next = Request::get(target);
    match previous.headers().get("referer") {
        Some(referer) => next.with_header("Referer", referer),
        None => next,
    }
}

/// Decode the body with the `Content-Type` charset when it is supported,
/// sniffing otherwise.
fn parse(response: &Response) -> Result<HtmlTree> {
    let hint = response.headers.content_type_charset().filter(|label| {
        let supported = Charset::from_label(label).is_some();
        if !supported {
            warn!(label, "unsupported response charset, sniffing instead");
        }
        supported
    });
    HtmlTree::parse(&response.body, hint, response.final_url.clone()).map_err(SessionError::from)
}
