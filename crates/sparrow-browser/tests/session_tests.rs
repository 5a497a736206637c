//! Integration tests for the navigation pipeline, using a scripted in-memory
//! transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;

use sparrow_browser::{
    BrowserSession, CookieJar, CookieStore, SessionConfig, SessionError, SessionState,
    SharedSession,
};
use sparrow_common::{Method, NetworkError, Request, Response, Transport};
use url::Url;

/// Answers every request from a fixed table and records what it was asked.
#[derive(Default)]
struct MockTransport {
    routes: HashMap<String, Result<Response, NetworkError>>,
    calls: Mutex<Vec<Request>>,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn page(self, url: &str, html: &str) -> Self {
        self.respond(url, 200, &[], html)
    }

    fn respond(mut self, url: &str, status: u16, headers: &[(&str, &str)], body: &str) -> Self {
        let parsed = Url::parse(url).unwrap();
        let mut response = Response::html(parsed.clone(), body);
        response.status = status;
        for (name, value) in headers {
            response.headers.append(name, value);
        }
        let _ = self.routes.insert(parsed.to_string(), Ok(response));
        self
    }

    fn redirect(self, url: &str, status: u16, location: &str) -> Self {
        self.respond(url, status, &[("Location", location)], "")
    }

    fn fail(mut self, url: &str, error: NetworkError) -> Self {
        let key = Url::parse(url).unwrap().to_string();
        let _ = self.routes.insert(key, Err(error));
        self
    }

    fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls.lock().unwrap().push(request.clone());
        self.routes
            .get(request.url().as_str())
            .cloned()
            .unwrap_or_else(|| {
                Err(NetworkError::Request {
                    url: request.url().to_string(),
                    message: "connection refused".to_string(),
                })
            })
    }
}

fn session(mock: MockTransport) -> (BrowserSession, Arc<MockTransport>) {
    session_with(mock, SessionConfig::default())
}

fn session_with(
    mock: MockTransport,
    config: SessionConfig,
) -> (BrowserSession, Arc<MockTransport>) {
    let mock = Arc::new(mock);
    (BrowserSession::with_config(Arc::clone(&mock), config), mock)
}

fn current(session: &BrowserSession) -> &str {
    session.current_url().unwrap().as_str()
}

// ========== open ==========

#[test]
fn test_open_loads_document() {
    let (mut session, mock) = session(
        MockTransport::new().page("http://example.com/", "<title>Home</title>"),
    );
    assert_eq!(session.state(), &SessionState::Idle);
    let document = session.open("http://example.com/").unwrap();
    assert_eq!(document.title().as_deref(), Some("Home"));
    assert_eq!(session.state(), &SessionState::Loaded);
    assert_eq!(current(&session), "http://example.com/");

    let request = &mock.calls()[0];
    assert_eq!(request.method(), Method::Get);
    assert!(request.headers().get("user-agent").unwrap().starts_with("sparrow/"));
    assert!(request.headers().contains("accept"));
    assert!(!request.headers().contains("referer"));
}

#[test]
fn test_open_relative_and_referer() {
    let (mut session, mock) = session(
        MockTransport::new()
            .page("http://example.com/dir/a", "a")
            .page("http://example.com/dir/b", "b"),
    );
    let _ = session.open("http://example.com/dir/a").unwrap();
    let _ = session.open("b").unwrap();
    assert_eq!(current(&session), "http://example.com/dir/b");
    assert_eq!(
        mock.calls()[1].headers().get("Referer"),
        Some("http://example.com/dir/a")
    );
}

#[test]
fn test_referer_can_be_disabled() {
    let config = SessionConfig {
        send_referer: false,
        ..SessionConfig::default()
    };
    let (mut session, mock) = session_with(
        MockTransport::new()
            .page("http://example.com/a", "a")
            .page("http://example.com/b", "b"),
        config,
    );
    let _ = session.open("http://example.com/a").unwrap();
    let _ = session.open("/b").unwrap();
    assert!(!mock.calls()[1].headers().contains("referer"));
}

#[test]
fn test_relative_open_without_document_is_invalid() {
    let (mut session, mock) = session(MockTransport::new());
    assert_eq!(
        session.open("/relative"),
        Err(SessionError::InvalidUrl("/relative".to_string()))
    );
    assert!(matches!(session.state(), SessionState::Error(_)));
    assert_eq!(mock.call_count(), 0);
}

#[test]
fn test_final_url_is_authoritative() {
    let response = Response::html(
        Url::parse("http://example.com/landed/").unwrap(),
        "<a href=next>next</a>",
    );
    let mut mock = MockTransport::new();
    let _ = mock
        .routes
        .insert("http://example.com/start".to_string(), Ok(response));
    let (mut session, mock) = session(mock);

    let _ = session.open("http://example.com/start").unwrap();
    assert_eq!(current(&session), "http://example.com/landed/");
    let links = session.current_links().unwrap();
    assert_eq!(links[0].url.as_str(), "http://example.com/landed/next");
    assert_eq!(mock.call_count(), 1);
}

// ========== redirects ==========

#[test]
fn test_redirect_loop_is_bounded() {
    let (mut session, mock) = session(
        MockTransport::new().redirect("http://example.com/loop", 302, "/loop"),
    );
    let error = session.open("http://example.com/loop").unwrap_err();
    assert_eq!(
        error,
        SessionError::TooManyRedirects {
            limit: 10,
            url: "http://example.com/loop".to_string(),
        }
    );
    assert_eq!(mock.call_count(), 11);
    assert!(session.current_document().is_none());
}

#[test]
fn test_redirect_limit_is_configurable() {
    let config = SessionConfig {
        max_redirects: 1,
        ..SessionConfig::default()
    };
    let (mut session, mock) = session_with(
        MockTransport::new()
            .redirect("http://example.com/a", 301, "/b")
            .redirect("http://example.com/b", 301, "/c")
            .page("http://example.com/c", "c"),
        config,
    );
    assert!(matches!(
        session.open("http://example.com/a"),
        Err(SessionError::TooManyRedirects { limit: 1, .. })
    ));
    assert_eq!(mock.call_count(), 2);
}

#[test]
fn test_303_after_post_becomes_get() {
    let (mut session, mock) = session(
        MockTransport::new()
            .redirect("http://example.com/login", 303, "/home")
            .page("http://example.com/home", "<title>Welcome</title>"),
    );
    let request = Request::post(
        Url::parse("http://example.com/login").unwrap(),
        "application/x-www-form-urlencoded",
        b"user=jo".to_vec(),
    );
    let document = session.submit(request).unwrap();
    assert_eq!(document.title().as_deref(), Some("Welcome"));
    assert_eq!(current(&session), "http://example.com/home");
    assert_eq!(session.history().len(), 1);

    let calls = mock.calls();
    assert_eq!(calls[1].method(), Method::Get);
    assert!(calls[1].body().is_none());
}

#[test]
fn test_307_keeps_method_and_body() {
    let (mut session, mock) = session(
        MockTransport::new()
            .redirect("http://example.com/upload", 307, "http://other.example/upload")
            .page("http://other.example/upload", "ok"),
    );
    let request = Request::post(
        Url::parse("http://example.com/upload").unwrap(),
        "text/plain",
        b"payload".to_vec(),
    );
    let _ = session.submit(request).unwrap();
    let calls = mock.calls();
    assert_eq!(calls[1].method(), Method::Post);
    assert_eq!(calls[1].body(), Some(&b"payload"[..]));
    assert_eq!(calls[1].headers().get("content-type"), Some("text/plain"));
    assert_eq!(current(&session), "http://other.example/upload");
}

#[test]
fn test_301_and_302_after_post_keep_method_and_body() {
    for status in [301, 302] {
        let (mut session, mock) = session(
            MockTransport::new()
                .redirect("http://example.com/form", status, "/moved")
                .page("http://example.com/moved", "<title>Moved</title>"),
        );
        let request = Request::post(
            Url::parse("http://example.com/form").unwrap(),
            "application/x-www-form-urlencoded",
            b"a=1".to_vec(),
        );
        let document = session.submit(request).unwrap();
        assert_eq!(document.title().as_deref(), Some("Moved"));

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].method(), Method::Post, "{status}");
        assert_eq!(calls[1].body(), Some(&b"a=1"[..]));
        assert_eq!(
            calls[1].headers().get("content-type"),
            Some("application/x-www-form-urlencoded")
        );
    }
}

#[test]
fn test_redirect_without_location_is_http_status() {
    let (mut session, _mock) = session(
        MockTransport::new().respond("http://example.com/", 302, &[], ""),
    );
    assert_eq!(
        session.open("http://example.com/"),
        Err(SessionError::HttpStatus {
            status: 302,
            url: "http://example.com/".to_string(),
        })
    );
}

// ========== refresh ==========

#[test]
fn test_meta_refresh_is_followed_with_referer() {
    let (mut session, mock) = session(
        MockTransport::new()
            .page(
                "http://example.com/start",
                "<meta http-equiv=Refresh content='0; url=/next'>",
            )
            .page("http://example.com/next", "<title>Next</title>"),
    );
    let _ = session.open("http://example.com/start").unwrap();
    assert_eq!(current(&session), "http://example.com/next");
    assert_eq!(session.history().len(), 1);
    assert_eq!(
        mock.calls()[1].headers().get("referer"),
        Some("http://example.com/start")
    );
}

#[test]
fn test_refresh_header_is_followed() {
    let (mut session, _mock) = session(
        MockTransport::new()
            .respond("http://example.com/start", 200, &[("Refresh", "5; url=/next")], "")
            .page("http://example.com/next", "next"),
    );
    let _ = session.open("http://example.com/start").unwrap();
    assert_eq!(current(&session), "http://example.com/next");
}

#[test]
fn test_refresh_without_target_or_disabled_is_not_followed() {
    let mock = MockTransport::new()
        .page("http://example.com/self", "<meta http-equiv=refresh content=30>")
        .respond("http://example.com/hdr", 200, &[("Refresh", "0; url=/next")], "")
        .page("http://example.com/next", "next");
    let config = SessionConfig {
        follow_refresh: false,
        ..SessionConfig::default()
    };
    let (mut session, mock) = session_with(mock, config);
    let _ = session.open("http://example.com/self").unwrap();
    let _ = session.open("http://example.com/hdr").unwrap();
    assert_eq!(current(&session), "http://example.com/hdr");
    assert_eq!(mock.call_count(), 2);
}

// ========== errors ==========

#[test]
fn test_failed_navigation_keeps_document_and_history() {
    let (mut session, _mock) = session(
        MockTransport::new()
            .page("http://example.com/a", "a")
            .fail(
                "http://example.com/slow",
                NetworkError::Timeout {
                    url: "http://example.com/slow".to_string(),
                },
            ),
    );
    let _ = session.open("http://example.com/a").unwrap();
    let error = session.open("/slow").unwrap_err();
    assert!(matches!(
        error,
        SessionError::NavigationFailed(NetworkError::Timeout { .. })
    ));
    assert_eq!(session.state(), &SessionState::Error(error.clone()));
    assert_eq!(session.last_error(), Some(&error));
    assert_eq!(current(&session), "http://example.com/a");
    assert_eq!(session.history().len(), 1);

    let _ = session.open("/a").unwrap();
    assert_eq!(session.last_error(), None);
    assert_eq!(session.state(), &SessionState::Loaded);
}

#[test]
fn test_first_navigation_failure_leaves_no_document() {
    let (mut session, _mock) = session(MockTransport::new());
    assert!(matches!(
        session.open("http://nowhere.example/"),
        Err(SessionError::NavigationFailed(_))
    ));
    assert!(session.current_document().is_none());
    assert_eq!(session.current_forms(), Err(SessionError::NoDocumentLoaded));
}

#[test]
fn test_non_success_status() {
    let (mut session, _mock) = session(
        MockTransport::new().respond("http://example.com/gone", 404, &[], "not found"),
    );
    assert_eq!(
        session.open("http://example.com/gone"),
        Err(SessionError::HttpStatus {
            status: 404,
            url: "http://example.com/gone".to_string(),
        })
    );
}

// ========== history ==========

#[test]
fn test_back_restores_without_network_and_open_truncates() {
    let (mut session, mock) = session(
        MockTransport::new()
            .page("http://example.com/a", "<title>A</title>")
            .page("http://example.com/b", "<title>B</title>")
            .page("http://example.com/c", "<title>C</title>"),
    );
    let _ = session.open("http://example.com/a").unwrap();
    let _ = session.open("http://example.com/b").unwrap();

    let before = mock.call_count();
    assert!(session.back());
    assert_eq!(mock.call_count(), before);
    assert_eq!(current(&session), "http://example.com/a");
    assert_eq!(
        session.current_document().unwrap().title().as_deref(),
        Some("A")
    );

    let _ = session.open("http://example.com/c").unwrap();
    let urls: Vec<&str> = session
        .history()
        .entries()
        .iter()
        .map(|entry| entry.url.as_str())
        .collect();
    assert_eq!(urls, ["http://example.com/a", "http://example.com/c"]);
    assert!(!session.forward());
}

#[test]
fn test_back_and_forward_at_edges_are_no_ops() {
    let (mut session, _mock) = session(MockTransport::new().page("http://example.com/", ""));
    assert!(!session.back());
    assert_eq!(session.state(), &SessionState::Idle);
    let _ = session.open("http://example.com/").unwrap();
    assert!(!session.back());
    assert!(!session.forward());
    assert_eq!(session.state(), &SessionState::Loaded);
}

#[test]
fn test_back_after_error_restores_loaded() {
    let (mut session, _mock) = session(
        MockTransport::new()
            .page("http://example.com/a", "")
            .page("http://example.com/b", ""),
    );
    let _ = session.open("http://example.com/a").unwrap();
    let _ = session.open("http://example.com/b").unwrap();
    assert!(session.open("http://example.com/missing").is_err());
    assert!(session.back());
    assert_eq!(session.state(), &SessionState::Loaded);
    assert_eq!(current(&session), "http://example.com/a");
}

#[test]
fn test_max_history_drops_oldest() {
    let config = SessionConfig {
        max_history: Some(2),
        ..SessionConfig::default()
    };
    let (mut session, _mock) = session_with(
        MockTransport::new()
            .page("http://example.com/1", "")
            .page("http://example.com/2", "")
            .page("http://example.com/3", ""),
        config,
    );
    for n in 1..=3 {
        let _ = session.open(&format!("http://example.com/{n}")).unwrap();
    }
    assert_eq!(session.history().len(), 2);
    assert!(session.back());
    assert!(!session.back());
    assert_eq!(current(&session), "http://example.com/2");
}

// ========== cookies ==========

#[test]
fn test_cookies_from_every_hop_are_sent() {
    let jar = Arc::new(CookieJar::new());
    let mock = Arc::new(
        MockTransport::new()
            .respond(
                "http://example.com/login",
                302,
                &[("Location", "/home"), ("Set-Cookie", "sid=abc; Path=/")],
                "",
            )
            .page("http://example.com/home", "home"),
    );
    let store: Arc<dyn CookieStore> = jar.clone();
    let mut session = BrowserSession::new(Arc::clone(&mock)).with_cookie_store(store);
    let _ = session.open("http://example.com/login").unwrap();

    let calls = mock.calls();
    assert!(!calls[0].headers().contains("cookie"));
    assert_eq!(calls[1].headers().get("Cookie"), Some("sid=abc"));
    assert_eq!(jar.len(), 1);
}

#[test]
fn test_no_cookie_store_means_stateless() {
    let (mut session, mock) = session(
        MockTransport::new()
            .respond("http://example.com/", 200, &[("Set-Cookie", "a=1")], "")
            .page("http://example.com/again", ""),
    );
    let _ = session.open("http://example.com/").unwrap();
    let _ = session.open("/again").unwrap();
    assert!(!mock.calls()[1].headers().contains("cookie"));
    assert!(session.cookie_store().is_none());
}

// ========== forms and links ==========

const LOGIN: &str = "<form name=login id=f1 action=/search>\
                     <input name=q><input type=submit name=go value=Go></form>\
                     <form id=f2 method=post action=/other></form>\
                     <a href=/about>About us</a>";

#[test]
fn test_form_lookup() {
    let (mut session, _mock) = session(MockTransport::new().page("http://example.com/", LOGIN));
    assert_eq!(session.form(0).unwrap_err(), SessionError::NoDocumentLoaded);
    let _ = session.open("http://example.com/").unwrap();

    assert_eq!(session.current_forms().unwrap().len(), 2);
    assert_eq!(session.form_by_name("login").unwrap().id(), Some("f1"));
    assert_eq!(session.form_by_id("f2").unwrap().method(), Method::Post);
    assert_eq!(session.form(1).unwrap().id(), Some("f2"));
    assert!(matches!(session.form(2), Err(SessionError::NoSuchForm(_))));
    assert!(matches!(
        session.form_by_name("nope"),
        Err(SessionError::NoSuchForm(_))
    ));
}

#[test]
fn test_submit_form_navigates() {
    let (mut session, mock) = session(
        MockTransport::new()
            .page("http://example.com/", LOGIN)
            .page("http://example.com/search?q=a+b&go=Go", "<title>Results</title>"),
    );
    let _ = session.open("http://example.com/").unwrap();
    let mut form = session.form_by_name("login").unwrap();
    form.set_field("q", "a b").unwrap();
    let go = form.submitter_by_name("go");

    let document = session.submit_form(&form, go).unwrap();
    assert_eq!(document.title().as_deref(), Some("Results"));
    assert_eq!(session.history().len(), 2);
    assert_eq!(
        mock.calls()[1].headers().get("referer"),
        Some("http://example.com/")
    );
}

#[test]
fn test_submit_form_with_bad_submitter_fails() {
    let (mut session, mock) = session(MockTransport::new().page("http://example.com/", LOGIN));
    let _ = session.open("http://example.com/").unwrap();
    let form = session.form(0).unwrap();
    let error = session
        .submit_form(&form, Some(sparrow_forms::ControlId(0)))
        .unwrap_err();
    assert!(matches!(error, SessionError::Form(_)));
    assert_eq!(session.state(), &SessionState::Loaded);
    assert!(session.last_error().is_none());
    assert_eq!(mock.call_count(), 1);
}

#[test]
fn test_follow_link() {
    let (mut session, _mock) = session(
        MockTransport::new()
            .page("http://example.com/", LOGIN)
            .page("http://example.com/about", "<title>About</title>"),
    );
    let _ = session.open("http://example.com/").unwrap();
    let link = session
        .current_links()
        .unwrap()
        .into_iter()
        .find(|link| link.text == "About us")
        .unwrap();
    let document = session.follow_link(&link).unwrap();
    assert_eq!(document.title().as_deref(), Some("About"));
}

// ========== shared sessions ==========

#[test]
fn test_shared_session_reports_busy() {
    let (session, _mock) = session(MockTransport::new().page("http://example.com/", ""));
    let shared = SharedSession::new(session);
    let other = shared.clone();

    let busy = shared.with_session(|_| other.try_open("http://example.com/"));
    assert_eq!(busy.unwrap_err(), SessionError::SessionBusy);

    let _ = other.try_open("http://example.com/").unwrap();
    assert!(shared.with_session(|session| session.current_url().is_some()));
}

#[test]
fn test_shared_session_serializes_navigations() {
    let mock = MockTransport::new()
        .page("http://example.com/1", "")
        .page("http://example.com/2", "")
        .page("http://example.com/3", "")
        .page("http://example.com/4", "");
    let (session, mock) = session(mock);
    let shared = SharedSession::from(session);

    let handles: Vec<_> = (1..=4)
        .map(|n| {
            let shared = shared.clone();
            thread::spawn(move || shared.open(&format!("http://example.com/{n}")).is_ok())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(mock.call_count(), 4);
    assert_eq!(shared.with_session(|session| session.history().len()), 4);
}
