//! Common test utilities for integration tests

use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use oscar_dl::config::{ResolvedConfig, RunConfig};
use oscar_dl::models::Credentials;
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const MANIFEST_NAME: &str = "fr_sha256.txt";
pub const LOGIN_TOKEN: &str = "1700000000_f00dfeed";
pub const LOGIN_RETURN_URL: &str = "aHR0cHM6Ly9vc2Nhci1wcml2ZS5odW1hLW51bS5mcg==";

pub const LOGIN_PAGE: &str = r#"
<html><body>
  <form id="lform" method="post">
    <input type="hidden" name="url" value="aHR0cHM6Ly9vc2Nhci1wcml2ZS5odW1hLW51bS5mcg==">
    <input type="hidden" name="token" value="1700000000_f00dfeed">
    <input type="text" name="user">
    <input type="password" name="password">
  </form>
</body></html>
"#;

/// Lowercase hex SHA-256 of `data`.
#[allow(dead_code)]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Listing page with one anchor per name, plus a link back to the parent directory.
#[allow(dead_code)]
pub fn listing_page(names: &[&str]) -> String {
    let anchors: String = names
        .iter()
        .map(|n| format!("    <a href=\"{n}\">{n}</a>\n"))
        .collect();
    format!("<html><body>\n    <a href=\"../\">../</a>\n{anchors}</body></html>")
}

/// Everything the fake archive serves, and what it saw.
pub struct ArchiveState {
    pub login_page: String,
    pub listing: String,
    pub manifest: String,
    pub files: HashMap<String, Vec<u8>>,
    pub data_gets: AtomicUsize,
    pub login_form: Mutex<Option<HashMap<String, String>>>,
    /// Routes that accept the request and never answer: `login`, `listing` or a file name
    pub stalled: HashSet<String>,
    /// Files that send their first chunk and then hang
    pub stalled_bodies: HashSet<String>,
    /// Files answered with 503 this many times before being served
    pub server_errors: Mutex<HashMap<String, usize>>,
}

impl ArchiveState {
    pub fn new(listing: String, manifest: String, files: &[(&str, &[u8])]) -> Self {
        Self {
            login_page: LOGIN_PAGE.to_string(),
            listing,
            manifest,
            files: files
                .iter()
                .map(|(name, data)| (name.to_string(), data.to_vec()))
                .collect(),
            data_gets: AtomicUsize::new(0),
            login_form: Mutex::new(None),
            stalled: HashSet::new(),
            stalled_bodies: HashSet::new(),
            server_errors: Mutex::new(HashMap::new()),
        }
    }

    #[allow(dead_code)]
    pub fn with_stalled(mut self, route: &str) -> Self {
        self.stalled.insert(route.to_string());
        self
    }

    #[allow(dead_code)]
    pub fn with_stalled_body(mut self, name: &str) -> Self {
        self.stalled_bodies.insert(name.to_string());
        self
    }

    #[allow(dead_code)]
    pub fn with_server_errors(self, name: &str, count: usize) -> Self {
        self.server_errors
            .lock()
            .unwrap()
            .insert(name.to_string(), count);
        self
    }

    #[allow(dead_code)]
    pub fn with_login_page(mut self, page: &str) -> Self {
        self.login_page = page.to_string();
        self
    }

    #[allow(dead_code)]
    pub fn data_gets(&self) -> usize {
        self.data_gets.load(Ordering::SeqCst)
    }
}

async fn stall_if_listed(state: &ArchiveState, route: &str) {
    if state.stalled.contains(route) {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}

/// Takes one pending 503 for `name`, if any are left.
fn take_server_error(state: &ArchiveState, name: &str) -> bool {
    let mut errors = state.server_errors.lock().unwrap();
    match errors.get_mut(name) {
        Some(left) if *left > 0 => {
            *left -= 1;
            true
        }
        _ => false,
    }
}

fn is_authorized(headers: &HeaderMap) -> bool {
    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    let browser = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Mozilla/5.0"));
    basic && browser
}

async fn login_page(State(state): State<Arc<ArchiveState>>) -> impl IntoResponse {
    stall_if_listed(&state, "login").await;
    (
        [(header::CONTENT_TYPE, "text/html")],
        state.login_page.clone(),
    )
}

async fn login_submit(
    State(state): State<Arc<ArchiveState>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    *state.login_form.lock().unwrap() = Some(form);
    (
        [(header::SET_COOKIE, "lemonldap=authenticated; Path=/")],
        "welcome",
    )
}

async fn listing(State(state): State<Arc<ArchiveState>>, headers: HeaderMap) -> Response {
    if !is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    stall_if_listed(&state, "listing").await;
    ([(header::CONTENT_TYPE, "text/html")], state.listing.clone()).into_response()
}

async fn listing_file(
    State(state): State<Arc<ArchiveState>>,
    UrlPath(name): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    if !is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if name == MANIFEST_NAME {
        return state.manifest.clone().into_response();
    }

    state.data_gets.fetch_add(1, Ordering::SeqCst);
    stall_if_listed(&state, &name).await;
    if take_server_error(&state, &name) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    match state.files.get(&name) {
        Some(data) if state.stalled_bodies.contains(&name) => {
            let first = data.clone();
            let body = stream::once(async move { Ok::<_, std::io::Error>(first) })
                .chain(stream::pending());
            Body::from_stream(body).into_response()
        }
        Some(data) => (
            [(header::CONTENT_TYPE, "application/gzip")],
            data.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A running fake archive: login form at `/login`, listing at `/listing`.
pub struct FakeArchive {
    pub addr: SocketAddr,
    pub state: Arc<ArchiveState>,
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeArchive {
    pub async fn start(state: ArchiveState) -> Self {
        let state = Arc::new(state);
        let app = Router::new()
            .route("/login", get(login_page).post(login_submit))
            .route("/listing", get(listing))
            .route("/listing/{name}", get(listing_file))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            _handle: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/listing", self.addr)
    }

    pub fn login_url(&self) -> String {
        format!("http://{}/login", self.addr)
    }

    /// Run configuration pointing at this archive, without retries.
    pub fn run_config(&self, out_dir: &Path) -> RunConfig {
        let resolved = ResolvedConfig {
            login_url: self.login_url(),
            timeout_secs: 5,
            max_retries: 0,
            ..ResolvedConfig::default()
        };
        RunConfig::new(
            self.base_url(),
            Credentials::new("alice", "s3cret"),
            out_dir,
            resolved,
        )
        .unwrap()
    }
}
