//! Authenticated HTTP session and the two-step form login.
//!
//! The identity provider serves a login form carrying two hidden inputs, `url` and
//! `token`. [`Session::login`] fetches that form, replays the hidden values together
//! with the credentials, and from then on every request carries the provider's
//! cookies and HTTP basic-auth credentials.

use crate::config::ResolvedConfig;
use crate::constants::{
    LOGIN_LM_AUTH, LOGIN_SKIN, LOGIN_TIMEZONE, LOGIN_TOKEN_FIELD, LOGIN_URL_FIELD,
};
use crate::errors::{AppError, AppResult, AuthError};
use crate::models::Credentials;
use reqwest::{Client, RequestBuilder};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

/// Hidden inputs scraped from the login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub url: String,
    pub token: String,
}

/// Extracts the hidden `url` and `token` inputs from the login page.
///
/// # Errors
///
/// Returns [`AuthError::MissingField`] naming the first field that is absent.
pub fn parse_login_form(html: &str) -> Result<LoginForm, AuthError> {
    let document = Html::parse_document(html);
    let url = hidden_input_value(&document, LOGIN_URL_FIELD)?;
    let token = hidden_input_value(&document, LOGIN_TOKEN_FIELD)?;
    Ok(LoginForm { url, token })
}

fn hidden_input_value(document: &Html, name: &str) -> Result<String, AuthError> {
    let selector = Selector::parse(&format!(r#"input[name="{name}"]"#))
        .map_err(|_| AuthError::MissingField(name.to_string()))?;
    document
        .select(&selector)
        .next()
        .map(|el| el.value().attr("value").unwrap_or_default().to_string())
        .ok_or_else(|| AuthError::MissingField(name.to_string()))
}

/// An HTTP client context owning the cookie jar and credentials for one run.
///
/// Dropping the session closes its pooled connections.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    credentials: Credentials,
    /// Deadline for the small requests made before downloading: login, listing, manifest
    request_timeout: Duration,
}

impl Session {
    /// Builds a cookie-keeping client with the configured user agent and connect timeout.
    ///
    /// Data transfers bound each read separately, so the whole-request deadline taken
    /// from `timeout_secs` applies only to the login, listing and manifest requests.
    pub fn new(config: &ResolvedConfig, credentials: Credentials) -> AppResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.timeout())
            .build()
            .map_err(|e| AppError::NetworkError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            credentials,
            request_timeout: config.timeout(),
        })
    }

    /// Performs the form login against `login_url`.
    ///
    /// The provider's answer to the POST is not inspected: a rejected login shows
    /// up later as authorization failures on the listing or data requests.
    pub async fn login(&self, login_url: &str) -> Result<(), AuthError> {
        info!(login_url, user = %self.credentials.user, "Logging in");

        let page = self
            .client
            .get(login_url)
            .timeout(self.request_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Network(e.to_string()))?
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let form = parse_login_form(&page)?;
        debug!("Found login form fields");

        let params = [
            ("user", self.credentials.user.as_str()),
            ("password", self.credentials.password.as_str()),
            ("timezone", LOGIN_TIMEZONE),
            ("lmAuth", LOGIN_LM_AUTH),
            ("skin", LOGIN_SKIN),
            (LOGIN_URL_FIELD, form.url.as_str()),
            (LOGIN_TOKEN_FIELD, form.token.as_str()),
        ];

        let response = self
            .authenticated_request(reqwest::Method::POST, login_url)
            .form(&params)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        debug!(status = %response.status(), "Login form submitted");
        Ok(())
    }

    /// Starts a GET carrying the session cookies and basic-auth credentials.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.authenticated_request(reqwest::Method::GET, url)
    }

    fn authenticated_request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).basic_auth(
            &self.credentials.user,
            Some(&self.credentials.password),
        )
    }

    /// Fetches a page or small file as text, failing on non-2xx statuses.
    pub async fn fetch_text(&self, url: &str) -> AppResult<String> {
        let text = self
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::NetworkError(format!("Failed to fetch {url}: {e}")))?
            .text()
            .await?;
        Ok(text)
    }
}
