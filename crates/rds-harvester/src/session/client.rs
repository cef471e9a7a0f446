//! Shared HTTP session for the registry API.
//!
//! Built once per run and cloned into every retrieval task; the underlying
//! `reqwest::Client` shares its connection pool and cookie jar between
//! clones.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::{ApiConfig, SessionConfig};
use crate::error::{FetchError, HarvestError};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/132.0.0.0 Safari/537.36";

/// Longest response body excerpt kept in status errors.
const BODY_EXCERPT_CHARS: usize = 300;

/// HTTP client carrying the registry headers, bearer token and cookies.
#[derive(Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
}

impl RegistryClient {
    /// Build the session. Fails on an unusable token, cookie, origin or proxy.
    pub fn new(
        token: &str,
        api: &ApiConfig,
        session: &SessionConfig,
    ) -> Result<Self, HarvestError> {
        let origin = Url::parse(&api.origin).map_err(|source| HarvestError::InvalidUrl {
            url: api.origin.clone(),
            source,
        })?;

        let jar = Arc::new(Jar::default());
        for (name, value) in &session.cookies {
            jar.add_cookie_str(&format!("{name}={value}"), &origin);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(api.request_timeout)
            .connect_timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .default_headers(default_headers(token, api)?)
            .cookie_provider(jar);

        if let Some(proxy) = &session.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(HarvestError::Client)?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(HarvestError::Client)?;
        Ok(Self { client })
    }

    /// POST a JSON body and parse the JSON response.
    ///
    /// Send and body-read failures are `Transport`; a non-2xx status or an
    /// unparseable body is reported as-is.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Value, FetchError> {
        let resp = self.client.post(url).json(body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: text.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }

        serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// `Authorization` value; tokens copied from the browser may already carry
/// the scheme.
pub fn bearer_value(token: &str) -> String {
    let token = token.trim();
    if token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Bearer {token}")
    }
}

fn default_headers(token: &str, api: &ApiConfig) -> Result<HeaderMap, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );

    let auth = HeaderValue::from_str(&bearer_value(token))
        .map_err(|_| HarvestError::InvalidHeader("Authorization"))?;
    headers.insert(header::AUTHORIZATION, auth);

    let origin =
        HeaderValue::from_str(&api.origin).map_err(|_| HarvestError::InvalidHeader("Origin"))?;
    headers.insert(header::ORIGIN, origin);

    let referer = HeaderValue::from_str(&api.declaration_page)
        .map_err(|_| HarvestError::InvalidHeader("Referer"))?;
    headers.insert(header::REFERER, referer);

    Ok(headers)
}
