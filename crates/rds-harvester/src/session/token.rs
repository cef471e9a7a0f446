//! Bearer-token handling.
//!
//! A token passed on the command line is checked for expiry locally (the
//! JWT signature is not verified). Without one, the registry SPA is loaded
//! in a headless browser and the token is read from its local storage.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::TokenConfig;
use crate::error::TokenError;
use crate::renderer::{Renderer, RendererFactory};

// ── JWT expiry ───────────────────────────────────────────────────────────────

/// Read the `exp` claim of a JWT without verifying its signature.
pub fn decode_expiry(token: &str) -> Result<DateTime<Utc>, TokenError> {
    let token = strip_bearer(token);
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed("expected three dot-separated segments".into()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TokenError::Malformed(format!("payload is not base64url: {e}")))?;
    let claims: Value = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("payload is not JSON: {e}")))?;

    let exp = match claims.get("exp") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| TokenError::Malformed(format!("exp out of range: {n}")))?,
        Some(other) => return Err(TokenError::Malformed(format!("exp is not a number: {other}"))),
        None => return Err(TokenError::Malformed("missing exp claim".into())),
    };

    DateTime::from_timestamp(exp, 0)
        .ok_or_else(|| TokenError::Malformed(format!("exp out of range: {exp}")))
}

/// Check a supplied token; returns its expiry when still valid at `now`.
pub fn validate_token(token: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, TokenError> {
    let expires_at = decode_expiry(token)?;
    if expires_at <= now {
        return Err(TokenError::Expired {
            expired_at: expires_at,
        });
    }
    Ok(expires_at)
}

fn strip_bearer(token: &str) -> &str {
    let token = token.trim();
    token
        .strip_prefix("Bearer ")
        .or_else(|| token.strip_prefix("bearer "))
        .unwrap_or(token)
        .trim()
}

// ── Browser extraction ───────────────────────────────────────────────────────

/// Reads the token the registry SPA stores in local storage.
pub struct BrowserTokenProvider<'a> {
    factory: &'a dyn RendererFactory,
    config: TokenConfig,
}

impl<'a> BrowserTokenProvider<'a> {
    pub fn new(factory: &'a dyn RendererFactory, config: TokenConfig) -> Self {
        Self { factory, config }
    }

    /// Launch a browser, open the registry and read the storage key.
    ///
    /// The browser is shut down on every path.
    pub async fn fetch(&self) -> Result<String, TokenError> {
        info!("requesting token through browser: {}", self.config.page_url);
        let renderer = self
            .factory
            .launch()
            .await
            .map_err(|e| TokenError::Browser(format!("{e:#}")))?;

        let result = self.read_storage(renderer.as_ref()).await;

        if let Err(e) = renderer.shutdown().await {
            warn!("browser shutdown failed: {e:#}");
        }

        match result? {
            Some(token) => {
                match decode_expiry(&token) {
                    Ok(expires_at) => info!("token obtained, expires at {expires_at}"),
                    Err(e) => debug!("token obtained, expiry unknown: {e}"),
                }
                Ok(token)
            }
            None => Err(TokenError::Missing),
        }
    }

    async fn read_storage(&self, renderer: &dyn Renderer) -> Result<Option<String>, TokenError> {
        let mut ctx = renderer
            .new_context()
            .await
            .map_err(|e| TokenError::Browser(format!("{e:#}")))?;

        let timeout_ms = self.config.navigation_timeout.as_millis() as u64;
        let script = storage_script(&self.config.storage_key);

        let value = match ctx.navigate(&self.config.page_url, timeout_ms).await {
            Ok(nav) => {
                debug!("loaded {} in {}ms", nav.final_url, nav.load_time_ms);
                // The SPA writes the token asynchronously after load.
                sleep(self.config.settle).await;
                ctx.execute_js(&script).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = ctx.close().await {
            debug!("failed to close page: {e:#}");
        }

        let value = value.map_err(|e| TokenError::Browser(format!("{e:#}")))?;
        Ok(match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
    }
}

fn storage_script(key: &str) -> String {
    let key = serde_json::to_string(key).unwrap_or_else(|_| "\"\"".to_string());
    format!("window.localStorage.getItem({key}) || ''")
}

/// Use the supplied token after checking its expiry, or fall back to the
/// browser.
pub async fn obtain_token(
    supplied: Option<&str>,
    provider: &BrowserTokenProvider<'_>,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    match supplied.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => {
            let expires_at = validate_token(token, now)?;
            info!("using supplied token, expires at {expires_at}");
            Ok(strip_bearer(token).to_string())
        }
        None => provider.fetch().await,
    }
}
