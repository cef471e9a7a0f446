//! Chromium-based renderer using chromiumoxide.

use super::{NavigationResult, RenderContext, Renderer, RendererFactory};
use crate::config::BrowserOptions;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    // 1. Explicit option
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.clone());
        }
    }

    // 2. RDS_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("RDS_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches one headless Chromium per call.
pub struct ChromiumFactory {
    options: BrowserOptions,
}

impl ChromiumFactory {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl RendererFactory for ChromiumFactory {
    async fn launch(&self) -> Result<Box<dyn Renderer>> {
        Ok(Box::new(ChromiumRenderer::launch(&self.options).await?))
    }
}

/// Chromium-based renderer owning its own browser process.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    handler: std::sync::Mutex<Option<JoinHandle<()>>>,
    // Removed when the renderer is dropped.
    _profile: TempDir,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance with a private profile directory.
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let chrome_path = find_chromium(options.chrome_path.as_ref())
            .context("Chromium not found. Install Chrome/Chromium or set RDS_CHROMIUM_PATH.")?;
        let profile = tempfile::Builder::new()
            .prefix("rds-harvester-")
            .tempdir()
            .context("failed to create browser profile directory")?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(profile.path())
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");

        if options.headed {
            builder = builder.with_head();
        } else {
            builder = builder.arg("--headless=new");
        }
        if let Some(proxy) = &options.proxy {
            builder = builder.arg(format!("--proxy-server={proxy}"));
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler: std::sync::Mutex::new(Some(handler)),
            _profile: profile,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        Ok(Box::new(ChromiumContext { page: Some(page) }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("graceful browser close failed ({e}), killing process");
            if let Some(Err(e)) = browser.kill().await {
                warn!("failed to kill browser process: {e}");
            }
        }
        if let Err(e) = browser.wait().await {
            debug!("waiting for browser exit failed: {e}");
        }

        let handler = self.handler.lock().ok().and_then(|mut h| h.take());
        if let Some(handler) = handler {
            handler.abort();
        }
        Ok(())
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Option<Page>,
}

impl ChromiumContext {
    fn page(&self) -> Result<&Page> {
        self.page.as_ref().context("page already closed")
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();
        let page = self.page()?;

        let result = tokio::time::timeout(Duration::from_millis(timeout_ms), page.goto(url)).await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn reload(&mut self, timeout_ms: u64) -> Result<()> {
        let page = self.page()?;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), page.reload()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => bail!("reload failed: {e}"),
            Err(_) => bail!("reload timed out after {timeout_ms}ms"),
        }
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page()?
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn get_html(&self) -> Result<String> {
        let result = self
            .page()?
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        let html: String = result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))?;

        Ok(html)
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        Ok(())
    }
}
