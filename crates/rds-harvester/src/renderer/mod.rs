//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer`, `RenderContext` and `RendererFactory` traits that
//! abstract over the browser engine (currently Chromium via chromiumoxide).
//! Token extraction and contact enrichment only talk to these traits.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;

/// Result of navigating to a URL.
#[derive(Debug, Clone)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A running browser engine that can open rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine and its process.
    async fn shutdown(&self) -> Result<()>;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Reload the current page with a timeout.
    async fn reload(&mut self, timeout_ms: u64) -> Result<()>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the full rendered HTML.
    async fn get_html(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Launches dedicated browser instances.
///
/// Every caller gets its own engine and is responsible for calling
/// [`Renderer::shutdown`] on it.
#[async_trait]
pub trait RendererFactory: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Renderer>>;
}
