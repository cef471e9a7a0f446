//! Contact enrichment: render each declaration's detail page in a dedicated
//! headless browser and pull the applicant's phone and email out of it.
//!
//! Every record gets its own browser instance, which is shut down on every
//! path. Failures never propagate: a record whose page cannot be rendered
//! is returned with empty contacts.

pub mod extract;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::EnrichConfig;
use crate::export::links::detail_url;
use crate::model::Declaration;
use crate::pool;
use crate::renderer::{RenderContext, Renderer, RendererFactory};

pub use extract::{extract_contacts, ContactInfo};

/// Renders detail pages and extracts contacts, one browser per record.
pub struct ContactEnricher {
    factory: Arc<dyn RendererFactory>,
    config: EnrichConfig,
    detail_base: String,
}

impl ContactEnricher {
    pub fn new(factory: Arc<dyn RendererFactory>, config: EnrichConfig, detail_base: &str) -> Self {
        Self {
            factory,
            config,
            detail_base: detail_base.trim_end_matches('/').to_string(),
        }
    }

    /// Enrich every record with at most `workers` browsers alive at once.
    ///
    /// Output order is completion order; the count always equals the input.
    pub async fn enrich_all(&self, records: Vec<Declaration>, workers: usize) -> Vec<Declaration> {
        let total = records.len();
        if total == 0 {
            return records;
        }
        info!("enriching {total} record(s) with {workers} browser(s)");

        let done = AtomicUsize::new(0);
        let found = AtomicUsize::new(0);

        let enriched = pool::run_bounded(records, workers, |mut record| {
            let done = &done;
            let found = &found;
            async move {
                let contacts = self.enrich_one(record.id).await;
                if !contacts.is_empty() {
                    found.fetch_add(1, Ordering::Relaxed);
                }
                record.apply_contacts(contacts);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(id = record.id, "enriched {n}/{total}");
                record
            }
        })
        .await;

        info!(
            "enrichment done: contacts found for {}/{total} record(s)",
            found.load(Ordering::Relaxed)
        );
        enriched
    }

    /// Contacts for one declaration. Never fails; unknown values are `None`.
    pub async fn enrich_one(&self, id: u64) -> ContactInfo {
        let renderer = match self.factory.launch().await {
            Ok(renderer) => renderer,
            Err(e) => {
                warn!(id, "failed to launch browser: {e:#}");
                return ContactInfo::default();
            }
        };

        let result = self.scrape(renderer.as_ref(), id).await;

        if let Err(e) = renderer.shutdown().await {
            debug!(id, "browser shutdown failed: {e:#}");
        }

        match result {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(id, "contact extraction failed: {e:#}");
                ContactInfo::default()
            }
        }
    }

    async fn scrape(&self, renderer: &dyn Renderer, id: u64) -> Result<ContactInfo> {
        let mut ctx = renderer.new_context().await?;
        let contacts = self.scrape_page(ctx.as_mut(), id).await;
        if let Err(e) = ctx.close().await {
            debug!(id, "failed to close page: {e:#}");
        }
        Ok(contacts)
    }

    /// Load the page, wait for the contacts section, reload between attempts.
    async fn scrape_page(&self, ctx: &mut dyn RenderContext, id: u64) -> ContactInfo {
        let url = detail_url(&self.detail_base, id);
        let timeout_ms = self.config.navigation_timeout.as_millis() as u64;
        let attempts = self.config.attempts.max(1);
        let mut loaded = false;

        for attempt in 1..=attempts {
            if attempt > 1 {
                sleep(self.config.retry_pause).await;
            }

            // A page that never loaded has nothing to reload.
            let nav = if loaded {
                ctx.reload(timeout_ms).await
            } else {
                ctx.navigate(&url, timeout_ms).await.map(|_| ())
            };
            if let Err(e) = nav {
                debug!(id, attempt, "page load failed: {e:#}");
                continue;
            }
            loaded = true;

            if let Some(html) = self.wait_for_marker(&*ctx).await {
                return extract_contacts(&html);
            }
            debug!(id, attempt, "contacts section did not render in time");
        }

        warn!(id, "giving up after {attempts} attempt(s): {url}");
        ContactInfo::default()
    }

    /// Poll the DOM until the marker text shows up or the wait runs out.
    async fn wait_for_marker(&self, ctx: &dyn RenderContext) -> Option<String> {
        let deadline = Instant::now() + self.config.wait_timeout;
        loop {
            match ctx.get_html().await {
                Ok(html) if html.contains(&self.config.marker) => return Some(html),
                Ok(_) => {}
                Err(e) => debug!("failed to read DOM: {e:#}"),
            }
            if Instant::now() >= deadline {
                return None;
            }
            sleep(self.config.poll_interval).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory renderer used by enrichment and token tests.

    use super::*;
    use crate::renderer::NavigationResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type RenderFn = dyn Fn(&str, usize) -> String + Send + Sync;

    /// Shared counters plus a page function `(url, load_no) -> html`.
    pub struct MockState {
        pub launches: AtomicUsize,
        pub shutdowns: AtomicUsize,
        pub navigations: AtomicUsize,
        pub reloads: AtomicUsize,
        pub live: AtomicUsize,
        pub peak_live: AtomicUsize,
        pub fail_launch: bool,
        pub fail_navigation: bool,
        pub scripts: Mutex<Vec<String>>,
        pub js_result: serde_json::Value,
        render: Box<RenderFn>,
    }

    impl MockState {
        pub fn new(render: impl Fn(&str, usize) -> String + Send + Sync + 'static) -> Self {
            Self {
                launches: AtomicUsize::new(0),
                shutdowns: AtomicUsize::new(0),
                navigations: AtomicUsize::new(0),
                reloads: AtomicUsize::new(0),
                live: AtomicUsize::new(0),
                peak_live: AtomicUsize::new(0),
                fail_launch: false,
                fail_navigation: false,
                scripts: Mutex::new(Vec::new()),
                js_result: serde_json::Value::Null,
                render: Box::new(render),
            }
        }
    }

    pub struct MockFactory(pub Arc<MockState>);

    #[async_trait]
    impl RendererFactory for MockFactory {
        async fn launch(&self) -> Result<Box<dyn Renderer>> {
            self.0.launches.fetch_add(1, Ordering::SeqCst);
            if self.0.fail_launch {
                anyhow::bail!("no browser");
            }
            let live = self.0.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.0.peak_live.fetch_max(live, Ordering::SeqCst);
            Ok(Box::new(MockRenderer(Arc::clone(&self.0))))
        }
    }

    struct MockRenderer(Arc<MockState>);

    #[async_trait]
    impl Renderer for MockRenderer {
        async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
            Ok(Box::new(MockContext {
                state: Arc::clone(&self.0),
                url: None,
                loads: 0,
            }))
        }

        async fn shutdown(&self) -> Result<()> {
            // Yield so concurrent workers overlap in tests.
            tokio::task::yield_now().await;
            self.0.live.fetch_sub(1, Ordering::SeqCst);
            self.0.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct MockContext {
        state: Arc<MockState>,
        url: Option<String>,
        loads: usize,
    }

    #[async_trait]
    impl RenderContext for MockContext {
        async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
            self.state.navigations.fetch_add(1, Ordering::SeqCst);
            if self.state.fail_navigation {
                anyhow::bail!("navigation timed out");
            }
            self.url = Some(url.to_string());
            self.loads += 1;
            Ok(NavigationResult {
                final_url: url.to_string(),
                load_time_ms: 1,
            })
        }

        async fn reload(&mut self, _timeout_ms: u64) -> Result<()> {
            self.state.reloads.fetch_add(1, Ordering::SeqCst);
            self.loads += 1;
            Ok(())
        }

        async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
            if let Ok(mut scripts) = self.state.scripts.lock() {
                scripts.push(script.to_string());
            }
            Ok(self.state.js_result.clone())
        }

        async fn get_html(&self) -> Result<String> {
            let url = self.url.as_deref().unwrap_or("about:blank");
            Ok((self.state.render)(url, self.loads))
        }

        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockFactory, MockState};
    use super::*;
    use std::time::Duration;

    const BASE: &str = "https://pub.fsa.gov.ru/rds/declaration/view";

    fn page_with_contacts(url: &str) -> String {
        let id = url
            .trim_start_matches(BASE)
            .trim_matches('/')
            .trim_end_matches("/common");
        format!(
            r#"<h2>Сведения о заявителе</h2>
            <fgis-applicant-contacts>
              <div class="info-row"><div>Номер телефона</div><div>+7 (495) 000-00-{id:0>2}</div></div>
              <div class="info-row"><div>Адрес электронной почты</div><div>org{id}@example.ru</div></div>
            </fgis-applicant-contacts>"#
        )
    }

    fn fast_config() -> EnrichConfig {
        EnrichConfig {
            wait_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            ..EnrichConfig::default()
        }
    }

    fn enricher(state: &Arc<MockState>) -> ContactEnricher {
        ContactEnricher::new(Arc::new(MockFactory(Arc::clone(state))), fast_config(), BASE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrich_one_reads_contacts() {
        let state = Arc::new(MockState::new(|url, _| page_with_contacts(url)));

        let info = enricher(&state).enrich_one(7).await;

        assert_eq!(info.phone.as_deref(), Some("+7 (495) 000-00-07"));
        assert_eq!(info.email.as_deref(), Some("org7@example.ru"));
        assert_eq!(state.launches.load(Ordering::SeqCst), 1);
        assert_eq!(state.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(state.reloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reloads_until_marker_appears() {
        // Contacts render only after the second reload.
        let state = Arc::new(MockState::new(|url, loads| {
            if loads >= 3 {
                page_with_contacts(url)
            } else {
                "<div class=\"spinner\"></div>".to_string()
            }
        }));

        let info = enricher(&state).enrich_one(5).await;

        assert_eq!(info.email.as_deref(), Some("org5@example.ru"));
        assert_eq!(state.navigations.load(Ordering::SeqCst), 1);
        assert_eq!(state.reloads.load(Ordering::SeqCst), 2);
        assert_eq!(state.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_timeout_gives_empty_contacts() {
        let state = Arc::new(MockState::new(|_, _| "<p>loading</p>".to_string()));

        let info = enricher(&state).enrich_one(1).await;

        assert_eq!(info, ContactInfo::default());
        assert_eq!(state.navigations.load(Ordering::SeqCst), 1);
        assert_eq!(state.reloads.load(Ordering::SeqCst), 2);
        assert_eq!(state.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_navigation_is_retried_without_reload() {
        let mut state = MockState::new(|url, _| page_with_contacts(url));
        state.fail_navigation = true;
        let state = Arc::new(state);

        let info = enricher(&state).enrich_one(3).await;

        assert!(info.is_empty());
        assert_eq!(state.navigations.load(Ordering::SeqCst), 3);
        assert_eq!(state.reloads.load(Ordering::SeqCst), 0);
        assert_eq!(state.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure_gives_empty_contacts() {
        let mut state = MockState::new(|url, _| page_with_contacts(url));
        state.fail_launch = true;
        let state = Arc::new(state);

        let info = enricher(&state).enrich_one(3).await;

        assert!(info.is_empty());
        assert_eq!(state.shutdowns.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrich_all_processes_each_record_once() {
        let state = Arc::new(MockState::new(|url, _| page_with_contacts(url)));
        let records: Vec<Declaration> = (1..=10).map(Declaration::with_id).collect();

        let mut out = enricher(&state).enrich_all(records, 3).await;

        assert_eq!(out.len(), 10);
        out.sort_by_key(|r| r.id);
        for (i, record) in out.iter().enumerate() {
            let id = i as u64 + 1;
            assert_eq!(record.id, id);
            assert_eq!(record.applicant_email, format!("org{id}@example.ru"));
        }
        assert_eq!(state.launches.load(Ordering::SeqCst), 10);
        assert_eq!(state.shutdowns.load(Ordering::SeqCst), 10);
        assert!(state.peak_live.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_enrich_all_empty_input() {
        let state = Arc::new(MockState::new(|_, _| String::new()));
        let out = enricher(&state).enrich_all(Vec::new(), 3).await;
        assert!(out.is_empty());
        assert_eq!(state.launches.load(Ordering::SeqCst), 0);
    }
}
