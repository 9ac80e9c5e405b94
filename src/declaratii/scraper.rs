//! Declaration retrieval against the integrity portal.
//!
//! One browser, one page, one logical thread of control: every name from the
//! input list runs through search, pagination, and per-row download in
//! sequence. A failure while processing one name is captured and the run
//! moves on; only browser launch failures are fatal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::browser::{challenge, locate, Locator};
use crate::config::ScraperConfig;
use crate::delay;
use crate::error::ScraperError;
use crate::traits::Scraper;

use super::download::{build_filename, DownloadCoordinator};
use super::extract;
use super::pagination::Paginator;
use super::types::{AggregateRecord, DownloadOutcome, ResultRow, SearchQuery};

/// Download controls on a results page, in DOM order.
const TRIGGER_SELECTOR: &str = "button.mdc-button";
const PAGE_READY_ATTEMPTS: u32 = 30;

/// Fallback chain for the search input. The portal's markup has shifted
/// between renders; the id match is the stable primary.
fn search_input_candidates() -> Vec<Locator> {
    vec![
        Locator::id("ssidLastName"),
        Locator::css("input.form-control[type='text']"),
        Locator::css("input[style*='width: 600px']"),
        Locator::css("input[type='text'][maxlength='60']"),
        Locator::css("input[type='text']"),
    ]
}

fn submit_candidates() -> Vec<Locator> {
    vec![
        Locator::css("button.btn.btn-success"),
        Locator::css("button[class*='btn-success']"),
        Locator::button_text("Cautare"),
        Locator::css("button[type='button']"),
        Locator::css("button.btn"),
    ]
}

pub struct DeclaratiiScraper {
    config: ScraperConfig,
    browser: Option<Browser>,
    page: Option<Arc<Page>>,
    aggregate: Vec<AggregateRecord>,
}

impl DeclaratiiScraper {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            browser: None,
            page: None,
            aggregate: Vec::new(),
        }
    }

    /// Records collected so far this run.
    pub fn records(&self) -> &[AggregateRecord] {
        &self.aggregate
    }

    fn get_page(&self) -> Result<&Arc<Page>, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::BrowserInit("browser not initialized".into()))
    }

    /// Submit one name query and extract the first results page.
    async fn search(
        &self,
        page: &Page,
        query: &SearchQuery,
    ) -> Result<Vec<ResultRow>, ScraperError> {
        info!("navigating to {}", self.config.base_url);
        page.goto(self.config.base_url.as_str())
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        self.wait_page_ready(page).await?;
        delay::inter_action().await;

        let input = locate(page, &search_input_candidates(), self.config.element_wait)
            .await
            .map_err(|e| ScraperError::SearchUnavailable(format!("search input: {}", e)))?;

        input
            .click()
            .await
            .map_err(|e| ScraperError::JavaScript(format!("focus search input: {}", e)))?;
        self.type_like_human(&input, query.as_str()).await?;
        delay::inter_action().await;

        let submit = locate(page, &submit_candidates(), self.config.element_wait)
            .await
            .map_err(|e| ScraperError::SearchUnavailable(format!("submit control: {}", e)))?;

        info!("submitting search for {}", query);
        submit
            .click()
            .await
            .map_err(|e| ScraperError::JavaScript(format!("submit click: {}", e)))?;

        challenge::wait_clear(page, self.config.challenge_timeout).await?;
        sleep(self.config.results_settle).await;

        extract::extract_current_page(page, self.config.element_wait).await
    }

    /// Inject the query one character at a time with randomized pauses.
    async fn type_like_human(&self, input: &Element, text: &str) -> Result<(), ScraperError> {
        for ch in text.chars() {
            input
                .type_str(ch.to_string())
                .await
                .map_err(|e| ScraperError::JavaScript(format!("keystroke: {}", e)))?;
            delay::keystroke().await;
        }
        Ok(())
    }

    async fn wait_page_ready(&self, page: &Page) -> Result<(), ScraperError> {
        for i in 0..PAGE_READY_ATTEMPTS {
            let state = page
                .evaluate("document.readyState")
                .await
                .map_err(|e| ScraperError::JavaScript(e.to_string()))?
                .into_value::<String>()
                .unwrap_or_default();

            if state == "complete" {
                debug!("page ready after {}s", i);
                return Ok(());
            }
            sleep(Duration::from_secs(1)).await;
        }
        warn!(
            "page not ready after {}s, proceeding anyway",
            PAGE_READY_ATTEMPTS
        );
        Ok(())
    }

    /// Search one name and walk every results page it yields.
    async fn process_name(&mut self, query: &SearchQuery) -> Result<(), ScraperError> {
        let page = self.get_page()?.clone();

        let first_page = match self.search(&page, query).await {
            Ok(rows) => rows,
            Err(ScraperError::NoTable) => Vec::new(),
            Err(e) => return Err(e),
        };

        if first_page.is_empty() {
            info!("no declarations found for {}", query);
            return Ok(());
        }
        info!(
            "found {} declarations on first page for {}",
            first_page.len(),
            query
        );

        let paginator = Paginator::new(self.config.element_wait);
        let mut current = first_page;
        loop {
            self.process_page_rows(&page, query, &current).await;
            match paginator.advance(&page).await? {
                Some(next) => {
                    info!("advanced to next page: {} rows", next.len());
                    current = next;
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Record an outcome for every row on the current page. Triggers are
    /// re-collected per page; the Nth downloadable row maps to the Nth
    /// trigger in DOM order.
    async fn process_page_rows(
        &mut self,
        page: &Page,
        query: &SearchQuery,
        rows: &[ResultRow],
    ) {
        let triggers = page
            .find_elements(TRIGGER_SELECTOR)
            .await
            .unwrap_or_default();
        debug!(
            "{} download triggers for {} rows",
            triggers.len(),
            rows.len()
        );

        let coordinator = DownloadCoordinator::new(
            self.config.download_dir.clone(),
            self.config.download_timeout,
        );
        let coordinator_ref = &coordinator;
        let triggers_ref = &triggers;

        process_rows_with(
            query,
            rows,
            move |trigger_idx, row| async move {
                match triggers_ref.get(trigger_idx) {
                    Some(trigger) => {
                        coordinator_ref
                            .fetch(trigger, &build_filename(&row))
                            .await
                    }
                    None => {
                        warn!(
                            "no trigger element for downloadable row {}",
                            row.subject_name
                        );
                        DownloadOutcome::failed()
                    }
                }
            },
            delay::inter_action,
            &mut self.aggregate,
        )
        .await;
    }

    /// Best-effort screenshot of whatever the page shows when a name fails.
    async fn capture_diagnostic(&self, query: &SearchQuery) {
        let Some(page) = self.page.as_ref() else {
            return;
        };
        let filename = format!("error_{}.png", sanitize_for_filename(query.as_str()));

        match page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(screenshot) => {
                if self.config.debug {
                    use base64::Engine;
                    let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
                    debug!("diagnostic screenshot: data:image/png;base64,{}", encoded);
                }
                match std::fs::write(&filename, &screenshot) {
                    Ok(()) => info!("saved diagnostic screenshot {}", filename),
                    Err(e) => warn!("failed to save diagnostic screenshot: {}", e),
                }
            }
            Err(e) => warn!("failed to capture diagnostic screenshot: {}", e),
        }
    }

    /// Persist the aggregate as JSON so an aborted run keeps what it saw.
    fn save_snapshot(&self) {
        let Some(path) = &self.config.snapshot_path else {
            return;
        };
        match serde_json::to_string_pretty(&self.aggregate) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    warn!("failed to write aggregate snapshot: {}", e);
                }
            }
            Err(e) => warn!("failed to serialize aggregate snapshot: {}", e),
        }
    }
}

#[async_trait]
impl Scraper for DeclaratiiScraper {
    async fn initialize(&mut self) -> Result<(), ScraperError> {
        info!("initializing browser...");

        std::fs::create_dir_all(&self.config.download_dir)?;
        let download_path = self
            .config
            .download_dir
            .canonicalize()
            .unwrap_or_else(|_| self.config.download_dir.clone());

        // Concurrent runs must not share a Chrome profile.
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("declaratii-{}", unique_id));

        let chrome_path = std::env::var("CHROME_PATH")
            .or_else(|_| std::env::var("CHROMIUM_PATH"))
            .unwrap_or_else(|_| "chromium".to_string());

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(&user_data_dir)
            .window_size(1280, 800);

        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .request_timeout(Duration::from_secs(60))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-extensions")
            .arg("--disable-software-rasterizer");

        if self.config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        let download_params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(download_path.to_string_lossy().to_string())
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("download behavior: {}", e)))?;

        page.execute(download_params)
            .await
            .map_err(|e| ScraperError::BrowserInit(format!("download behavior: {}", e)))?;

        self.browser = Some(browser);
        self.page = Some(Arc::new(page));

        info!("browser initialized");
        Ok(())
    }

    async fn run(
        &mut self,
        queries: &[SearchQuery],
    ) -> Result<Vec<AggregateRecord>, ScraperError> {
        let mut processed = 0usize;

        for query in queries {
            if query.is_empty() {
                warn!("skipping empty query");
                continue;
            }
            if processed > 0 {
                delay::between_names().await;
            }
            processed += 1;

            info!("processing name: {}", query);
            if let Err(e) = self.process_name(query).await {
                error!("error processing {}: {}", query, e);
                self.capture_diagnostic(query).await;
            }
            self.save_snapshot();
        }

        info!(
            "run finished: {} names, {} records",
            processed,
            self.aggregate.len()
        );
        Ok(std::mem::take(&mut self.aggregate))
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        info!("closing browser...");
        self.page = None;
        self.browser = None;
        Ok(())
    }
}

/// Per-row processing over an abstract download operation: one record is
/// appended per row no matter what the download does, and the download is
/// only attempted for rows that carry a control.
pub(crate) async fn process_rows_with<D, DFut, P, PFut>(
    query: &SearchQuery,
    rows: &[ResultRow],
    mut download: D,
    mut pace: P,
    sink: &mut Vec<AggregateRecord>,
) where
    D: FnMut(usize, ResultRow) -> DFut,
    DFut: std::future::Future<Output = DownloadOutcome>,
    P: FnMut() -> PFut,
    PFut: std::future::Future<Output = ()>,
{
    let mut trigger_idx = 0usize;

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            pace().await;
        }

        let outcome = if row.has_download {
            let outcome = download(trigger_idx, row.clone()).await;
            trigger_idx += 1;
            outcome
        } else {
            DownloadOutcome::not_available()
        };

        sink.push(AggregateRecord {
            query: query.clone(),
            row: row.clone(),
            outcome,
        });
    }
}

fn sanitize_for_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
