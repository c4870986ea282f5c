use crate::config::Settings;
use crate::ingest::{parse_num, RatingSource};
use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

// Consent walls differ by region; any of these dismisses the dialog.
const CONSENT_BUTTONS: &[&str] = &[
    "button[name=\"agree\"]",
    "button.accept-all",
    "button[value=\"agree\"]",
];

// Tried in order; older and newer quote page layouts.
const RATING_SELECTORS: &[&str] = &[
    "[data-test=\"rec-rating-txt\"]",
    "[data-testid=\"analyst-rating\"] .rating",
    "section[data-testid=\"analyst-recommendations-card\"] [class*=\"rating\"]",
];

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Analyst rating lookup through a headless Chromium session.
///
/// The rating is rendered client-side after the consent dialog is dismissed and the page is
/// scrolled, so a plain HTTP fetch never sees it. The browser is launched on the first lookup and
/// serves the rest of the run, one tab per symbol. If it cannot be launched every rating is
/// absent.
pub struct BrowserRatingClient {
    settings: BrowserSettings,
    session: OnceCell<Option<BrowserSession>>,
}

#[derive(Debug, Clone)]
struct BrowserSettings {
    base_url: String,
    chrome_path: Option<String>,
    headless: bool,
    request_timeout: Duration,
    wait: Duration,
}

struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserRatingClient {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            settings: BrowserSettings {
                base_url: settings.quotes_base_url.clone(),
                chrome_path: settings.chrome_path.clone(),
                headless: settings.browser_headless,
                request_timeout: settings.http_timeout,
                wait: settings.rating_wait,
            },
            session: OnceCell::new(),
        }
    }

    async fn session(&self) -> Option<&BrowserSession> {
        self.session
            .get_or_init(|| async {
                match BrowserSession::launch(&self.settings).await {
                    Ok(session) => Some(session),
                    Err(err) => {
                        tracing::error!(
                            error = %format!("{err:#}"),
                            "browser unavailable; ratings will be absent"
                        );
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    pub async fn shutdown(self) {
        if let Some(Some(session)) = self.session.into_inner() {
            session.close().await;
        }
    }

    fn quote_url(&self, symbol: &str) -> String {
        format!("{}/quote/{symbol}/", self.settings.base_url.trim_end_matches('/'))
    }

    async fn read_rating(&self, page: &Page, symbol: &str) -> Result<Option<f64>> {
        page.wait_for_navigation()
            .await
            .context("quote page navigation failed")?;

        if dismiss_consent(page).await {
            tracing::debug!(%symbol, "consent dialog dismissed");
            page.wait_for_navigation()
                .await
                .context("navigation after consent failed")?;
        }

        let deadline = Instant::now() + self.settings.wait;
        loop {
            page.evaluate(SCROLL_SCRIPT)
                .await
                .context("scroll script failed")?;

            if let Some(text) = find_rating_text(page).await {
                return Ok(parse_rating(&text));
            }

            if Instant::now() >= deadline {
                tracing::debug!(
                    %symbol,
                    wait = ?self.settings.wait,
                    "rating element never rendered"
                );
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

impl BrowserSession {
    async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(settings.request_timeout)
            .window_size(1280, 1024);
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = settings.chrome_path.as_deref() {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("invalid browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch chromium")?;

        // The CDP connection only makes progress while its handler stream is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!(headless = settings.headless, "browser launched for rating lookups");
        Ok(Self { browser, handler })
    }

    async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            tracing::warn!(error = %err, "browser close failed");
        }
        if let Err(err) = self.browser.wait().await {
            tracing::warn!(error = %err, "browser process did not exit cleanly");
        }
        self.handler.abort();
    }
}

#[async_trait::async_trait]
impl RatingSource for BrowserRatingClient {
    fn source_name(&self) -> &'static str {
        "yahoo_quote_browser"
    }

    async fn rating(&self, symbol: &str) -> Result<Option<f64>> {
        let Some(session) = self.session().await else {
            return Ok(None);
        };

        let page = session
            .browser
            .new_page(self.quote_url(symbol).as_str())
            .await
            .context("failed to open browser tab")?;

        let res = self.read_rating(&page, symbol).await;

        if let Err(err) = page.close().await {
            tracing::warn!(%symbol, error = %err, "failed to close browser tab");
        }
        res
    }
}

async fn dismiss_consent(page: &Page) -> bool {
    for css in CONSENT_BUTTONS {
        if let Ok(button) = page.find_element(*css).await {
            if button.click().await.is_ok() {
                return true;
            }
        }
    }
    false
}

async fn find_rating_text(page: &Page) -> Option<String> {
    for css in RATING_SELECTORS {
        let Ok(el) = page.find_element(*css).await else {
            continue;
        };
        if let Ok(Some(text)) = el.inner_text().await {
            if !text.trim().is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Ratings live on a 1 (strong buy) to 5 (strong sell) scale; anything else is page noise.
pub fn parse_rating(text: &str) -> Option<f64> {
    parse_num(text).filter(|v| (1.0..=5.0).contains(v))
}
