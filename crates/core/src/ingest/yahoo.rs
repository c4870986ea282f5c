use crate::config::Settings;
use crate::domain::candidate::LoserRow;
use crate::ingest::{parse_num, PriceToBookSource};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use scraper::{ElementRef, Html, Selector};

// The site serves a consent wall or an empty shell to clients without a browser user agent.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const PRICE_TO_BOOK_LABEL: &str = "price/book";

#[derive(Debug, Clone)]
pub struct YahooClient {
    http: reqwest::Client,
    base_url: String,
    losers_path: String,
}

impl YahooClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            http: settings.http_client()?,
            base_url: settings.quotes_base_url.clone(),
            losers_path: settings.losers_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        // Row labels are matched in English.
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers
    }

    async fn get_page(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let res = self
            .http
            .get(url)
            .headers(Self::headers())
            .query(query)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read response from {url}"))?;
        if !status.is_success() {
            anyhow::bail!("{url} returned HTTP {status}");
        }
        Ok(text)
    }

    /// Fetches the day's losers listing. Any failure here means the run has nothing to screen.
    pub async fn fetch_losers(&self, count: usize) -> Result<Vec<LoserRow>> {
        let url = self.url(&self.losers_path);
        let html = self
            .get_page(&url, &[("start", "0".to_string()), ("count", count.to_string())])
            .await
            .context("losers list unavailable")?;

        let rows = parse_losers_table(&html).context("losers list unavailable")?;
        tracing::info!(rows = rows.len(), %url, "fetched losers list");
        Ok(rows)
    }

    pub async fn fetch_price_to_book(&self, symbol: &str) -> Result<Option<f64>> {
        let url = self.url(&format!("/quote/{symbol}/key-statistics/"));
        let html = self.get_page(&url, &[]).await?;
        parse_price_to_book(&html)
    }
}

#[async_trait::async_trait]
impl PriceToBookSource for YahooClient {
    fn source_name(&self) -> &'static str {
        "yahoo_key_statistics"
    }

    async fn price_to_book(&self, symbol: &str) -> Result<Option<f64>> {
        self.fetch_price_to_book(symbol).await
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("invalid selector {css:?}: {e:?}"))
}

fn cell_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_header(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

#[derive(Debug, Clone, Copy)]
struct LoserColumns {
    symbol: usize,
    name: usize,
    price: usize,
    pct_change: usize,
}

impl LoserColumns {
    fn from_headers(headers: &[String]) -> Option<Self> {
        let find =
            |accepted: &[&str]| headers.iter().position(|h| accepted.iter().any(|a| h == a));

        Some(Self {
            symbol: find(&["symbol"])?,
            name: find(&["name"])?,
            price: find(&["price (intraday)", "price"])?,
            pct_change: find(&["% change", "change %"])?,
        })
    }

    fn max_index(&self) -> usize {
        self.symbol.max(self.name).max(self.price).max(self.pct_change)
    }
}

/// Parses the losers listing by header text rather than column position.
///
/// Fails when no table with Symbol, Name, Price and % Change headers is present. Rows with an
/// unreadable price or percent change are skipped.
pub fn parse_losers_table(html: &str) -> Result<Vec<LoserRow>> {
    let document = Html::parse_document(html);
    let sel_table = selector("table")?;
    let sel_th = selector("thead th")?;
    let sel_tr = selector("tbody tr")?;
    let sel_td = selector("td")?;
    let sel_quote_link = selector("a[href*=\"/quote/\"]")?;
    let sel_titled = selector("[title]")?;

    let (table, columns) = document
        .select(&sel_table)
        .find_map(|table| {
            let headers: Vec<String> = table
                .select(&sel_th)
                .map(|th| normalize_header(&cell_text(&th)))
                .collect();
            LoserColumns::from_headers(&headers).map(|cols| (table, cols))
        })
        .context("losers table not found in page")?;

    let mut out = Vec::new();
    for (idx, tr) in table.select(&sel_tr).enumerate() {
        let cells: Vec<ElementRef<'_>> = tr.select(&sel_td).collect();
        if cells.len() <= columns.max_index() {
            continue;
        }

        let symbol_cell = &cells[columns.symbol];
        let symbol = symbol_cell
            .select(&sel_quote_link)
            .next()
            .map(|a| cell_text(&a))
            .unwrap_or_else(|| cell_text(symbol_cell));
        let Some(symbol) = symbol.split_whitespace().next().map(str::to_string) else {
            continue;
        };

        let name_cell = &cells[columns.name];
        let name = name_cell
            .value()
            .attr("title")
            .map(str::to_string)
            .or_else(|| {
                name_cell
                    .select(&sel_titled)
                    .next()
                    .and_then(|el| el.value().attr("title"))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| cell_text(name_cell));

        let price = parse_num(&cell_text(&cells[columns.price]));
        let pct_change = parse_num(&cell_text(&cells[columns.pct_change]));
        let (Some(price), Some(pct_change)) = (price, pct_change) else {
            tracing::warn!(idx, %symbol, "losers row has unreadable price or % change; skipping");
            continue;
        };

        out.push(LoserRow {
            symbol,
            name: name.trim().to_string(),
            price,
            pct_change,
        });
    }

    Ok(out)
}

/// Reads the current Price/Book value from a key-statistics page.
///
/// Depends on the statistics table keeping its "Price/Book" row label; a page without that row
/// yields `Ok(None)`, as does a row reporting "N/A".
pub fn parse_price_to_book(html: &str) -> Result<Option<f64>> {
    let document = Html::parse_document(html);
    let sel_tr = selector("tr")?;
    let sel_td = selector("td")?;

    for tr in document.select(&sel_tr) {
        let mut cells = tr.select(&sel_td);
        let Some(label) = cells.next() else {
            continue;
        };
        if !normalize_header(&cell_text(&label)).starts_with(PRICE_TO_BOOK_LABEL) {
            continue;
        }

        return Ok(cells.next().and_then(|value| parse_num(&cell_text(&value))));
    }

    Ok(None)
}
