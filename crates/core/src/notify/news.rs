use crate::config::Settings;
use crate::notify::error::NotifyError;
use crate::notify::Channel;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const MAX_HEADLINES: usize = 3;

// NewsAPI keeps deleted articles in results with this placeholder title.
const REMOVED_MARKER: &str = "[Removed]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct NewsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl NewsClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            http: settings.http_client()?,
            api_key: settings.require_news_api_key()?.to_string(),
            base_url: settings.news_api_base_url.clone(),
        })
    }

    /// Up to three recent headlines mentioning `company_name`; empty when nothing matches.
    pub async fn top_headlines(&self, company_name: &str) -> Result<Vec<Headline>> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);

        let url = format!("{}/v2/everything", self.base_url.trim_end_matches('/'));
        let page_size = MAX_HEADLINES.to_string();
        let res = self
            .http
            .get(url)
            .headers(headers)
            .query(&[
                ("qInTitle", company_name),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::new(Channel::News, "http", e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read news response")?;
        if !status.is_success() {
            return Err(NotifyError::new(
                Channel::News,
                "http",
                format!("status={status} body={text}"),
            )
            .into());
        }

        let parsed = serde_json::from_str::<EverythingResponse>(&text)
            .map_err(|e| NotifyError::new(Channel::News, "decode", e.to_string()))?;
        Ok(parsed.into_headlines())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Clone, Deserialize)]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl EverythingResponse {
    fn into_headlines(self) -> Vec<Headline> {
        self.articles
            .into_iter()
            .filter_map(|a| {
                let title = a.title?.trim().to_string();
                if title.is_empty() || title == REMOVED_MARKER {
                    return None;
                }
                Some(Headline {
                    title,
                    summary: a.description.map(|d| d.trim().to_string()).unwrap_or_default(),
                })
            })
            .take(MAX_HEADLINES)
            .collect()
    }
}
