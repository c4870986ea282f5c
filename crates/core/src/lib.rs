pub mod domain;
pub mod ingest;
pub mod notify;
pub mod report;
pub mod screen;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_QUOTES_BASE_URL: &str = "https://finance.yahoo.com";
    const DEFAULT_LOSERS_PATH: &str = "/markets/stocks/losers/";
    const DEFAULT_NEWS_API_BASE_URL: &str = "https://newsapi.org";
    const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";
    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_RATING_WAIT_SECS: u64 = 15;
    const DEFAULT_SMTP_PORT: u16 = 587;
    const DEFAULT_PROGRESS_EVERY: usize = 10;
    const DEFAULT_SCREEN_MAX_PCT_CHANGE: f64 = -5.0;
    const DEFAULT_SCREEN_MAX_RATING: f64 = 2.5;

    /// Everything the run needs from the environment, read once at startup.
    #[derive(Debug, Clone)]
    pub struct Settings {
        pub quotes_base_url: String,
        pub losers_path: String,
        pub http_timeout: Duration,
        pub progress_every: usize,

        pub screen_max_pct_change: f64,
        pub screen_max_rating: f64,

        pub chrome_path: Option<String>,
        pub browser_headless: bool,
        pub rating_wait: Duration,

        pub news_api_key: Option<String>,
        pub news_api_base_url: String,

        pub smtp_host: Option<String>,
        pub smtp_port: u16,
        pub smtp_username: Option<String>,
        pub smtp_password: Option<String>,
        pub email_from: Option<String>,
        pub email_to: Option<String>,

        pub twilio_account_sid: Option<String>,
        pub twilio_auth_token: Option<String>,
        pub twilio_from: Option<String>,
        pub twilio_base_url: String,
        pub sms_to: Option<String>,

        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                quotes_base_url: DEFAULT_QUOTES_BASE_URL.to_string(),
                losers_path: DEFAULT_LOSERS_PATH.to_string(),
                http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
                progress_every: DEFAULT_PROGRESS_EVERY,
                screen_max_pct_change: DEFAULT_SCREEN_MAX_PCT_CHANGE,
                screen_max_rating: DEFAULT_SCREEN_MAX_RATING,
                chrome_path: None,
                browser_headless: true,
                rating_wait: Duration::from_secs(DEFAULT_RATING_WAIT_SECS),
                news_api_key: None,
                news_api_base_url: DEFAULT_NEWS_API_BASE_URL.to_string(),
                smtp_host: None,
                smtp_port: DEFAULT_SMTP_PORT,
                smtp_username: None,
                smtp_password: None,
                email_from: None,
                email_to: None,
                twilio_account_sid: None,
                twilio_auth_token: None,
                twilio_from: None,
                twilio_base_url: DEFAULT_TWILIO_BASE_URL.to_string(),
                sms_to: None,
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let http_timeout_secs =
                parse_var("HTTP_TIMEOUT_SECS")?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
            let rating_wait_secs =
                parse_var("RATING_WAIT_SECS")?.unwrap_or(DEFAULT_RATING_WAIT_SECS);

            Ok(Self {
                quotes_base_url: non_empty_var("QUOTES_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_QUOTES_BASE_URL.to_string()),
                losers_path: non_empty_var("LOSERS_PATH")
                    .unwrap_or_else(|| DEFAULT_LOSERS_PATH.to_string()),
                http_timeout: Duration::from_secs(http_timeout_secs),
                progress_every: parse_var("PROGRESS_EVERY")?.unwrap_or(DEFAULT_PROGRESS_EVERY),
                screen_max_pct_change: parse_finite("SCREEN_MAX_PCT_CHANGE")?
                    .unwrap_or(DEFAULT_SCREEN_MAX_PCT_CHANGE),
                screen_max_rating: parse_finite("SCREEN_MAX_RATING")?
                    .unwrap_or(DEFAULT_SCREEN_MAX_RATING),
                chrome_path: non_empty_var("CHROME_PATH"),
                browser_headless: parse_var("BROWSER_HEADLESS")?.unwrap_or(true),
                rating_wait: Duration::from_secs(rating_wait_secs),
                news_api_key: non_empty_var("NEWS_API_KEY"),
                news_api_base_url: non_empty_var("NEWS_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_NEWS_API_BASE_URL.to_string()),
                smtp_host: non_empty_var("SMTP_HOST"),
                smtp_port: parse_var("SMTP_PORT")?.unwrap_or(DEFAULT_SMTP_PORT),
                smtp_username: non_empty_var("SMTP_USERNAME"),
                smtp_password: non_empty_var("SMTP_PASSWORD"),
                email_from: non_empty_var("EMAIL_FROM"),
                email_to: non_empty_var("EMAIL_TO"),
                twilio_account_sid: non_empty_var("TWILIO_ACCOUNT_SID"),
                twilio_auth_token: non_empty_var("TWILIO_AUTH_TOKEN"),
                twilio_from: non_empty_var("TWILIO_FROM"),
                twilio_base_url: non_empty_var("TWILIO_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_TWILIO_BASE_URL.to_string()),
                sms_to: non_empty_var("SMS_TO"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_news_api_key(&self) -> anyhow::Result<&str> {
            self.news_api_key
                .as_deref()
                .context("NEWS_API_KEY is required")
        }

        pub fn require_smtp_host(&self) -> anyhow::Result<&str> {
            self.smtp_host.as_deref().context("SMTP_HOST is required")
        }

        pub fn require_smtp_credentials(&self) -> anyhow::Result<(&str, &str)> {
            let username = self
                .smtp_username
                .as_deref()
                .context("SMTP_USERNAME is required")?;
            let password = self
                .smtp_password
                .as_deref()
                .context("SMTP_PASSWORD is required")?;
            Ok((username, password))
        }

        /// Sender address; falls back to the relay login, which is what most relays expect.
        pub fn require_email_from(&self) -> anyhow::Result<&str> {
            self.email_from
                .as_deref()
                .or(self.smtp_username.as_deref())
                .context("EMAIL_FROM (or SMTP_USERNAME) is required")
        }

        pub fn require_email_to(&self) -> anyhow::Result<&str> {
            self.email_to.as_deref().context("EMAIL_TO is required")
        }

        pub fn require_twilio_credentials(&self) -> anyhow::Result<(&str, &str)> {
            let sid = self
                .twilio_account_sid
                .as_deref()
                .context("TWILIO_ACCOUNT_SID is required")?;
            let token = self
                .twilio_auth_token
                .as_deref()
                .context("TWILIO_AUTH_TOKEN is required")?;
            Ok((sid, token))
        }

        pub fn require_twilio_from(&self) -> anyhow::Result<&str> {
            self.twilio_from.as_deref().context("TWILIO_FROM is required")
        }

        pub fn require_sms_to(&self) -> anyhow::Result<&str> {
            self.sms_to.as_deref().context("SMS_TO is required")
        }

        pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
            reqwest::Client::builder()
                .timeout(self.http_timeout)
                .build()
                .context("failed to build http client")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        non_empty_var(key)
            .map(|s| s.parse::<T>().with_context(|| format!("{key} is invalid: {s}")))
            .transpose()
    }

    fn parse_finite(key: &str) -> anyhow::Result<Option<f64>> {
        let value = parse_var::<f64>(key)?;
        if let Some(v) = value {
            anyhow::ensure!(v.is_finite(), "{key} must be a finite number: {v}");
        }
        Ok(value)
    }

}
