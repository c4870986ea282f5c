use bottomfish_core::config::Settings;
use bottomfish_core::domain::candidate::Candidate;
use bottomfish_core::notify::email::EmailNotifier;
use bottomfish_core::notify::error::NotifyError;
use bottomfish_core::notify::news::{Headline, NewsClient};
use bottomfish_core::notify::sms::SmsClient;
use bottomfish_core::notify::Channel;
use bottomfish_core::report;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Channels {
    pub news: bool,
    pub email: bool,
    pub sms: bool,
}

impl Channels {
    pub fn any(&self) -> bool {
        self.news || self.email || self.sms
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub channel: Channel,
    pub delivered: bool,
}

/// Runs every enabled channel. A failing channel is logged and reported, never propagated, so
/// the others still go out.
pub async fn dispatch(
    settings: &Settings,
    channels: Channels,
    rows: &[Candidate],
    today: NaiveDate,
) -> Vec<Delivery> {
    let mut out = Vec::new();
    if !channels.any() {
        return out;
    }
    let Some(top) = rows.first() else {
        return out;
    };

    // Outer `None`: news not requested. Inner `None`: lookup failed.
    let mut news: Option<Option<Vec<Headline>>> = None;
    if channels.news {
        let res = fetch_news(settings, &top.name).await;
        out.push(delivery(Channel::News, &res));
        let headlines = res.ok();
        print!("\n{}", report::render_headlines(&top.name, headlines.as_deref()));
        news = Some(headlines);
    }

    if channels.email {
        let news = news.as_ref().map(|h| (top.name.as_str(), h.as_deref()));
        let body = report::email_body(rows, news);
        let res = send_email(settings, &report::email_subject(today), &body).await;
        out.push(delivery(Channel::Email, &res));
    }

    if channels.sms {
        let res = send_sms(settings, &report::sms_body(rows)).await;
        out.push(delivery(Channel::Sms, &res));
    }

    out
}

async fn fetch_news(settings: &Settings, company_name: &str) -> anyhow::Result<Vec<Headline>> {
    let client = NewsClient::from_settings(settings)?;
    client.top_headlines(company_name).await
}

async fn send_email(settings: &Settings, subject: &str, body: &str) -> anyhow::Result<()> {
    let notifier = EmailNotifier::from_settings(settings)?;
    notifier.send(subject, body).await
}

async fn send_sms(settings: &Settings, body: &str) -> anyhow::Result<()> {
    let client = SmsClient::from_settings(settings)?;
    client.send(body).await.map(|_| ())
}

fn delivery<T>(channel: Channel, res: &anyhow::Result<T>) -> Delivery {
    if let Err(err) = res {
        sentry_anyhow::capture_anyhow(err);
        match err.downcast_ref::<NotifyError>() {
            Some(diag) => tracing::error!(
                channel = %diag.channel,
                stage = diag.stage,
                detail = %diag.detail,
                "notification failed"
            ),
            None => tracing::error!(
                %channel,
                error = %format!("{err:#}"),
                "notification failed"
            ),
        }
    }

    Delivery {
        channel,
        delivered: res.is_ok(),
    }
}
