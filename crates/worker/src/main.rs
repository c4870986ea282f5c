use anyhow::Context;
use bottomfish_core::config::Settings;
use bottomfish_core::ingest::browser::BrowserRatingClient;
use bottomfish_core::ingest::yahoo::YahooClient;
use bottomfish_core::report;
use bottomfish_core::screen::pipeline::{ScreenOutcome, Screener};
use bottomfish_core::screen::ScreenOptions;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod fanout;

#[derive(Debug, Parser)]
#[command(name = "bottomfish", about = "Screen today's biggest losers for bottom fishing picks")]
struct Args {
    /// Look up recent headlines for the top pick.
    #[arg(long)]
    news: bool,

    /// Email the result table.
    #[arg(long)]
    email: bool,

    /// Text the picked symbols.
    #[arg(long)]
    sms: bool,

    /// Rows requested from the losers listing.
    #[arg(long, default_value_t = 100)]
    count: usize,
}

impl Args {
    fn channels(&self) -> fanout::Channels {
        fanout::Channels {
            news: self.news,
            email: self.email,
            sms: self.sms,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(&settings, &args).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "screening run failed");
        return Err(err);
    }
    Ok(())
}

async fn run(settings: &Settings, args: &Args) -> anyhow::Result<()> {
    anyhow::ensure!(args.count >= 1, "--count must be at least 1");
    let opts = ScreenOptions::from_settings(settings);

    let yahoo = YahooClient::from_settings(settings)?;
    let losers = yahoo
        .fetch_losers(args.count)
        .await
        .context("cannot screen without a losers list")?;

    let ratings = BrowserRatingClient::from_settings(settings);
    let report = Screener::new(&yahoo, &ratings, opts)
        .with_progress_every(settings.progress_every)
        .run(losers)
        .await;
    ratings.shutdown().await;

    tracing::info!(
        losers = report.counts.losers,
        after_pct_change = report.counts.after_pct_change,
        after_price_to_book = report.counts.after_price_to_book,
        after_rating = report.counts.after_rating,
        "screen summary"
    );

    let rows = match report.outcome {
        ScreenOutcome::Candidates(rows) => rows,
        ScreenOutcome::Exhausted { emptied_at } => {
            println!("No candidates: the {emptied_at} filter left nothing to report.");
            return Ok(());
        }
    };

    print!("{}", report::render_table(&rows));

    let today = chrono::Local::now().date_naive();
    let deliveries = fanout::dispatch(settings, args.channels(), &rows, today).await;
    for d in &deliveries {
        tracing::debug!(channel = %d.channel, delivered = d.delivered, "notification outcome");
    }

    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
