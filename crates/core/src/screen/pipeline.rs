use crate::domain::candidate::{Candidate, LoserRow};
use crate::ingest::{PriceToBookSource, RatingSource};
use crate::screen::{
    filter_pct_change, filter_price_to_book, filter_rating, ScreenOptions, ScreenStage,
};

const MAX_LOGGED_FAILURES: usize = 10;

/// Result of one pass through the filter chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenOutcome {
    /// Every gate passed at least one row; sorted by rating, unrated last.
    Candidates(Vec<Candidate>),

    /// The gate that left nothing behind. A valid result, not a failure.
    Exhausted { emptied_at: ScreenStage },
}

/// Row counts after each gate, for the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenCounts {
    pub losers: usize,
    pub after_pct_change: usize,
    pub after_price_to_book: usize,
    pub after_rating: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenReport {
    pub outcome: ScreenOutcome,
    pub counts: ScreenCounts,
}

pub struct Screener<'a> {
    price_to_book: &'a dyn PriceToBookSource,
    ratings: &'a dyn RatingSource,
    opts: ScreenOptions,
    progress_every: usize,
}

impl<'a> Screener<'a> {
    pub fn new(
        price_to_book: &'a dyn PriceToBookSource,
        ratings: &'a dyn RatingSource,
        opts: ScreenOptions,
    ) -> Self {
        Self {
            price_to_book,
            ratings,
            opts,
            progress_every: 10,
        }
    }

    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every;
        self
    }

    /// Runs the chain ALL -> PCT_FILTERED -> PB_FILTERED -> RATING_FILTERED -> DONE.
    ///
    /// Each metric is only scraped for rows that survived the previous gate, and a failed lookup
    /// leaves that one value absent.
    pub async fn run(&self, losers: Vec<LoserRow>) -> ScreenReport {
        let mut counts = ScreenCounts {
            losers: losers.len(),
            ..ScreenCounts::default()
        };
        let mut stage = ScreenStage::All;
        let rows: Vec<Candidate> = losers.into_iter().map(Candidate::from).collect();

        let mut rows = filter_pct_change(rows, &self.opts);
        stage = stage.next();
        counts.after_pct_change = rows.len();
        if rows.is_empty() {
            return exhausted(stage, counts);
        }

        self.enrich_price_to_book(&mut rows).await;
        let mut rows = filter_price_to_book(rows);
        stage = stage.next();
        counts.after_price_to_book = rows.len();
        if rows.is_empty() {
            return exhausted(stage, counts);
        }

        self.enrich_ratings(&mut rows).await;
        let rows = filter_rating(rows, &self.opts);
        stage = stage.next();
        counts.after_rating = rows.len();
        if rows.is_empty() {
            return exhausted(stage, counts);
        }

        tracing::debug!(stage = %stage.next(), "screen complete");
        ScreenReport {
            outcome: ScreenOutcome::Candidates(rows),
            counts,
        }
    }

    async fn enrich_price_to_book(&self, rows: &mut [Candidate]) {
        let total = rows.len();
        let mut failures: usize = 0;

        for (idx, row) in rows.iter_mut().enumerate() {
            match self.price_to_book.price_to_book(&row.symbol).await {
                Ok(v) => row.price_to_book = v,
                Err(err) => {
                    failures += 1;
                    if failures <= MAX_LOGGED_FAILURES {
                        tracing::warn!(
                            idx,
                            symbol = %row.symbol,
                            source = self.price_to_book.source_name(),
                            failure_count = failures,
                            error = %err,
                            "price-to-book lookup failed; treating as absent"
                        );
                    }
                }
            }
            self.log_progress("price_to_book", idx + 1, total, failures);
        }
    }

    async fn enrich_ratings(&self, rows: &mut [Candidate]) {
        let total = rows.len();
        let mut failures: usize = 0;

        for (idx, row) in rows.iter_mut().enumerate() {
            match self.ratings.rating(&row.symbol).await {
                Ok(v) => row.rating = v,
                Err(err) => {
                    failures += 1;
                    if failures <= MAX_LOGGED_FAILURES {
                        tracing::warn!(
                            idx,
                            symbol = %row.symbol,
                            source = self.ratings.source_name(),
                            failure_count = failures,
                            error = %err,
                            "rating lookup failed; treating as absent"
                        );
                    }
                }
            }
            self.log_progress("rating", idx + 1, total, failures);
        }
    }

    fn log_progress(&self, stage: &'static str, processed: usize, total: usize, failures: usize) {
        if self.progress_every == 0 {
            return;
        }
        if processed == 1 || processed == total || processed % self.progress_every == 0 {
            tracing::info!(stage, processed, total, failures, "enrichment progress");
        }
    }
}

fn exhausted(emptied_at: ScreenStage, counts: ScreenCounts) -> ScreenReport {
    tracing::info!(stage = %emptied_at, ?counts, "no candidates left");
    ScreenReport {
        outcome: ScreenOutcome::Exhausted { emptied_at },
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned values and records which symbols were asked for.
    #[derive(Default)]
    struct Canned {
        values: HashMap<&'static str, Option<f64>>,
        failing: Vec<&'static str>,
        asked: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(values: &[(&'static str, Option<f64>)]) -> Self {
            Self {
                values: values.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn lookup(&self, symbol: &str) -> Result<Option<f64>> {
            self.asked.lock().unwrap().push(symbol.to_string());
            if self.failing.iter().any(|f| *f == symbol) {
                anyhow::bail!("page unavailable");
            }
            Ok(self.values.get(symbol).copied().flatten())
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl PriceToBookSource for Canned {
        fn source_name(&self) -> &'static str {
            "canned"
        }

        async fn price_to_book(&self, symbol: &str) -> Result<Option<f64>> {
            self.lookup(symbol)
        }
    }

    #[async_trait::async_trait]
    impl RatingSource for Canned {
        fn source_name(&self) -> &'static str {
            "canned"
        }

        async fn rating(&self, symbol: &str) -> Result<Option<f64>> {
            self.lookup(symbol)
        }
    }

    fn loser(symbol: &str, price: f64, pct_change: f64) -> LoserRow {
        LoserRow {
            symbol: symbol.to_string(),
            name: format!("{symbol} Inc"),
            price,
            pct_change,
        }
    }

    fn symbols(outcome: &ScreenOutcome) -> Vec<String> {
        match outcome {
            ScreenOutcome::Candidates(rows) => rows.iter().map(|c| c.symbol.clone()).collect(),
            ScreenOutcome::Exhausted { .. } => Vec::new(),
        }
    }

    #[tokio::test]
    async fn full_chain_narrows_and_sorts() {
        let pb = Canned::new(&[
            ("A", Some(15.0)),
            ("B", Some(8.0)),
            ("C", Some(30.0)),
            ("D", Some(50.0)),
            ("E", None),
        ]);
        let ratings = Canned::new(&[("A", Some(1.8)), ("C", None), ("D", Some(3.0))]);

        let losers = vec![
            loser("A", 10.0, -12.0),
            loser("B", 10.0, -9.0),
            loser("C", 20.0, -6.0),
            loser("D", 20.0, -7.0),
            loser("E", 5.0, -8.0),
            loser("F", 1.0, -4.9),
        ];

        let report = Screener::new(&pb, &ratings, ScreenOptions::default())
            .run(losers)
            .await;

        assert_eq!(symbols(&report.outcome), vec!["A", "C"]);
        assert_eq!(
            report.counts,
            ScreenCounts {
                losers: 6,
                after_pct_change: 5,
                after_price_to_book: 3,
                after_rating: 2,
            }
        );

        // F never reached enrichment; B and E were not sent to the browser.
        assert_eq!(pb.asked(), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(ratings.asked(), vec!["A", "C", "D"]);

        if let ScreenOutcome::Candidates(rows) = &report.outcome {
            assert_eq!(rows[0].price_to_book, Some(15.0));
            assert_eq!(rows[0].rating, Some(1.8));
            assert_eq!(rows[1].rating, None);
        }
    }

    #[tokio::test]
    async fn empty_losers_list_stops_at_first_gate() {
        let pb = Canned::default();
        let ratings = Canned::default();

        let report = Screener::new(&pb, &ratings, ScreenOptions::default())
            .run(Vec::new())
            .await;
        assert_eq!(
            report.outcome,
            ScreenOutcome::Exhausted {
                emptied_at: ScreenStage::PctFiltered
            }
        );
        assert!(pb.asked().is_empty());
    }

    #[tokio::test]
    async fn failed_lookups_are_absent_not_fatal() {
        let mut pb = Canned::new(&[("A", Some(15.0)), ("B", Some(15.0))]);
        pb.failing.push("B");
        let mut ratings = Canned::new(&[]);
        ratings.failing.push("A");

        let losers = vec![loser("A", 10.0, -12.0), loser("B", 10.0, -12.0)];
        let report = Screener::new(&pb, &ratings, ScreenOptions::default())
            .with_progress_every(0)
            .run(losers)
            .await;

        // B lost its ratio and is dropped; A's rating lookup failed, so A passes unrated.
        assert_eq!(symbols(&report.outcome), vec!["A"]);
    }

    #[tokio::test]
    async fn price_to_book_gate_can_exhaust_the_run() {
        let pb = Canned::new(&[("A", Some(8.0))]);
        let ratings = Canned::default();

        let report = Screener::new(&pb, &ratings, ScreenOptions::default())
            .run(vec![loser("A", 10.0, -12.0)])
            .await;
        assert_eq!(
            report.outcome,
            ScreenOutcome::Exhausted {
                emptied_at: ScreenStage::PbFiltered
            }
        );
        assert!(ratings.asked().is_empty());
    }

    #[tokio::test]
    async fn rating_gate_can_exhaust_the_run() {
        let pb = Canned::new(&[("A", Some(15.0))]);
        let ratings = Canned::new(&[("A", Some(3.0))]);

        let report = Screener::new(&pb, &ratings, ScreenOptions::default())
            .run(vec![loser("A", 10.0, -12.0)])
            .await;
        assert_eq!(
            report.outcome,
            ScreenOutcome::Exhausted {
                emptied_at: ScreenStage::RatingFiltered
            }
        );
        assert_eq!(report.counts.after_price_to_book, 1);
    }
}
