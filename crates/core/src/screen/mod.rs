pub mod pipeline;

use crate::config::Settings;
use crate::domain::candidate::Candidate;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenOptions {
    /// Stage 1 keeps rows whose percent change is strictly below this.
    pub max_pct_change: f64,

    /// Stage 3 keeps rows whose rating is strictly below this (or absent).
    pub max_rating: f64,
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self {
            max_pct_change: -5.0,
            max_rating: 2.5,
        }
    }
}

impl ScreenOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_pct_change: settings.screen_max_pct_change,
            max_rating: settings.screen_max_rating,
        }
    }
}

/// Where the filter chain is. Each gate only ever narrows the set it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenStage {
    All,
    PctFiltered,
    PbFiltered,
    RatingFiltered,
    Done,
}

impl ScreenStage {
    pub fn next(self) -> Self {
        match self {
            ScreenStage::All => ScreenStage::PctFiltered,
            ScreenStage::PctFiltered => ScreenStage::PbFiltered,
            ScreenStage::PbFiltered => ScreenStage::RatingFiltered,
            ScreenStage::RatingFiltered | ScreenStage::Done => ScreenStage::Done,
        }
    }
}

impl fmt::Display for ScreenStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScreenStage::All => "all",
            ScreenStage::PctFiltered => "percent_change",
            ScreenStage::PbFiltered => "price_to_book",
            ScreenStage::RatingFiltered => "rating",
            ScreenStage::Done => "done",
        })
    }
}

pub fn filter_pct_change(rows: Vec<Candidate>, opts: &ScreenOptions) -> Vec<Candidate> {
    rows.into_iter()
        .filter(|c| c.pct_change < opts.max_pct_change)
        .collect()
}

/// Keeps rows whose price-to-book exceeds the intraday price; an absent ratio never passes.
pub fn filter_price_to_book(rows: Vec<Candidate>) -> Vec<Candidate> {
    rows.into_iter()
        .filter(|c| c.price_to_book.is_some_and(|pb| pb > c.price))
        .collect()
}

/// Keeps unrated rows and rows rated below the threshold, best rating first, unrated last.
pub fn filter_rating(rows: Vec<Candidate>, opts: &ScreenOptions) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = rows
        .into_iter()
        .filter(|c| c.rating.map_or(true, |r| r < opts.max_rating))
        .collect();
    sort_by_rating(&mut out);
    out
}

/// Stable: equal ratings keep their listing order.
pub fn sort_by_rating(rows: &mut [Candidate]) {
    rows.sort_by(|a, b| match (a.rating, b.rating) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
