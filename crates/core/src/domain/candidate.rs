use serde::{Deserialize, Serialize};

/// One row of the day's losers listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoserRow {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub pct_change: f64,
}

/// A loser row plus the metrics scraped for it later in the run.
///
/// `price_to_book` and `rating` start out absent and are filled in place by the enrichment
/// stages; a value that could not be scraped stays `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub pct_change: f64,
    pub price_to_book: Option<f64>,
    /// Analyst consensus, 1.0 (strong buy) to 5.0 (strong sell).
    pub rating: Option<f64>,
}

impl From<LoserRow> for Candidate {
    fn from(row: LoserRow) -> Self {
        Self {
            symbol: row.symbol,
            name: row.name,
            price: row.price,
            pct_change: row.pct_change,
            price_to_book: None,
            rating: None,
        }
    }
}
