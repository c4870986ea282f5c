pub mod browser;
pub mod yahoo;

use anyhow::Result;

#[async_trait::async_trait]
pub trait PriceToBookSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// `Ok(None)` when the page reports no value; `Err` when the page could not be read.
    async fn price_to_book(&self, symbol: &str) -> Result<Option<f64>>;
}

#[async_trait::async_trait]
pub trait RatingSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn rating(&self, symbol: &str) -> Result<Option<f64>>;
}

/// Reads the first numeric token of a scraped cell.
///
/// Tolerates thousands separators, a leading `+`, a trailing `%` and surrounding parentheses, so
/// `"+1,234.50"`, `"-12.3%"` and `"10.00 -1.20 (-10.71%)"` all parse. `"N/A"` and `"--"` do not.
pub fn parse_num(s: &str) -> Option<f64> {
    s.split_whitespace().find_map(|tok| {
        let t = tok
            .trim_matches(|c: char| matches!(c, '(' | ')' | '%' | '+'))
            .replace(',', "");
        if t.is_empty() || !t.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        t.parse::<f64>().ok().filter(|v| v.is_finite())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_num_strips_decorations() {
        assert_eq!(parse_num("+1,234.50"), Some(1234.5));
        assert_eq!(parse_num("-12.3%"), Some(-12.3));
        assert_eq!(parse_num("(-4.9%)"), Some(-4.9));
        assert_eq!(parse_num("10.00 -1.20 (-10.71%)"), Some(10.0));
    }

    #[test]
    fn parse_num_rejects_placeholders() {
        assert_eq!(parse_num("N/A"), None);
        assert_eq!(parse_num("--"), None);
        assert_eq!(parse_num(""), None);
        assert_eq!(parse_num("NaN"), None);
    }
}
