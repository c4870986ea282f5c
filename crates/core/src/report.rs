use crate::domain::candidate::Candidate;
use crate::notify::news::Headline;
use chrono::NaiveDate;
use std::fmt::Write;

const NAME_WIDTH: usize = 32;
const ABSENT: &str = "-";

/// Fixed-width table of the final candidates, one row per line.
pub fn render_table(rows: &[Candidate]) -> String {
    let symbol_width = rows
        .iter()
        .map(|c| c.symbol.len())
        .max()
        .unwrap_or(0)
        .max("Symbol".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<sw$}  {:<nw$}  {:>10}  {:>9}  {:>7}  {:>6}",
        "Symbol",
        "Name",
        "Price",
        "% Change",
        "P/B",
        "Rating",
        sw = symbol_width,
        nw = NAME_WIDTH,
    );
    for c in rows {
        let _ = writeln!(
            out,
            "{:<sw$}  {:<nw$}  {:>10.2}  {:>9.2}  {:>7}  {:>6}",
            c.symbol,
            truncate(&c.name, NAME_WIDTH),
            c.price,
            c.pct_change,
            fmt_opt(c.price_to_book),
            fmt_opt(c.rating),
            sw = symbol_width,
            nw = NAME_WIDTH,
        );
    }
    out
}

/// `None` means the lookup failed, which reads differently from a search with no hits.
pub fn render_headlines(company_name: &str, headlines: Option<&[Headline]>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "News for {company_name}:");
    let Some(headlines) = headlines else {
        let _ = writeln!(out, "  (news unavailable)");
        return out;
    };
    if headlines.is_empty() {
        let _ = writeln!(out, "  (no headlines found)");
    }
    for (i, h) in headlines.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, h.title);
        if !h.summary.is_empty() {
            let _ = writeln!(out, "     {}", h.summary);
        }
    }
    out
}

pub fn email_subject(date: NaiveDate) -> String {
    format!("Bottom fishing picks for {date}")
}

pub fn email_body(rows: &[Candidate], news: Option<(&str, Option<&[Headline]>)>) -> String {
    let mut out = render_table(rows);
    if let Some((company_name, headlines)) = news {
        out.push('\n');
        out.push_str(&render_headlines(company_name, headlines));
    }
    out
}

pub fn sms_body(rows: &[Candidate]) -> String {
    let symbols: Vec<&str> = rows.iter().map(|c| c.symbol.as_str()).collect();
    format!("Bottom fishing picks: {}", symbols.join(", "))
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_else(|| ABSENT.to_string())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(symbol: &str, name: &str, pb: Option<f64>, rating: Option<f64>) -> Candidate {
        Candidate {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price: 10.0,
            pct_change: -12.0,
            price_to_book: pb,
            rating,
        }
    }

    #[test]
    fn table_shows_absent_values_as_dash() {
        let rows = vec![
            candidate("ABCD", "Abcd Holdings Inc.", Some(15.0), Some(1.8)),
            candidate("XY", "Xy Corp", Some(12.5), None),
        ];
        let table = render_table(&rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Symbol"));
        assert!(lines[1].starts_with("ABCD"));
        assert!(lines[1].ends_with("15.00    1.80"));
        assert!(lines[2].trim_end().ends_with("12.50       -"));
    }

    #[test]
    fn long_names_are_truncated() {
        let name = "A Company With An Exceptionally Long Registered Name";
        let table = render_table(&[candidate("L", name, None, None)]);
        assert!(!table.contains(name));
        assert!(table.contains('…'));
    }

    #[test]
    fn sms_lists_symbols_in_order() {
        let rows = vec![
            candidate("B", "B", None, Some(1.0)),
            candidate("A", "A", None, None),
        ];
        assert_eq!(sms_body(&rows), "Bottom fishing picks: B, A");
    }

    #[test]
    fn email_body_appends_headlines() {
        let rows = vec![candidate("ABCD", "Abcd Holdings Inc.", Some(15.0), Some(1.8))];
        let headlines = vec![Headline {
            title: "Abcd falls".to_string(),
            summary: "Down 10%.".to_string(),
        }];

        let body = email_body(&rows, Some(("Abcd Holdings Inc.", Some(&headlines[..]))));
        assert!(body.contains("News for Abcd Holdings Inc.:"));
        assert!(body.contains("1. Abcd falls"));
        assert!(body.contains("Down 10%."));

        let bare = email_body(&rows, None);
        assert!(!bare.contains("News for"));
    }

    #[test]
    fn failed_news_lookup_differs_from_no_hits() {
        let empty = render_headlines("Abcd Holdings Inc.", Some(&[][..]));
        assert!(empty.contains("(no headlines found)"));
        assert!(!empty.contains("unavailable"));

        let failed = render_headlines("Abcd Holdings Inc.", None);
        assert!(failed.contains("News for Abcd Holdings Inc.:"));
        assert!(failed.contains("(news unavailable)"));
        assert!(!failed.contains("no headlines found"));

        let rows = vec![candidate("ABCD", "Abcd Holdings Inc.", Some(15.0), Some(1.8))];
        let body = email_body(&rows, Some(("Abcd Holdings Inc.", None)));
        assert!(body.contains("(news unavailable)"));
    }
}
