//! Terminal rendering of results

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use equityx_client::{ReportData, SearchCandidate, SearchHistoryEntry};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn candidates_table(candidates: &[SearchCandidate]) -> Table {
    let mut table = table(vec!["#", "Symbol", "Name", "Exchange", "Type", "Sector"]);
    for (i, candidate) in candidates.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            candidate.symbol.clone(),
            candidate.display_name().to_string(),
            candidate.exchange.clone(),
            candidate.quote_type.clone().unwrap_or_default(),
            candidate.sector.clone().unwrap_or_default(),
        ]);
    }
    table
}

pub fn history_table(entries: &[SearchHistoryEntry]) -> Table {
    let mut table = table(vec!["#", "Stock", "Ticker", "Looked up"]);
    for (i, entry) in entries.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            entry.stock_name.clone(),
            entry.ticker.clone(),
            entry.date.format("%Y-%m-%d %H:%M UTC").to_string(),
        ]);
    }
    table
}

pub fn print_candidates(candidates: &[SearchCandidate]) {
    if candidates.is_empty() {
        println!("No matching symbols.");
    } else {
        println!("{}", candidates_table(candidates));
    }
}

pub fn print_history(entries: &[SearchHistoryEntry]) {
    if entries.is_empty() {
        println!("No recent searches.");
    } else {
        println!("{}", history_table(entries));
    }
}

pub fn print_report(data: &ReportData, with_summary: bool) {
    if with_summary {
        println!("{}\n", data.summary);
    }
    println!("Report: {}", data.report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_candidates_table_uses_display_name() {
        let candidates = vec![SearchCandidate {
            exchange: "NMS".to_string(),
            symbol: "AAPL".to_string(),
            short_name: Some("Apple".to_string()),
            long_name: None,
            sector: Some("Technology".to_string()),
            quote_type: Some("EQUITY".to_string()),
        }];

        let rendered = candidates_table(&candidates).to_string();
        assert!(rendered.contains("AAPL"));
        assert!(rendered.contains("Apple"));
        assert!(rendered.contains("Technology"));
    }

    #[test]
    fn test_history_table_rows() {
        let entries = vec![SearchHistoryEntry {
            stock_name: "Apple Inc".to_string(),
            ticker: "AAPL".to_string(),
            date: Utc.with_ymd_and_hms(2025, 10, 16, 9, 30, 0).unwrap(),
        }];

        let rendered = history_table(&entries).to_string();
        assert!(rendered.contains("Apple Inc"));
        assert!(rendered.contains("2025-10-16 09:30 UTC"));
    }
}
