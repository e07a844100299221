//! Extraction of the hourly reserve table from the grid operator's page.
//!
//! The page has no stable ids or classes, so rows are recognised by shape only:
//! every `<tr>...</tr>` span carrying at least [`MIN_CELLS`] `<td>` cells is a
//! data row, and the first twelve cells are, in order, the hour followed by the
//! eleven SR/SUP bid and price columns. Header rows use `<th>` and footer rows
//! are shorter, so both fall below the threshold.
//!
//! Rows are matched on the raw markup rather than a parsed DOM: the endpoint
//! may answer with bare row fragments, which HTML tree construction discards
//! outside a `<table>`.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use time::Date;
use vpp_client::domain::ReserveRecord;

use super::coerce::{parse_f64_or_zero, parse_i32_or_zero};

pub const MIN_CELLS: usize = 14;

static ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<tr[^>]*>(.*?)</tr>").expect("static regex"));
static CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<td[^>]*>(.*?)</td>").expect("static regex"));

/// Visible text of a cell's inner markup: tags dropped, entities decoded, trimmed.
fn cell_text(inner: &str) -> String {
    let fragment = Html::parse_fragment(inner);
    fragment.root_element().text().collect::<String>().trim().to_string()
}

fn row_cells(row: &str) -> Vec<String> {
    CELL.captures_iter(row)
        .filter_map(|c| c.get(1))
        .map(|m| cell_text(m.as_str()))
        .collect()
}

fn cells_to_record(cells: &[String], date: Date) -> ReserveRecord {
    let f = |i: usize| parse_f64_or_zero(&cells[i]);

    ReserveRecord {
        tran_date: date,
        tran_hour: parse_i32_or_zero(&cells[0]),
        sr_bid: f(1),
        sr_bid_qse: f(2),
        sr_bid_nontrade: f(3),
        sr_price: f(4),
        sr_perf_price_1: f(5),
        sr_perf_price_2: f(6),
        sr_perf_price_3: f(7),
        sup_bid: f(8),
        sup_bid_qse: f(9),
        sup_bid_nontrade: f(10),
        sup_price: f(11),
    }
}

/// Parse every qualifying row into a record stamped with `date`.
///
/// The date printed on the page, if any, is ignored. The hour cell is taken
/// as-is; no range check is applied.
pub fn parse_reserve_html(html: &str, date: Date) -> Vec<ReserveRecord> {
    ROW.captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| row_cells(m.as_str()))
        .filter(|cells| cells.len() >= MIN_CELLS)
        .map(|cells| cells_to_record(&cells, date))
        .collect()
}
