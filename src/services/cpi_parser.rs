// src/services/cpi_parser.rs
use log::{debug, info, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::CpiPeriod;
use crate::services::cpi_store::CpiStore;
use crate::services::retry::RetryPolicy;

pub const DEFAULT_CPI_SOURCE_URL: &str =
    "https://www.rateinflation.com/consumer-price-index/germany-historical-cpi/";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const MONTHS: [(&str, u32); 12] = [
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl FetchError {
    /// Network failures and bad statuses are worth another attempt; a client
    /// that could not even be built is not.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => !e.is_builder(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// `parsed` values were written; `total` is the store size afterwards.
    Updated { parsed: usize, total: usize },
    /// The document had no table; the store was left untouched.
    TableMissing,
}

/// One value read from the CPI table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpiRecord {
    pub period: CpiPeriod,
    pub value: Decimal,
}

/// Month number for a header cell such as `Jan` or `OCT`.
pub fn month_number(header: &str) -> Option<u32> {
    let header = header.trim().to_lowercase();
    MONTHS
        .iter()
        .find(|(abbr, _)| *abbr == header)
        .map(|(_, month)| *month)
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn parse_year(text: &str) -> Option<i32> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_value(text: &str) -> Option<Decimal> {
    Decimal::from_str(&text.replace(',', ".")).ok()
}

/// Extracts all monthly values from the first table of `html`.
///
/// Returns `None` when the document has no table at all.
pub fn parse_cpi_table(html: &str) -> Option<Vec<CpiRecord>> {
    let table_sel = Selector::parse("table").ok()?;
    let head_sel = Selector::parse("thead th").ok()?;
    let row_sel = Selector::parse("tr").ok()?;
    let th_sel = Selector::parse("th").ok()?;
    let td_sel = Selector::parse("td").ok()?;

    let document = Html::parse_document(html);
    let table = document.select(&table_sel).next()?;

    let mut headers: Vec<String> = table
        .select(&head_sel)
        .map(|th| cell_text(th).to_lowercase())
        .collect();
    if headers.is_empty() {
        if let Some(first_row) = table.select(&row_sel).next() {
            headers = first_row
                .select(&th_sel)
                .map(|th| cell_text(th).to_lowercase())
                .collect();
        }
    }

    let mut records = Vec::new();

    for row in table.select(&row_sel) {
        let cells: Vec<String> = row.select(&td_sel).map(cell_text).collect();
        let Some(first) = cells.first() else {
            continue;
        };

        let Some(year) = parse_year(first) else {
            debug!("Skipping CPI row with non-numeric year: {:?}", first);
            continue;
        };

        for (i, value) in cells.iter().enumerate().skip(1) {
            // Malformed rows can carry more cells than there are headers.
            if i >= headers.len() {
                break;
            }
            let Some(month) = month_number(&headers[i]) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            match parse_value(value) {
                Some(value) => records.push(CpiRecord {
                    period: CpiPeriod::new(year, month),
                    value,
                }),
                None => debug!("Skipping unparseable CPI cell {:?} for {}-{:02}", value, year, month),
            }
        }
    }

    Some(records)
}

/// Parses `html` and upserts every value found into `store`.
pub fn parse_into_store(html: &[u8], store: &CpiStore) -> RefreshOutcome {
    let html = String::from_utf8_lossy(html);

    let Some(records) = parse_cpi_table(&html) else {
        warn!("CPI table not found, CPI data not updated");
        return RefreshOutcome::TableMissing;
    };

    for record in &records {
        store.upsert(record.period, record.value);
    }

    let total = store.len();
    info!("CPI parser finished, total records in store: {}", total);

    RefreshOutcome::Updated {
        parsed: records.len(),
        total,
    }
}

/// Fetches the historical CPI page and keeps `CpiStore` up to date.
pub struct CpiParser {
    url: String,
    client: Client,
    retry: RetryPolicy,
    store: Arc<CpiStore>,
}

impl CpiParser {
    pub fn new(url: impl Into<String>, store: Arc<CpiStore>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(CpiParser {
            url: url.into(),
            client,
            retry: RetryPolicy::default(),
            store,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn store(&self) -> &Arc<CpiStore> {
        &self.store
    }

    async fn fetch_once(&self) -> Result<Vec<u8>, FetchError> {
        let bytes = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    /// Downloads the page, retrying transient failures per the retry policy.
    pub async fn fetch_page(&self) -> Result<Vec<u8>, FetchError> {
        info!("Fetching CPI table from URL: {}", self.url);
        self.retry
            .run(|| self.fetch_once(), FetchError::is_transient)
            .await
    }

    /// Fetches the page and merges its values into the store.
    pub async fn refresh(&self) -> Result<RefreshOutcome, FetchError> {
        let html = self.fetch_page().await?;
        Ok(parse_into_store(&html, &self.store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FULL_TABLE: &str = r#"
    <html>
        <table>
            <thead>
                <tr>
                    <th>Year</th><th>Jan</th><th>Feb</th><th>Mar</th><th>Apr</th>
                    <th>May</th><th>Jun</th><th>Jul</th><th>Aug</th><th>Sep</th>
                    <th>Oct</th><th>Nov</th><th>Dec</th>
                </tr>
            </thead>
            <tbody>
                <tr>
                    <td>2023</td><td>115.0</td><td>115.5</td><td>116.0</td><td>116.5</td>
                    <td>117.0</td><td>117.5</td><td>118.0</td><td>118.5</td><td>119.0</td>
                    <td>118.5</td><td>119.5</td><td>120.0</td>
                </tr>
                <tr>
                    <td>2024</td><td>120.5</td><td>121.0</td><td>121.5</td><td>122.0</td>
                    <td>122.5</td><td>122.0</td><td></td><td></td><td></td>
                    <td></td><td></td><td></td>
                </tr>
            </tbody>
        </table>
    </html>
    "#;

    fn table(header: &str, rows: &str) -> String {
        format!(
            "<html><table><thead><tr>{}</tr></thead><tbody>{}</tbody></table></html>",
            header, rows
        )
    }

    #[test]
    fn month_table_covers_all_abbreviations() {
        let expected = [
            "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
        ];
        for (i, abbr) in expected.iter().enumerate() {
            assert_eq!(month_number(abbr), Some(i as u32 + 1));
        }
        assert_eq!(month_number("OCT"), Some(10));
        assert_eq!(month_number("Year"), None);
        assert_eq!(month_number("Annual"), None);
    }

    #[test]
    fn parses_full_table() {
        let store = CpiStore::new();

        let outcome = parse_into_store(FULL_TABLE.as_bytes(), &store);

        assert_eq!(outcome, RefreshOutcome::Updated { parsed: 18, total: 18 });
        assert_eq!(store.get(CpiPeriod::new(2023, 1)), Some(dec!(115.0)));
        assert_eq!(store.get(CpiPeriod::new(2023, 10)), Some(dec!(118.5)));
        assert_eq!(store.get(CpiPeriod::new(2024, 6)), Some(dec!(122.0)));
        assert_eq!(store.get(CpiPeriod::new(2024, 7)), None);
    }

    #[test]
    fn missing_table_leaves_store_untouched() {
        let store = CpiStore::new();
        store.upsert(CpiPeriod::new(2023, 10), dec!(118.5));

        let outcome = parse_into_store(b"<html><body><p>No table here</p></body></html>", &store);

        assert_eq!(outcome, RefreshOutcome::TableMissing);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(CpiPeriod::new(2023, 10)), Some(dec!(118.5)));
    }

    #[test]
    fn empty_cells_create_no_entry() {
        let html = table(
            "<th>Year</th><th>Jan</th><th>Feb</th>",
            "<tr><td>2024</td><td>120.5</td><td></td></tr>",
        );

        let records = parse_cpi_table(&html).unwrap();

        assert_eq!(
            records,
            vec![CpiRecord {
                period: CpiPeriod::new(2024, 1),
                value: dec!(120.5),
            }]
        );
    }

    #[test]
    fn rows_with_non_numeric_year_are_skipped() {
        let html = table(
            "<th>Year</th><th>Jan</th>",
            "<tr><td>invalid</td><td>120.5</td></tr>\
             <tr><td>2024</td><td>121.0</td></tr>\
             <tr><td>Source: Destatis</td></tr>",
        );

        let records = parse_cpi_table(&html).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].period, CpiPeriod::new(2024, 1));
        assert_eq!(records[0].value, dec!(121.0));
    }

    #[test]
    fn comma_decimal_separator_is_normalized() {
        let comma = table("<th>Year</th><th>Jan</th>", "<tr><td>2024</td><td>120,5</td></tr>");
        let dot = table("<th>Year</th><th>Jan</th>", "<tr><td>2024</td><td>120.5</td></tr>");

        assert_eq!(parse_cpi_table(&comma), parse_cpi_table(&dot));
        assert_eq!(parse_cpi_table(&comma).unwrap()[0].value, dec!(120.5));
    }

    #[test]
    fn reparse_overwrites_existing_period() {
        let store = CpiStore::new();
        store.upsert(CpiPeriod::new(2023, 1), dec!(100.0));

        let html = table("<th>Year</th><th>Jan</th>", "<tr><td>2023</td><td>115.0</td></tr>");
        parse_into_store(html.as_bytes(), &store);

        assert_eq!(store.get(CpiPeriod::new(2023, 1)), Some(dec!(115.0)));
    }

    #[test]
    fn cells_beyond_header_count_are_ignored() {
        let html = table(
            "<th>Year</th><th>Jan</th>",
            "<tr><td>2024</td><td>120.5</td><td>121.0</td><td>999</td></tr>",
        );

        let records = parse_cpi_table(&html).unwrap();

        assert_eq!(records.len(), 1);
    }

    #[test]
    fn short_rows_only_fill_present_months() {
        let html = table(
            "<th>Year</th><th>Jan</th><th>Feb</th><th>Mar</th>",
            "<tr><td>2024</td><td>120.5</td></tr>",
        );

        let records = parse_cpi_table(&html).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].period, CpiPeriod::new(2024, 1));
    }

    #[test]
    fn unknown_columns_and_garbage_cells_are_skipped() {
        let html = table(
            "<th>Year</th><th>Jan</th><th>Annual</th><th>Feb</th>",
            "<tr><td>2024</td><td>n/a</td><td>121.3</td><td>121.0</td></tr>",
        );

        let records = parse_cpi_table(&html).unwrap();

        assert_eq!(
            records,
            vec![CpiRecord {
                period: CpiPeriod::new(2024, 2),
                value: dec!(121.0),
            }]
        );
    }

    #[test]
    fn header_row_without_thead_is_detected() {
        let html = "<table>\
            <tr><th>Year</th><th>Oct</th></tr>\
            <tr><td>2023</td><td>118.5</td></tr>\
        </table>";

        let records = parse_cpi_table(html).unwrap();

        assert_eq!(records[0].period, CpiPeriod::new(2023, 10));
    }

    #[test]
    fn builder_errors_are_permanent() {
        let err = Client::builder()
            .build()
            .and_then(|client| client.get("not a url").build())
            .unwrap_err();

        assert!(!FetchError::from(err).is_transient());
    }
}
