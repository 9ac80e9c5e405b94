//! Results-table extraction.
//!
//! The portal renders an Angular Material table (`mat-row` / `mat-cell`
//! elements). The rendered markup is pulled out of the page once and parsed
//! off-browser; each row carries 8 positional cells, the last of which holds
//! the download control when a document is attached.

use std::time::Duration;

use chromiumoxide::Page;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::browser::{locate, Locator};
use crate::error::ScraperError;

use super::types::ResultRow;

const CELLS_PER_ROW: usize = 8;

/// Candidates for the results table itself.
fn table_candidates() -> Vec<Locator> {
    vec![
        Locator::css("table.mat-mdc-table"),
        Locator::css("mat-table"),
    ]
}

/// Wait for the results table, then parse the current render into rows.
///
/// An absent table signals `NoTable`; a present table with zero parseable
/// rows is a valid empty result (no declarations for this query).
pub async fn extract_current_page(
    page: &Page,
    table_wait: Duration,
) -> Result<Vec<ResultRow>, ScraperError> {
    locate(page, &table_candidates(), table_wait)
        .await
        .map_err(|_| ScraperError::NoTable)?;

    let markup = page
        .content()
        .await
        .map_err(|e| ScraperError::JavaScript(format!("page markup: {}", e)))?;

    Ok(parse_results(&markup))
}

/// Parse rendered page markup into result rows. Cell text is trimmed;
/// everything else is kept exactly as displayed.
pub fn parse_results(markup: &str) -> Vec<ResultRow> {
    let row_selector = Selector::parse("mat-row").unwrap();
    let cell_selector = Selector::parse("mat-cell").unwrap();
    let button_selector = Selector::parse("button").unwrap();

    let document = Html::parse_document(markup);
    let mut rows = Vec::new();

    for row in document.select(&row_selector) {
        let cells: Vec<_> = row.select(&cell_selector).collect();
        if cells.len() < CELLS_PER_ROW {
            warn!(
                "skipping row with {} of {} expected cells",
                cells.len(),
                CELLS_PER_ROW
            );
            continue;
        }

        let text = |idx: usize| -> String { cells[idx].text().collect::<String>().trim().to_string() };

        rows.push(ResultRow {
            subject_name: text(0),
            institution: text(1),
            position: text(2),
            city: text(3),
            county: text(4),
            declaration_date: text(5),
            declaration_type: text(6),
            has_download: cells[7].select(&button_selector).next().is_some(),
        });
    }

    debug!("extracted {} rows from current page", rows.len());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_markup(name: &str, with_button: bool) -> String {
        let last_cell = if with_button {
            "<mat-cell><button class=\"mdc-button\">PDF</button></mat-cell>"
        } else {
            "<mat-cell></mat-cell>"
        };
        format!(
            "<mat-row>\
             <mat-cell>  {name}  </mat-cell>\
             <mat-cell>Primaria Cluj</mat-cell>\
             <mat-cell>Consilier</mat-cell>\
             <mat-cell>Cluj-Napoca</mat-cell>\
             <mat-cell>Cluj</mat-cell>\
             <mat-cell>01.02.2023</mat-cell>\
             <mat-cell>Avere</mat-cell>\
             {last_cell}\
             </mat-row>"
        )
    }

    fn page_markup(rows: &[String]) -> String {
        format!(
            "<html><body><table class=\"mat-mdc-table\">{}</table></body></html>",
            rows.join("")
        )
    }

    #[test]
    fn test_parse_full_row() {
        let markup = page_markup(&[row_markup("Popescu Ion", true)]);
        let rows = parse_results(&markup);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.subject_name, "Popescu Ion");
        assert_eq!(row.institution, "Primaria Cluj");
        assert_eq!(row.position, "Consilier");
        assert_eq!(row.city, "Cluj-Napoca");
        assert_eq!(row.county, "Cluj");
        assert_eq!(row.declaration_date, "01.02.2023");
        assert_eq!(row.declaration_type, "Avere");
        assert!(row.has_download);
    }

    #[test]
    fn test_eighth_cell_without_control_means_no_download() {
        let markup = page_markup(&[row_markup("Popescu Ion", false)]);
        let rows = parse_results(&markup);
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].has_download);
    }

    #[test]
    fn test_zero_rows_is_a_valid_empty_result() {
        let markup = page_markup(&[]);
        assert!(parse_results(&markup).is_empty());
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let short = "<mat-row><mat-cell>lonely</mat-cell></mat-row>".to_string();
        let markup = page_markup(&[short, row_markup("Ionescu Maria", true)]);
        let rows = parse_results(&markup);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject_name, "Ionescu Maria");
    }

    #[test]
    fn test_row_order_is_preserved() {
        let markup = page_markup(&[
            row_markup("Primul Nume", true),
            row_markup("Al Doilea Nume", false),
        ]);
        let rows = parse_results(&markup);
        assert_eq!(rows[0].subject_name, "Primul Nume");
        assert_eq!(rows[1].subject_name, "Al Doilea Nume");
    }
}
