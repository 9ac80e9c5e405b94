//! Name source: person names from every sheet of an xlsx workbook.
//!
//! Names live under a `Nume` header column. A sheet without that column is
//! skipped with a warning; only a workbook that yields no names at all is
//! an error.

use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};
use tracing::{info, warn};

use crate::declaratii::SearchQuery;
use crate::error::ScraperError;

const NAME_COLUMN: &str = "Nume";

/// Index of the name column in a header row, if present.
fn find_name_column(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(NAME_COLUMN))
}

/// Load cleaned queries from all sheets of the workbook at `path`.
pub fn load_queries(path: impl AsRef<Path>) -> Result<Vec<SearchQuery>, ScraperError> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| ScraperError::NameSource(format!("open {:?}: {}", path, e)))?;

    let mut queries = Vec::new();

    for (sheet_name, range) in workbook.worksheets() {
        info!("reading sheet: {}", sheet_name);
        let mut rows = range.rows();

        let Some(header_row) = rows.next() else {
            warn!("sheet {} is empty", sheet_name);
            continue;
        };
        let headers: Vec<String> = header_row.iter().map(|c| c.to_string()).collect();
        let Some(name_idx) = find_name_column(&headers) else {
            warn!("no '{}' column found in sheet {}", NAME_COLUMN, sheet_name);
            continue;
        };

        for row in rows {
            let Some(cell) = row.get(name_idx) else {
                continue;
            };
            let query = SearchQuery::new(cell.to_string());
            if !query.is_empty() {
                queries.push(query);
            }
        }
    }

    if queries.is_empty() {
        return Err(ScraperError::NameSource(format!(
            "no names found in {:?}",
            path
        )));
    }

    info!("found {} names across all sheets", queries.len());
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_column_lookup() {
        let headers = vec!["Nr".to_string(), "Nume".to_string(), "Judet".to_string()];
        assert_eq!(find_name_column(&headers), Some(1));
    }

    #[test]
    fn test_name_column_tolerates_spacing_and_case() {
        let headers = vec![" nume ".to_string()];
        assert_eq!(find_name_column(&headers), Some(0));
    }

    #[test]
    fn test_missing_name_column() {
        let headers = vec!["Nr".to_string(), "Judet".to_string()];
        assert_eq!(find_name_column(&headers), None);
    }

    #[test]
    fn test_missing_workbook_is_an_error() {
        let err = load_queries("/nonexistent/input.xlsx").unwrap_err();
        assert!(matches!(err, ScraperError::NameSource(_)));
    }
}
