//! Retrieval workflow for the public integrity-declaration portal.

mod download;
mod extract;
mod pagination;
mod scraper;
mod types;

pub use download::{build_filename, resolve_collision, DownloadCoordinator};
pub use extract::{extract_current_page, parse_results};
pub use pagination::{advance_with, NextControl, Paginator};
pub use scraper::DeclaratiiScraper;
pub use types::{
    AggregateRecord, DownloadOutcome, DownloadStatus, ResultRow, SearchQuery,
};
