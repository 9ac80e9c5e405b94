//! Integrity-declaration retriever
//!
//! Drives a browser session against declaratii.integritate.eu: searches a
//! list of person names, walks the paginated results, downloads attached
//! declaration documents, and collects one record per results row.
//!
//! # Usage
//!
//! ```rust,ignore
//! use declaratii_scraper::{RunRequest, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!
//!     let request = RunRequest::new("names.xlsx")
//!         .with_download_dir("./downloads")
//!         .with_headless(true);
//!
//!     let report = service.call(request).await.unwrap();
//!     println!("records: {}, export: {:?}", report.records.len(), report.export_path);
//! }
//! ```

pub mod browser;
pub mod config;
pub mod declaratii;
pub mod delay;
pub mod error;
pub mod export;
pub mod names;
pub mod service;
pub mod traits;

// Re-export the main types
pub use config::ScraperConfig;
pub use declaratii::{
    AggregateRecord, DeclaratiiScraper, DownloadOutcome, DownloadStatus, ResultRow, SearchQuery,
};
pub use error::ScraperError;
pub use service::{RunReport, RunRequest, ScraperService};
pub use traits::Scraper;
