use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::config::ScraperConfig;
use crate::declaratii::{AggregateRecord, DeclaratiiScraper};
use crate::error::ScraperError;
use crate::export;
use crate::names;
use crate::traits::Scraper;

/// One full retrieval run: input workbook in, exported aggregate out.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input_file: PathBuf,
    pub download_dir: PathBuf,
    pub output_file: PathBuf,
    pub snapshot_path: Option<PathBuf>,
    pub headless: bool,
    pub debug: bool,
}

impl RunRequest {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            download_dir: PathBuf::from("./downloads"),
            output_file: PathBuf::from("./all_declarations_data.csv"),
            snapshot_path: None,
            headless: true,
            debug: false,
        }
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = path.into();
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl From<&RunRequest> for ScraperConfig {
    fn from(req: &RunRequest) -> Self {
        let mut config = ScraperConfig::new()
            .with_download_dir(&req.download_dir)
            .with_headless(req.headless)
            .with_debug(req.debug);
        if let Some(path) = &req.snapshot_path {
            config = config.with_snapshot_path(path);
        }
        config
    }
}

/// Result of one run.
#[derive(Debug)]
pub struct RunReport {
    pub records: Vec<AggregateRecord>,
    pub export_path: PathBuf,
}

/// tower::Service wrapper around the retrieval workflow.
#[derive(Debug, Clone, Default)]
pub struct ScraperService {
    // Future extension point (rate limits, shared sessions).
}

impl ScraperService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<RunRequest> for ScraperService {
    type Response = RunReport;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: RunRequest) -> Self::Future {
        info!("run request received: input={:?}", req.input_file);

        Box::pin(async move {
            let queries = names::load_queries(&req.input_file)?;
            let config: ScraperConfig = (&req).into();

            let mut scraper = DeclaratiiScraper::new(config);
            let records = scraper.execute(&queries).await?;

            let export_path = export::export_records(&records, &req.output_file)?;

            info!(
                "run complete: {} records, export at {:?}",
                records.len(),
                export_path
            );

            Ok(RunReport {
                records,
                export_path,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_builder() {
        let req = RunRequest::new("names.xlsx")
            .with_download_dir("/tmp/dl")
            .with_output_file("/tmp/out.csv")
            .with_snapshot_path("/tmp/snapshot.json")
            .with_headless(false)
            .with_debug(true);

        assert_eq!(req.input_file, PathBuf::from("names.xlsx"));
        assert_eq!(req.download_dir, PathBuf::from("/tmp/dl"));
        assert_eq!(req.output_file, PathBuf::from("/tmp/out.csv"));
        assert_eq!(req.snapshot_path, Some(PathBuf::from("/tmp/snapshot.json")));
        assert!(!req.headless);
        assert!(req.debug);
    }

    #[test]
    fn test_run_request_to_config() {
        let req = RunRequest::new("names.xlsx")
            .with_download_dir("/tmp/dl")
            .with_headless(false);
        let config: ScraperConfig = (&req).into();

        assert_eq!(config.download_dir, PathBuf::from("/tmp/dl"));
        assert!(!config.headless);
        assert!(config.snapshot_path.is_none());
    }
}
