use tower::Service;
use tracing::{error, info};

use declaratii_scraper::{RunRequest, ScraperService};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    let filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,declaratii_scraper=info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter.as_str()).init();

    let request = RunRequest::new(env_or("INPUT_FILE", "names.xlsx"))
        .with_download_dir(env_or("DOWNLOAD_DIR", "./downloads"))
        .with_output_file(env_or("OUTPUT_FILE", "./all_declarations_data.csv"))
        .with_snapshot_path(env_or("SNAPSHOT_FILE", "./aggregate_snapshot.json"))
        .with_headless(env_or("HEADLESS", "true") != "false")
        .with_debug(env_or("DEBUG", "false") == "true");

    info!("starting declaration retrieval run");

    let mut service = ScraperService::new();
    match service.call(request).await {
        Ok(report) => {
            info!(
                "done: {} records collected, export written to {:?}",
                report.records.len(),
                report.export_path
            );
        }
        Err(e) => {
            error!("run failed: {}", e);
            std::process::exit(1);
        }
    }
}
