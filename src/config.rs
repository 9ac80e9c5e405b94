use std::path::PathBuf;
use std::time::Duration;

pub const PORTAL_URL: &str = "https://declaratii.integritate.eu/";

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Portal entry address.
    pub base_url: String,
    /// Directory watched for completed downloads.
    pub download_dir: PathBuf,
    pub headless: bool,
    /// Extra diagnostics: verbose browser logging, screenshots as data URLs.
    pub debug: bool,
    /// Per-candidate wait when resolving a UI element.
    pub element_wait: Duration,
    /// Overall wait for the anti-bot challenge to clear.
    pub challenge_timeout: Duration,
    /// Per-file wait for a triggered download to land on disk.
    pub download_timeout: Duration,
    /// Fixed pause after a cleared search before reading the results table.
    pub results_settle: Duration,
    /// Best-effort JSON snapshot of collected records, written after each name.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: PORTAL_URL.to_string(),
            download_dir: PathBuf::from("./downloads"),
            headless: true,
            debug: false,
            element_wait: Duration::from_secs(20),
            challenge_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(30),
            results_settle: Duration::from_secs(5),
            snapshot_path: None,
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
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

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn with_challenge_timeout(mut self, timeout: Duration) -> Self {
        self.challenge_timeout = timeout;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }
}
