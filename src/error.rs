use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("browser init error: {0}")]
    BrowserInit(String),

    #[error("navigation error: {0}")]
    Navigation(String),

    #[error("javascript error: {0}")]
    JavaScript(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("anti-bot challenge did not clear within {0:?}")]
    ChallengeTimeout(std::time::Duration),

    #[error("results table not found")]
    NoTable,

    #[error("search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("download did not complete within {0:?}")]
    DownloadTimeout(std::time::Duration),

    #[error("no free filename for {0} after {1} suffix attempts")]
    RenameCollisionUnresolved(String, u32),

    #[error("name source error: {0}")]
    NameSource(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("file error: {0}")]
    FileIO(#[from] std::io::Error),
}
