use async_trait::async_trait;

use crate::declaratii::{AggregateRecord, SearchQuery};
use crate::error::ScraperError;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Launch the browser and prepare the session.
    async fn initialize(&mut self) -> Result<(), ScraperError>;

    /// Process every query and return the collected records.
    async fn run(
        &mut self,
        queries: &[SearchQuery],
    ) -> Result<Vec<AggregateRecord>, ScraperError>;

    /// Release browser resources.
    async fn close(&mut self) -> Result<(), ScraperError>;

    /// Full lifecycle: initialize → run → close.
    async fn execute(
        &mut self,
        queries: &[SearchQuery],
    ) -> Result<Vec<AggregateRecord>, ScraperError> {
        self.initialize().await?;
        let records = self.run(queries).await?;
        self.close().await?;
        Ok(records)
    }
}
