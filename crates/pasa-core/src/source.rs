use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::paper::{FetchedPaper, Sections};

/// External search over the scholarly web.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Raw identifiers of papers matching `query`, restricted to papers
    /// published before `end_date` when one is given.
    async fn search_by_keyword(
        &self,
        query: &str,
        end_date: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<String>>;

    /// Resolves a citation string to a canonical paper.
    async fn search_by_title(&self, title: &str) -> Result<Option<FetchedPaper>>;
}

/// Store of paper metadata and full-text skeletons keyed by external id.
#[async_trait]
pub trait PaperRepository: Send + Sync {
    async fn fetch_by_id(&self, external_id: &str) -> Result<Option<FetchedPaper>>;

    /// Section name -> citation strings for the paper's full text.
    async fn fetch_sections(&self, external_id: &str) -> Result<Option<Sections>>;
}
