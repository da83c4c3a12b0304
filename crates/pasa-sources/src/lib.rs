use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use pasa_core::error::Result;
use pasa_core::paper::FetchedPaper;
use pasa_core::source::{PaperRepository, SearchService};

pub mod ar5iv;
mod arxiv;
mod local_db;
mod serper;
#[cfg(test)]
mod test_server;

pub use arxiv::{parse_abs_page, parse_title_search, ArxivClient, ARXIV_SOURCE};
pub use local_db::{LocalPaperDb, LOCAL_DB_SOURCE};
pub use serper::{extract_arxiv_ids, SerperClient};

/// Keyword search through Google (serper.dev) and title resolution through
/// arXiv's own search.
pub struct ScholarSearch {
    serper: SerperClient,
    arxiv: Arc<ArxivClient>,
}

impl ScholarSearch {
    pub fn new(serper: SerperClient, arxiv: Arc<ArxivClient>) -> Self {
        Self { serper, arxiv }
    }
}

#[async_trait]
impl SearchService for ScholarSearch {
    async fn search_by_keyword(
        &self,
        query: &str,
        end_date: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<String>> {
        self.serper.search_arxiv_ids(query, end_date, limit).await
    }

    async fn search_by_title(&self, title: &str) -> Result<Option<FetchedPaper>> {
        match self.arxiv.search_id_by_title(title).await? {
            Some(id) => self.arxiv.fetch_by_id(&id).await,
            None => Ok(None),
        }
    }
}
