use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use pasa_core::error::{PasaError, Result};
use pasa_core::paper::{normalize_title, strip_version, FetchedPaper, Sections};
use pasa_core::source::PaperRepository;

use crate::ar5iv::{self, AR5IV_HTML_URL};
use crate::local_db::LocalPaperDb;

pub const ARXIV_SOURCE: &str = "arxiv";

const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";
const ARXIV_SEARCH_URL: &str = "https://arxiv.org/search/";

/// `<title>[2307.00235] Some Title</title>` on single-result redirects.
static SINGLE_RESULT_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\[(.*?)\]\s*(.*)$").expect("single result regex"));

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// arXiv metadata, ar5iv full text and arXiv title search, with an optional
/// local paper database consulted first.
pub struct ArxivClient {
    client: Client,
    local: Option<LocalPaperDb>,
    abs_url: String,
    search_url: String,
    ar5iv_url: String,
}

impl ArxivClient {
    pub fn new(local: Option<LocalPaperDb>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("pasa/0.1")
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            local,
            abs_url: ARXIV_ABS_URL.to_string(),
            search_url: ARXIV_SEARCH_URL.to_string(),
            ar5iv_url: AR5IV_HTML_URL.to_string(),
        })
    }

    pub fn with_abs_url(mut self, url: impl Into<String>) -> Self {
        self.abs_url = url.into();
        self
    }

    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    pub fn with_ar5iv_url(mut self, url: impl Into<String>) -> Self {
        self.ar5iv_url = url.into();
        self
    }

    async fn get_html(&self, url: &str) -> Result<String> {
        debug!(url, "Fetching arXiv page");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PasaError::from_source(ARXIV_SOURCE, format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PasaError::from_source(
                ARXIV_SOURCE,
                format!("{url} returned HTTP {}", response.status()),
            ));
        }
        Ok(response.text().await?)
    }

    async fn fetch_remote(&self, external_id: &str) -> Result<Option<FetchedPaper>> {
        let html = self.get_html(&format!("{}/{external_id}", self.abs_url)).await?;
        Ok(parse_abs_page(&html, external_id))
    }

    /// Finds the arXiv id whose title matches `title` exactly (ignoring case,
    /// punctuation and spacing).
    pub async fn search_id_by_title(&self, title: &str) -> Result<Option<String>> {
        let url = Url::parse_with_params(
            &self.search_url,
            &[
                ("query", title),
                ("searchtype", "title"),
                ("abstracts", "hide"),
                ("size", "200"),
            ],
        )
        .map_err(|e| PasaError::from_source(ARXIV_SOURCE, format!("bad search url: {e}")))?;

        let html = self.get_html(url.as_str()).await?;
        let found = parse_title_search(&html, title);
        if found.is_none() {
            debug!(title, "No exact title match on arXiv");
        }
        Ok(found)
    }
}

#[async_trait]
impl PaperRepository for ArxivClient {
    async fn fetch_by_id(&self, external_id: &str) -> Result<Option<FetchedPaper>> {
        if let Some(local) = &self.local {
            if let Some(paper) = local.get(external_id).await {
                return Ok(Some(paper));
            }
        }
        self.fetch_remote(external_id).await
    }

    async fn fetch_sections(&self, external_id: &str) -> Result<Option<Sections>> {
        if let Some(local) = &self.local {
            if let Some(sections) = local.get(external_id).await.and_then(|p| p.sections) {
                return Ok(Some(sections));
            }
        }

        let html = self
            .get_html(&format!("{}/{external_id}", self.ar5iv_url))
            .await?;
        let sections = ar5iv::parse_sections(&html)?;
        match &sections {
            Some(s) => info!(external_id, sections = s.len(), "Fetched full-text skeleton"),
            None => warn!(external_id, "ar5iv page had no usable sections"),
        }
        Ok(sections)
    }
}

/// Title and abstract from the `citation_*` meta tags of an abstract page.
pub fn parse_abs_page(html: &str, external_id: &str) -> Option<FetchedPaper> {
    let document = Html::parse_document(html);
    let meta = |name: &str| {
        let sel = selector(&format!("meta[name=\"{name}\"]"))?;
        document
            .select(&sel)
            .next()
            .and_then(|m| m.value().attr("content"))
            .map(collapse)
    };

    if let Some(listed) = meta("citation_arxiv_id") {
        if strip_version(&listed) != external_id {
            warn!(external_id, listed = %listed, "Abstract page is for a different paper");
            return None;
        }
    }

    let title = meta("citation_title").filter(|t| !t.is_empty())?;
    Some(FetchedPaper {
        external_id: external_id.to_string(),
        title,
        abstract_text: meta("citation_abstract").unwrap_or_default(),
        sections: None,
        source: ARXIV_SOURCE.to_string(),
    })
}

/// Id of the search result whose title matches `title`.
pub fn parse_title_search(html: &str, title: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let wanted = normalize_title(title);
    let mut results: Vec<(String, String)> = Vec::new();

    let item_sel = selector("li.arxiv-result")?;
    let title_sel = selector("p.title")?;
    let id_sel = selector("p.list-title a")?;
    for item in document.select(&item_sel) {
        let found_title = item.select(&title_sel).next().map(|p| collapse(&p.text().collect::<String>()));
        let found_id = item.select(&id_sel).next().map(|a| {
            let text = a.text().collect::<String>();
            text.trim().trim_start_matches("arXiv:").to_string()
        });
        if let (Some(t), Some(id)) = (found_title, found_id) {
            if !t.is_empty() && !id.is_empty() {
                results.push((t, id));
            }
        }
    }

    if results.is_empty() {
        let head_title = selector("title")
            .and_then(|sel| document.select(&sel).next().map(|t| t.text().collect::<String>()));
        if let Some(caps) = head_title.as_deref().and_then(|t| SINGLE_RESULT_TITLE.captures(t.trim())) {
            results.push((collapse(&caps[2]), caps[1].to_string()));
        }
    }

    results
        .into_iter()
        .find(|(t, _)| normalize_title(t) == wanted)
        .map(|(_, id)| strip_version(&id).to_string())
}
