use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use pasa_core::error::{PasaError, Result};

const SERPER_SEARCH_URL: &str = "https://google.serper.dev/search";
const MAX_ATTEMPTS: usize = 3;

static ARXIV_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"arxiv\.org/(?:abs|pdf|html)/(\d{4}\.\d+)").expect("arxiv link regex")
});

#[derive(Debug, Serialize)]
struct SerperRequest {
    q: String,
    num: usize,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    link: String,
}

/// Google search through serper.dev, restricted to arxiv.org.
pub struct SerperClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl SerperClient {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("pasa/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint: SERPER_SEARCH_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_query(query: &str, end_date: Option<NaiveDate>) -> String {
        match end_date {
            Some(date) => format!("{query} before:{} site:arxiv.org", date.format("%Y-%m-%d")),
            None => format!("{query} site:arxiv.org"),
        }
    }

    async fn search_once(&self, request: &SerperRequest) -> Result<Vec<String>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| PasaError::from_source("serper", format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PasaError::from_source(
                "serper",
                format!(
                    "API returned HTTP {}: {}",
                    status,
                    body.chars().take(500).collect::<String>()
                ),
            ));
        }

        let data: SerperResponse = response.json().await.map_err(|e| {
            PasaError::from_source("serper", format!("Failed to parse response JSON: {e}"))
        })?;

        Ok(extract_arxiv_ids(data.organic.iter().map(|r| r.link.as_str())))
    }

    /// arXiv ids linked from the top `limit` results, retried up to three
    /// times on failure.
    pub async fn search_arxiv_ids(
        &self,
        query: &str,
        end_date: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<String>> {
        if self.api_key.is_empty() {
            return Err(PasaError::Config("SERPER_API_KEY is not set".into()));
        }

        let request = SerperRequest {
            q: Self::build_query(query, end_date),
            num: limit,
            page: 1,
        };
        debug!(q = %request.q, num = limit, "Searching serper");

        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.search_once(&request).await {
                Ok(ids) => return Ok(ids),
                Err(e) => {
                    warn!(query, attempt, error = %e, "Serper search failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| PasaError::from_source("serper", "no attempts made")))
    }
}

/// Distinct arXiv ids found in `links`, in first-seen order.
pub fn extract_arxiv_ids<'a>(links: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for link in links {
        if let Some(caps) = ARXIV_LINK.captures(link) {
            let id = caps[1].to_string();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}
