use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use pasa_core::error::Result;
use pasa_core::paper::{normalize_title, FetchedPaper, Sections};

pub const LOCAL_DB_SOURCE: &str = "local_paper_db";

/// Index file mapping external id -> paper title.
const INDEX_FILE: &str = "id2paper.json";
/// Directory of `<normalized title>.json` paper files.
const PAPERS_DIR: &str = "papers";

#[derive(Debug, Deserialize)]
struct StoredPaper {
    title: String,
    #[serde(rename = "abstract", default)]
    abstract_text: String,
    #[serde(default)]
    sections: Option<Sections>,
}

/// Read-only local cache of papers with pre-extracted section skeletons,
/// consulted before any network lookup.
#[derive(Debug)]
pub struct LocalPaperDb {
    root: PathBuf,
    index: HashMap<String, String>,
}

impl LocalPaperDb {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let raw = std::fs::read_to_string(root.join(INDEX_FILE))?;
        let index: HashMap<String, String> = serde_json::from_str(&raw)?;
        info!(path = %root.display(), papers = index.len(), "Opened local paper database");
        Ok(Self { root, index })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn paper_path(&self, title: &str) -> PathBuf {
        self.root
            .join(PAPERS_DIR)
            .join(format!("{}.json", normalize_title(title)))
    }

    /// Looks a paper up by id through its normalized title. Missing or
    /// unreadable entries are cache misses.
    pub async fn get(&self, external_id: &str) -> Option<FetchedPaper> {
        let title = self.index.get(external_id)?;
        let path = self.paper_path(title);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(external_id, path = %path.display(), error = %e, "Local paper file missing");
                return None;
            }
        };

        match serde_json::from_str::<StoredPaper>(&raw) {
            Ok(stored) => Some(FetchedPaper {
                external_id: external_id.to_string(),
                title: stored.title.replace('\n', " "),
                abstract_text: stored.abstract_text,
                sections: stored.sections,
                source: LOCAL_DB_SOURCE.to_string(),
            }),
            Err(e) => {
                warn!(external_id, path = %path.display(), error = %e, "Corrupt local paper file");
                None
            }
        }
    }
}
