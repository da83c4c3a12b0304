use tracing::{debug, warn};

use pasa_core::paper::{ExpandStatus, NodeId, Sections};

use crate::state::RunContext;

/// Loads a node's section/citation skeleton, at most once per node.
pub struct ContentFetcher;

impl ContentFetcher {
    /// Returns the node's sections, fetching them if they are absent. A node
    /// whose fetch failed is marked [`ExpandStatus::FetchError`] and never
    /// fetched again.
    pub async fn ensure_sections(ctx: &RunContext, id: NodeId) -> Option<Sections> {
        let external_id = {
            let state = ctx.lock();
            let node = state.graph.get(id)?;
            if let Some(sections) = &node.sections {
                return Some(sections.clone());
            }
            if node.scratch.expand == Some(ExpandStatus::FetchError) {
                return None;
            }
            node.external_id.clone()?
        };

        let fetched = match ctx
            .collaborators
            .repository
            .fetch_sections(&external_id)
            .await
        {
            Ok(Some(sections)) if !sections.is_empty() => Some(sections),
            Ok(_) => {
                debug!(external_id = %external_id, "No full text available");
                None
            }
            Err(e) => {
                warn!(external_id = %external_id, error = %e, "Full text fetch failed");
                None
            }
        };

        let mut state = ctx.lock();
        let node = state.graph.get_mut(id)?;
        match fetched {
            Some(sections) => Some(node.sections.get_or_insert(sections).clone()),
            None => {
                node.scratch.expand = Some(ExpandStatus::FetchError);
                None
            }
        }
    }
}
