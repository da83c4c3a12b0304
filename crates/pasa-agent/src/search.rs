use std::sync::Arc;

use tracing::{debug, info, warn};

use pasa_core::paper::{strip_version, FetchedPaper, NodeId, PaperSource};

use crate::pool::{run_workers, WorkQueue};
use crate::state::RunContext;

/// Resolves planned queries to scored depth-0 nodes under the root.
pub struct SearchWorkers;

impl SearchWorkers {
    /// Drains `queries` with a pool of at most `threads_num` workers and
    /// returns once every query has been processed.
    pub async fn run(ctx: Arc<RunContext>, queries: Vec<String>) {
        if queries.is_empty() {
            info!("No queries planned, skipping search phase");
            return;
        }

        let workers = queries.len().min(ctx.config.threads_num.max(1));
        let queue = Arc::new(WorkQueue::new(queries));

        run_workers("search", workers, |_| {
            let ctx = ctx.clone();
            let queue = queue.clone();
            async move {
                while let Some(query) = queue.pop() {
                    ctx.lock().graph.open_edge(NodeId::ROOT, &query);
                    Self::search_query(&ctx, &query).await;
                }
            }
        })
        .await;

        let found = ctx.lock().discovery_order().len();
        info!(papers = found, "Search phase complete");
    }

    /// Searches one query, claims and fetches unseen ids, scores them in one
    /// batch and attaches them under the query's edge. Returns the number of
    /// nodes added.
    pub async fn search_query(ctx: &RunContext, query: &str) -> usize {
        let config = &ctx.config;
        let raw_ids = match ctx
            .collaborators
            .search
            .search_by_keyword(query, config.end_date, config.search_papers)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!(query, error = %e, "Keyword search failed");
                return 0;
            }
        };

        let mut candidates: Vec<FetchedPaper> = Vec::new();
        for raw_id in &raw_ids {
            let id = strip_version(raw_id);
            let claimed = ctx.lock().claim(id);
            if !claimed {
                debug!(query, external_id = id, "Already claimed, skipping");
                continue;
            }

            match ctx.collaborators.repository.fetch_by_id(id).await {
                Ok(Some(paper)) => candidates.push(paper),
                Ok(None) => debug!(external_id = id, "Paper not found in repository"),
                Err(e) => warn!(external_id = id, error = %e, "Paper fetch failed"),
            }
        }

        let scores = ctx.score_papers(&candidates).await;
        let added = candidates.len();
        {
            let mut state = ctx.lock();
            for (paper, score) in candidates.into_iter().zip(scores) {
                let source = PaperSource::Search(paper.source.clone());
                state.add_scored(NodeId::ROOT, query, paper, 0, source, score);
            }
        }

        info!(query, raw = raw_ids.len(), added, "Query searched");
        added
    }
}
