use std::sync::Arc;

use tracing::{debug, info, warn};

use pasa_core::paper::{strip_version, ExpandStatus, FetchedPaper, PaperSource};

use crate::pool::{run_workers, Collector, WorkQueue};
use crate::selector::ResolveTask;
use crate::state::RunContext;

/// Resolves citation strings to canonical papers and attaches them one layer
/// below the paper that cites them.
pub struct CitationResolver;

impl CitationResolver {
    /// Size of the resolve pool: each expanded paper fans out to many
    /// citations.
    pub fn pool_size(ctx: &RunContext) -> usize {
        ctx.config.threads_num.max(1) * 3
    }

    /// Resolves every task, scores all new papers in one batch and attaches
    /// them. Returns the number of nodes added.
    pub async fn run(ctx: Arc<RunContext>, tasks: Vec<ResolveTask>) -> usize {
        if tasks.is_empty() {
            return 0;
        }

        let workers = Self::pool_size(&ctx).min(tasks.len());
        let queue = Arc::new(WorkQueue::new(tasks));
        let resolved = Arc::new(Collector::default());

        run_workers("resolve", workers, |_| {
            let ctx = ctx.clone();
            let queue = queue.clone();
            let resolved = resolved.clone();
            async move {
                while let Some(task) = queue.pop() {
                    if let Some(paper) = Self::resolve(&ctx, &task).await {
                        resolved.push((task, paper));
                    }
                }
            }
        })
        .await;

        let resolved: Vec<(ResolveTask, FetchedPaper)> = resolved.take();
        let papers: Vec<FetchedPaper> = resolved.iter().map(|(_, p)| p.clone()).collect();
        let scores = ctx.score_papers(&papers).await;

        let added = resolved.len();
        {
            let mut state = ctx.lock();
            for ((task, paper), score) in resolved.into_iter().zip(scores) {
                let Some(owner) = state.graph.get(task.owner) else {
                    continue;
                };
                let depth = owner.depth + 1;
                let source = PaperSource::Expand(paper.source.clone());
                state.add_scored(task.owner, &task.section, paper, depth, source, score);
                if let Some(owner) = state.graph.get_mut(task.owner) {
                    owner.scratch.expand = Some(ExpandStatus::Success);
                }
            }
        }

        info!(added, "Citation resolution complete");
        added
    }

    /// Title search plus dedup claim. `None` when the citation cannot be
    /// resolved or its paper was already claimed.
    pub async fn resolve(ctx: &RunContext, task: &ResolveTask) -> Option<FetchedPaper> {
        let mut paper = match ctx
            .collaborators
            .search
            .search_by_title(&task.citation)
            .await
        {
            Ok(Some(paper)) => paper,
            Ok(None) => {
                debug!(citation = %task.citation, "Citation not resolved");
                return None;
            }
            Err(e) => {
                warn!(citation = %task.citation, error = %e, "Title search failed");
                return None;
            }
        };

        paper.external_id = strip_version(&paper.external_id).to_string();
        let claimed = ctx.lock().claim(&paper.external_id);
        if !claimed {
            debug!(external_id = %paper.external_id, "Already claimed, skipping");
            return None;
        }
        Some(paper)
    }
}
