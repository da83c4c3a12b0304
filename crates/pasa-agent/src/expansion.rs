use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use pasa_core::paper::{ExpandStatus, NodeId, Sections};

use crate::fetcher::ContentFetcher;
use crate::pool::{run_workers, Collector, WorkQueue};
use crate::resolver::CitationResolver;
use crate::selector::SectionSelector;
use crate::state::{RunContext, RunState};

/// What one expansion round did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundSummary {
    pub depth: usize,
    /// Frontier size before the budget was applied.
    pub frontier: usize,
    pub expanded: Vec<NodeId>,
    pub fetched: usize,
    pub citations: usize,
    pub added: usize,
}

/// Drives one depth-bounded, best-first expansion round at a time.
pub struct ExpansionScheduler;

impl ExpansionScheduler {
    /// Takes the frontier (everything discovered since the previous round),
    /// orders it by score, highest first, with ties kept in discovery order,
    /// and applies the round budget for every round after the first. The
    /// cursor moves past the whole frontier, so truncated papers are never
    /// revisited.
    pub fn select_frontier(state: &mut RunState, depth: usize, budget: usize) -> (usize, Vec<NodeId>) {
        let mut frontier = state.take_frontier();
        let total = frontier.len();
        frontier.sort_by(|a, b| state.score_of(*b).total_cmp(&state.score_of(*a)));
        if depth > 0 {
            frontier.truncate(budget);
        }
        (total, frontier)
    }

    pub async fn expand(ctx: Arc<RunContext>, depth: usize) -> RoundSummary {
        let (frontier_len, frontier) = {
            let mut state = ctx.lock();
            Self::select_frontier(&mut state, depth, ctx.config.expand_papers)
        };
        info!(depth, frontier = frontier_len, expanding = frontier.len(), "Starting expansion round");

        let fetched = Self::fetch_phase(ctx.clone(), &frontier).await;
        let tasks = SectionSelector::select(&ctx, &fetched).await;
        let citations = tasks.len();
        let added = CitationResolver::run(ctx.clone(), tasks).await;

        let summary = RoundSummary {
            depth,
            frontier: frontier_len,
            expanded: frontier,
            fetched: fetched.len(),
            citations,
            added,
        };
        info!(
            depth,
            fetched = summary.fetched,
            citations,
            added,
            "Expansion round complete"
        );
        summary
    }

    /// Loads skeletons for the round's papers in parallel. Papers with a
    /// skeleton start out as [`ExpandStatus::NotExpanded`].
    async fn fetch_phase(ctx: Arc<RunContext>, frontier: &[NodeId]) -> Vec<(NodeId, Sections)> {
        if frontier.is_empty() {
            return Vec::new();
        }

        let workers = ctx.config.threads_num.max(1).min(frontier.len());
        let queue = Arc::new(WorkQueue::new(frontier.iter().copied()));
        let fetched = Arc::new(Collector::default());

        run_workers("fetch", workers, |_| {
            let ctx = ctx.clone();
            let queue = queue.clone();
            let fetched = fetched.clone();
            async move {
                while let Some(id) = queue.pop() {
                    let Some(sections) = ContentFetcher::ensure_sections(&ctx, id).await else {
                        continue;
                    };
                    if let Some(node) = ctx.lock().graph.get_mut(id) {
                        node.scratch.expand = Some(ExpandStatus::NotExpanded);
                    }
                    fetched.push((id, sections));
                }
            }
        })
        .await;

        let mut fetched = fetched.take();
        // Workers finish in arbitrary order; keep prompts in ranking order.
        fetched.sort_by_key(|(id, _)| frontier.iter().position(|f| f == id));
        fetched
    }
}

#[cfg(test)]
mod tests {
    use pasa_core::paper::{FetchedPaper, PaperSource};

    use super::*;

    fn add(state: &mut RunState, id: &str, score: f64) -> NodeId {
        let paper = FetchedPaper {
            external_id: id.to_string(),
            title: id.to_string(),
            abstract_text: String::new(),
            sections: None,
            source: "arxiv".to_string(),
        };
        state.add_scored(NodeId::ROOT, "q", paper, 0, PaperSource::Search("arxiv".into()), score)
    }

    #[test]
    fn test_first_round_is_unbounded() {
        let mut state = RunState::new("q");
        for i in 0..30 {
            add(&mut state, &i.to_string(), 0.5);
        }
        let (total, frontier) = ExpansionScheduler::select_frontier(&mut state, 0, 5);
        assert_eq!(total, 30);
        assert_eq!(frontier.len(), 30);
    }

    #[test]
    fn test_budget_keeps_top_k() {
        let mut state = RunState::new("q");
        let scores = [0.3, 0.9, 0.1, 0.7, 0.5, 0.2, 0.8, 0.4, 0.6, 0.05, 0.95, 0.15];
        let ids: Vec<NodeId> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| add(&mut state, &i.to_string(), *s))
            .collect();

        let (total, frontier) = ExpansionScheduler::select_frontier(&mut state, 1, 5);
        assert_eq!(total, 12);
        assert_eq!(frontier, vec![ids[10], ids[1], ids[6], ids[3], ids[8]]);
        assert_eq!(state.cursor(), 12);

        // Dropped candidates never come back.
        let (next_total, next) = ExpansionScheduler::select_frontier(&mut state, 2, 5);
        assert_eq!(next_total, 0);
        assert!(next.is_empty());
    }

    #[test]
    fn test_nan_score_does_not_disturb_ranking() {
        let mut state = RunState::new("q");
        let ids: Vec<NodeId> = [0.0, 0.1, f64::NAN, 0.3, 0.4, 0.5]
            .iter()
            .enumerate()
            .map(|(i, s)| add(&mut state, &i.to_string(), *s))
            .collect();

        let (_, frontier) = ExpansionScheduler::select_frontier(&mut state, 1, 2);
        assert_eq!(frontier, vec![ids[5], ids[4]]);
        assert_eq!(state.score_of(ids[2]), 0.0);
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let mut state = RunState::new("q");
        let a = add(&mut state, "a", 0.4);
        let b = add(&mut state, "b", 0.9);
        let c = add(&mut state, "c", 0.4);
        let d = add(&mut state, "d", 0.4);

        let (_, frontier) = ExpansionScheduler::select_frontier(&mut state, 1, 3);
        assert_eq!(frontier, vec![b, a, c]);
        assert!(!frontier.contains(&d));
    }
}
