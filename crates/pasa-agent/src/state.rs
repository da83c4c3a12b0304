use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use pasa_core::config::AgentConfig;
use pasa_core::model::ModelClient;
use pasa_core::paper::{FetchedPaper, NodeId, PaperGraph, PaperNode, PaperSource};
use pasa_core::source::{PaperRepository, SearchService};

use crate::prompts::PromptTemplates;

/// Papers scoring above this are recorded as selected, not merely crawled.
// TODO: decide whether this belongs in AgentConfig once scores are calibrated.
pub const SELECT_THRESHOLD: f64 = 0.5;

/// Run-wide bookkeeping guarded by the run lock: the node arena (including
/// the root's touched ids and provenance lists) and the discovery order with
/// its expansion cursor.
#[derive(Debug)]
pub struct RunState {
    pub graph: PaperGraph,
    discovery: Vec<NodeId>,
    cursor: usize,
}

impl RunState {
    pub fn new(question: &str) -> Self {
        Self {
            graph: PaperGraph::new(question),
            discovery: Vec::new(),
            cursor: 0,
        }
    }

    /// Test-and-set of `external_id` into the touched set. Only the first
    /// caller for an id gets `true`.
    pub fn claim(&mut self, external_id: &str) -> bool {
        self.graph
            .root_mut()
            .scratch
            .touched_ids
            .insert(external_id.to_string())
    }

    /// Records provenance, attaches a scored node under `parent[label]` and
    /// appends it to the discovery order.
    pub fn add_scored(
        &mut self,
        parent: NodeId,
        label: &str,
        paper: FetchedPaper,
        depth: i32,
        source: PaperSource,
        score: f64,
    ) -> NodeId {
        let node = PaperNode::from_paper(paper, depth, source, score);
        let scratch = &mut self.graph.root_mut().scratch;
        scratch.crawled_papers.push(node.title.clone());
        if node.relevance_score() > SELECT_THRESHOLD {
            scratch.selected_papers.push(node.title.clone());
        }

        let id = self.graph.attach(parent, label, node);
        self.discovery.push(id);
        id
    }

    pub fn discovery_order(&self) -> &[NodeId] {
        &self.discovery
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Everything discovered since the last call. Moves the cursor to the
    /// current end, so nodes added afterwards form the next frontier.
    pub fn take_frontier(&mut self) -> Vec<NodeId> {
        let frontier = self.discovery[self.cursor..].to_vec();
        self.cursor = self.discovery.len();
        frontier
    }

    pub fn score_of(&self, id: NodeId) -> f64 {
        self.graph.get(id).map_or(0.0, PaperNode::relevance_score)
    }
}

/// Handles to the external collaborators of a run.
#[derive(Clone)]
pub struct Collaborators {
    pub model: Arc<dyn ModelClient>,
    pub search: Arc<dyn SearchService>,
    pub repository: Arc<dyn PaperRepository>,
}

/// Everything a worker needs: settings, collaborators and the locked run
/// state. Shared between workers through an `Arc`.
pub struct RunContext {
    pub question: String,
    pub config: AgentConfig,
    pub prompts: PromptTemplates,
    pub collaborators: Collaborators,
    state: Mutex<RunState>,
}

impl RunContext {
    pub fn new(
        question: &str,
        config: AgentConfig,
        prompts: PromptTemplates,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            question: question.to_string(),
            config,
            prompts,
            collaborators,
            state: Mutex::new(RunState::new(question)),
        }
    }

    /// Acquires the run lock. Never hold the guard across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scores `papers` against the question in one batched model call.
    /// A failed call scores every paper 0; a short reply is padded with 0.
    pub async fn score_papers(&self, papers: &[FetchedPaper]) -> Vec<f64> {
        if papers.is_empty() {
            return Vec::new();
        }

        let prompts: Vec<String> = papers
            .iter()
            .map(|p| {
                self.prompts
                    .score_prompt(&self.question, &p.title, &p.abstract_text)
            })
            .collect();

        let mut scores = match self.collaborators.model.score(&prompts).await {
            Ok(scores) => scores,
            Err(e) => {
                warn!(count = papers.len(), error = %e, "Scoring failed, treating batch as unselected");
                Vec::new()
            }
        };
        if !scores.is_empty() && scores.len() != papers.len() {
            warn!(
                expected = papers.len(),
                got = scores.len(),
                "Score count mismatch"
            );
        }
        scores.resize(papers.len(), 0.0);
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str) -> FetchedPaper {
        FetchedPaper {
            external_id: id.to_string(),
            title: format!("Paper {id}"),
            abstract_text: String::new(),
            sections: None,
            source: "arxiv".to_string(),
        }
    }

    #[test]
    fn test_claim_is_test_and_set() {
        let mut state = RunState::new("q");
        assert!(state.claim("2307.00235"));
        assert!(!state.claim("2307.00235"));
        assert!(state.claim("1111.11111"));
        assert_eq!(state.graph.root().scratch.touched_ids.len(), 2);
    }

    #[test]
    fn test_add_scored_records_provenance() {
        let mut state = RunState::new("q");
        let source = PaperSource::Search("arxiv".into());
        state.add_scored(NodeId::ROOT, "q1", paper("1"), 0, source.clone(), 0.9);
        state.add_scored(NodeId::ROOT, "q1", paper("2"), 0, source.clone(), 0.5);

        let scratch = &state.graph.root().scratch;
        assert_eq!(scratch.crawled_papers, vec!["Paper 1", "Paper 2"]);
        // Exactly 0.5 is not above the threshold.
        assert_eq!(scratch.selected_papers, vec!["Paper 1"]);
        assert_eq!(state.discovery_order().len(), 2);
    }

    #[test]
    fn test_non_finite_score_is_never_selected() {
        let mut state = RunState::new("q");
        let source = PaperSource::Search("arxiv".into());
        let id = state.add_scored(NodeId::ROOT, "q", paper("1"), 0, source, f64::INFINITY);
        assert_eq!(state.score_of(id), 0.0);
        assert!(state.graph.root().scratch.selected_papers.is_empty());
    }

    #[test]
    fn test_take_frontier_advances_cursor() {
        let mut state = RunState::new("q");
        let source = PaperSource::Search("arxiv".into());
        state.add_scored(NodeId::ROOT, "q", paper("1"), 0, source.clone(), 0.1);
        state.add_scored(NodeId::ROOT, "q", paper("2"), 0, source.clone(), 0.2);

        let first = state.take_frontier();
        assert_eq!(first.len(), 2);
        assert_eq!(state.cursor(), 2);

        state.add_scored(first[0], "Intro", paper("3"), 1, PaperSource::Expand("arxiv".into()), 0.3);
        let second = state.take_frontier();
        assert_eq!(second.len(), 1);
        assert!(state.take_frontier().is_empty());
        assert!(state.cursor() <= state.discovery_order().len());
    }
}
