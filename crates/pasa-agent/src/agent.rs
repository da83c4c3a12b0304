use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use pasa_core::config::AgentConfig;
use pasa_core::paper::PaperRecord;

use crate::expansion::{ExpansionScheduler, RoundSummary};
use crate::planner::QueryPlanner;
use crate::prompts::PromptTemplates;
use crate::search::SearchWorkers;
use crate::state::{Collaborators, RunContext};

/// Result of a full run: the serialized graph plus per-phase bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub queries: Vec<String>,
    pub rounds: Vec<RoundSummary>,
    pub discovered: usize,
    pub record: PaperRecord,
}

/// Literature-discovery agent for a single research question.
pub struct PaperAgent {
    ctx: RunContext,
    run_id: Uuid,
}

impl PaperAgent {
    pub fn new(question: &str, config: AgentConfig, collaborators: Collaborators) -> Self {
        Self {
            ctx: RunContext::new(question, config, PromptTemplates::default(), collaborators),
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptTemplates) -> Self {
        self.ctx.prompts = prompts;
        self
    }

    /// Stores reference answer titles on the root for later evaluation.
    pub fn with_answer(self, answer: Vec<String>) -> Self {
        self.ctx.lock().graph.root_mut().scratch.answer = answer;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Plans and runs the keyword searches once, then one expansion round per
    /// layer. Always returns whatever graph was built.
    pub async fn run(self) -> PaperRecord {
        self.run_detailed().await.record
    }

    pub async fn run_detailed(self) -> RunReport {
        let run_id = self.run_id;
        let span = info_span!("paper_agent", run_id = %run_id);
        let ctx = Arc::new(self.ctx);

        async move {
            info!(question = %ctx.question, "Starting run");

            let queries = QueryPlanner::plan(&ctx).await;
            SearchWorkers::run(ctx.clone(), queries.clone()).await;

            let mut rounds = Vec::with_capacity(ctx.config.expand_layers);
            for depth in 0..ctx.config.expand_layers {
                rounds.push(ExpansionScheduler::expand(ctx.clone(), depth).await);
            }

            let (discovered, record) = {
                let state = ctx.lock();
                (state.discovery_order().len(), state.graph.root_record())
            };
            info!(discovered, rounds = rounds.len(), "Run complete");

            RunReport {
                run_id,
                queries,
                rounds,
                discovered,
                record,
            }
        }
        .instrument(span)
        .await
    }
}
