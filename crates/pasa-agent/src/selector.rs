use tracing::{debug, info, warn};

use pasa_core::command::CommandParser;
use pasa_core::paper::{NodeId, Sections};

use crate::state::RunContext;

/// One citation to resolve, owned by the paper and section it was cited in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveTask {
    pub owner: NodeId,
    pub section: String,
    pub citation: String,
}

/// Asks the model which sections of fetched papers are worth expanding.
pub struct SectionSelector;

impl SectionSelector {
    pub fn build_prompt(ctx: &RunContext, owner: NodeId, sections: &Sections) -> Option<String> {
        let state = ctx.lock();
        let node = state.graph.get(owner)?;
        let names: Vec<&str> = sections.keys().map(String::as_str).collect();
        Some(
            ctx.prompts
                .section_prompt(&ctx.question, &node.title, &node.abstract_text, &names),
        )
    }

    /// Section names chosen in `reply` that exist in `sections`, without
    /// duplicates.
    pub fn choose(reply: &str, sections: &Sections) -> Vec<String> {
        let mut chosen: Vec<String> = Vec::new();
        for name in CommandParser::expand_sections(reply) {
            if sections.contains_key(&name) && !chosen.contains(&name) {
                chosen.push(name);
            }
        }
        chosen
    }

    /// Submits one batched selection call for all `papers` and returns the
    /// citations of every chosen section.
    pub async fn select(ctx: &RunContext, papers: &[(NodeId, Sections)]) -> Vec<ResolveTask> {
        let mut owners = Vec::with_capacity(papers.len());
        let mut prompts = Vec::with_capacity(papers.len());
        for (owner, sections) in papers {
            if let Some(prompt) = Self::build_prompt(ctx, *owner, sections) {
                owners.push((*owner, sections));
                prompts.push(prompt);
            }
        }
        if prompts.is_empty() {
            return Vec::new();
        }

        let replies = match ctx.collaborators.model.select_sections(&prompts).await {
            Ok(replies) => replies,
            Err(e) => {
                warn!(papers = prompts.len(), error = %e, "Section selection failed");
                return Vec::new();
            }
        };
        if replies.len() != prompts.len() {
            warn!(
                expected = prompts.len(),
                got = replies.len(),
                "Section selection reply count mismatch"
            );
        }

        let mut tasks = Vec::new();
        for ((owner, sections), reply) in owners.into_iter().zip(replies.iter()) {
            let chosen = Self::choose(reply, sections);
            debug!(owner = owner.0, chosen = ?chosen, "Sections chosen");
            for section in chosen {
                for citation in &sections[&section] {
                    tasks.push(ResolveTask {
                        owner,
                        section: section.clone(),
                        citation: citation.clone(),
                    });
                }
            }
        }

        info!(papers = prompts.len(), citations = tasks.len(), "Section selection complete");
        tasks
    }
}
