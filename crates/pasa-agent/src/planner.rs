use tracing::{info, warn};

use pasa_core::command::CommandParser;

use crate::state::RunContext;

/// Turns the user question into keyword queries with one model call.
pub struct QueryPlanner;

impl QueryPlanner {
    /// Planned queries, at most `search_queries` of them. Model failure or
    /// output without `Search]...[` directives yields no queries.
    pub async fn plan(ctx: &RunContext) -> Vec<String> {
        let prompt = ctx.prompts.query_prompt(&ctx.question);

        let reply = match ctx.collaborators.model.plan(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Query planning failed, no searches will run");
                return Vec::new();
            }
        };

        let mut queries = CommandParser::search_queries(&reply);
        queries.truncate(ctx.config.search_queries);

        if queries.is_empty() {
            warn!(reply_len = reply.len(), "Planner output had no search directives");
        } else {
            info!(count = queries.len(), queries = ?queries, "Planned search queries");
        }
        queries
    }
}
