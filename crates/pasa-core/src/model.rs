use async_trait::async_trait;

use crate::error::Result;

/// Language-model collaborator. Prompt construction belongs to the caller;
/// implementations only transport prompts and return raw text or scores.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Free-text answer to a query-planning prompt, expected to carry
    /// `Search]...[` directives.
    async fn plan(&self, prompt: &str) -> Result<String>;

    /// One free-text answer per section-selection prompt, in input order.
    async fn select_sections(&self, prompts: &[String]) -> Result<Vec<String>>;

    /// One relevance score in `[0, 1]` per prompt, in input order.
    async fn score(&self, prompts: &[String]) -> Result<Vec<f64>>;
}
