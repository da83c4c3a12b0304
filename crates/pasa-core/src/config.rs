use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Credentials and paths for the concrete collaborators and the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub anthropic_api_key: String,
    pub model: String,
    pub serper_api_key: String,
    pub paper_db_path: Option<String>,
    pub prompts_path: Option<String>,
    pub input_file: String,
    pub output_dir: String,
    pub agent: AgentConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: std::env::var("PASA_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".into()),
            serper_api_key: std::env::var("SERPER_API_KEY").unwrap_or_default(),
            paper_db_path: std::env::var("PASA_PAPER_DB").ok(),
            prompts_path: std::env::var("PASA_PROMPTS_PATH").ok(),
            input_file: std::env::var("PASA_INPUT_FILE")
                .unwrap_or_else(|_| "data/RealScholarQuery/test.jsonl".into()),
            output_dir: std::env::var("PASA_OUTPUT_DIR").unwrap_or_else(|_| "results".into()),
            agent: AgentConfig::from_env(),
        }
    }
}

/// Search and expansion budgets for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Papers published after this date are never resolved.
    pub end_date: Option<NaiveDate>,
    /// Number of expansion rounds after the search phase.
    pub expand_layers: usize,
    /// Maximum planned queries kept from the planner output.
    pub search_queries: usize,
    /// Results requested per keyword search.
    pub search_papers: usize,
    /// Round budget K for every round after the first.
    pub expand_papers: usize,
    /// Worker pool size; the citation resolve pool is three times this.
    pub threads_num: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            end_date: None,
            expand_layers: 2,
            search_queries: 5,
            search_papers: 10,
            expand_papers: 20,
            threads_num: 20,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            end_date: None,
            expand_layers: env_usize("PASA_EXPAND_LAYERS").unwrap_or(defaults.expand_layers),
            search_queries: env_usize("PASA_SEARCH_QUERIES").unwrap_or(defaults.search_queries),
            search_papers: env_usize("PASA_SEARCH_PAPERS").unwrap_or(defaults.search_papers),
            expand_papers: env_usize("PASA_EXPAND_PAPERS").unwrap_or(defaults.expand_papers),
            threads_num: env_usize("PASA_THREADS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.threads_num),
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.expand_layers, 2);
        assert_eq!(config.search_queries, 5);
        assert_eq!(config.search_papers, 10);
        assert_eq!(config.expand_papers, 20);
        assert_eq!(config.threads_num, 20);
        assert!(config.end_date.is_none());
    }

    #[test]
    fn test_with_end_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let config = AgentConfig::default().with_end_date(date);
        assert_eq!(config.end_date, Some(date));
    }
}
