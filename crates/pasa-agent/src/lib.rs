pub mod agent;
pub mod expansion;
pub mod fetcher;
pub mod metrics;
pub mod planner;
pub mod pool;
pub mod prompts;
pub mod resolver;
pub mod search;
pub mod selector;
pub mod state;

pub use agent::{PaperAgent, RunReport};
pub use expansion::{ExpansionScheduler, RoundSummary};
pub use fetcher::ContentFetcher;
pub use metrics::{AnswerMetrics, MetricsSummary, RunMetrics};
pub use planner::QueryPlanner;
pub use prompts::PromptTemplates;
pub use resolver::CitationResolver;
pub use search::SearchWorkers;
pub use selector::{ResolveTask, SectionSelector};
pub use state::{Collaborators, RunContext, RunState, SELECT_THRESHOLD};
