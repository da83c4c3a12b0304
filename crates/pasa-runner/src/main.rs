use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pasa_agent::{Collaborators, MetricsSummary, PaperAgent, PromptTemplates, RunMetrics};
use pasa_core::config::AppConfig;
use pasa_core::error::Result;
use pasa_model::AnthropicModelClient;
use pasa_sources::{ArxivClient, LocalPaperDb, ScholarSearch, SerperClient};

mod dataset;

use dataset::QueryRecord;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pasa=info")),
        )
        .init();

    let config = AppConfig::from_env();
    let collaborators = build_collaborators(&config)?;
    let prompts = match &config.prompts_path {
        Some(path) => PromptTemplates::from_file(path)?,
        None => PromptTemplates::default(),
    };

    let queries = dataset::load_queries(&config.input_file).await?;
    info!(input = %config.input_file, count = queries.len(), "Loaded queries");

    let output_dir = PathBuf::from(&config.output_dir);
    tokio::fs::create_dir_all(&output_dir).await?;

    let mut metrics = Vec::with_capacity(queries.len());
    for (idx, query) in queries.into_iter().enumerate() {
        match run_query(&config, &collaborators, &prompts, &output_dir, idx, query).await {
            Ok(run) => metrics.push(run),
            Err(e) => warn!(idx, error = %e, "Query failed"),
        }
    }

    let summary = MetricsSummary::from_runs(&metrics);
    info!(
        runs = summary.runs,
        evaluated = summary.evaluated,
        actions = summary.actions,
        action_score = summary.action_score,
        crawler_recall = summary.crawler_recall,
        precision = summary.precision,
        recall = summary.recall,
        recall_at_20 = summary.recall_at_20,
        recall_at_50 = summary.recall_at_50,
        recall_at_100 = summary.recall_at_100,
        "All queries complete"
    );
    Ok(())
}

fn build_collaborators(config: &AppConfig) -> Result<Collaborators> {
    let local = config
        .paper_db_path
        .as_ref()
        .map(LocalPaperDb::open)
        .transpose()?;
    if let Some(db) = &local {
        info!(papers = db.len(), "Local paper database loaded");
    }

    let arxiv = Arc::new(ArxivClient::new(local)?);
    let serper = SerperClient::new(&config.serper_api_key)?;
    let model = AnthropicModelClient::new(config)?;

    Ok(Collaborators {
        model: Arc::new(model),
        search: Arc::new(ScholarSearch::new(serper, arxiv.clone())),
        repository: arxiv,
    })
}

async fn run_query(
    config: &AppConfig,
    collaborators: &Collaborators,
    prompts: &PromptTemplates,
    output_dir: &Path,
    idx: usize,
    query: QueryRecord,
) -> Result<RunMetrics> {
    let mut agent_config = config.agent.clone();
    if let Some(end_date) = query.end_date()? {
        agent_config = agent_config.with_end_date(end_date);
    }

    let mut agent = PaperAgent::new(&query.question, agent_config, collaborators.clone())
        .with_prompts(prompts.clone());
    if let Some(answer) = query.answer {
        agent = agent.with_answer(answer);
    }
    info!(idx, run_id = %agent.run_id(), question = %query.question, "Running query");

    let record = agent.run().await;
    let path = output_dir.join(format!("{idx}.json"));
    tokio::fs::write(&path, serde_json::to_vec_pretty(&record)?).await?;

    let metrics = RunMetrics::from_record(&record);
    info!(
        idx,
        path = %path.display(),
        crawled = metrics.crawled,
        selected = metrics.selected,
        "Result written"
    );
    Ok(metrics)
}
