use std::collections::HashSet;

use serde::Serialize;

use pasa_core::paper::{normalize_title, PaperRecord};

use crate::state::SELECT_THRESHOLD;

/// Cut-offs for recall over the top-scored crawled papers.
pub const RECALL_CUTOFFS: [usize; 3] = [20, 50, 100];

/// Evaluation of one result graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetrics {
    /// Number of edge labels across the graph.
    pub actions: usize,
    pub crawled: usize,
    pub selected: usize,
    /// Mean per-node action score: +1 per selected child, -0.1 per label.
    pub action_score: f64,
    /// Present only when the root carries reference answers.
    pub answer: Option<AnswerMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerMetrics {
    pub crawler_recall: f64,
    pub precision: f64,
    pub recall: f64,
    pub recall_at_20: f64,
    pub recall_at_50: f64,
    pub recall_at_100: f64,
}

impl RunMetrics {
    pub fn from_record(root: &PaperRecord) -> Self {
        let mut actions = 0;
        let mut node_scores = Vec::new();
        let mut crawled_set = HashSet::new();
        let mut crawled: Vec<(String, f64)> = Vec::new();
        let mut selected_set = HashSet::new();

        for node in root.descendants() {
            actions += node.children.len();
            let mut node_score = 0.0;
            for children in node.children.values() {
                node_score -= 0.1;
                for child in children {
                    let key = normalize_title(&child.title);
                    if child.relevance_score > SELECT_THRESHOLD {
                        selected_set.insert(key.clone());
                        node_score += 1.0;
                    }
                    if crawled_set.insert(key.clone()) {
                        crawled.push((key, child.relevance_score));
                    }
                }
            }
            node_scores.push(node_score);
        }

        let action_score = mean(&node_scores);
        let answer_set: HashSet<String> = root
            .scratch
            .answer
            .iter()
            .map(|t| normalize_title(t))
            .collect();

        let answer = (!answer_set.is_empty()).then(|| {
            crawled.sort_by(|a, b| b.1.total_cmp(&a.1));
            let top = |k: usize| -> HashSet<String> {
                crawled.iter().take(k).map(|(t, _)| t.clone()).collect()
            };
            let [k20, k50, k100] = RECALL_CUTOFFS;

            AnswerMetrics {
                crawler_recall: recall(&crawled_set, &answer_set),
                precision: precision(&selected_set, &answer_set),
                recall: recall(&selected_set, &answer_set),
                recall_at_20: recall(&top(k20), &answer_set),
                recall_at_50: recall(&top(k50), &answer_set),
                recall_at_100: recall(&top(k100), &answer_set),
            }
        });

        Self {
            actions,
            crawled: crawled_set.len(),
            selected: selected_set.len(),
            action_score,
            answer,
        }
    }
}

/// Averages over many runs. Answer metrics are averaged over the runs that
/// have them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub runs: usize,
    pub actions: f64,
    pub action_score: f64,
    pub evaluated: usize,
    pub crawler_recall: f64,
    pub precision: f64,
    pub recall: f64,
    pub recall_at_20: f64,
    pub recall_at_50: f64,
    pub recall_at_100: f64,
}

impl MetricsSummary {
    pub fn from_runs(runs: &[RunMetrics]) -> Self {
        let answers: Vec<&AnswerMetrics> = runs.iter().filter_map(|m| m.answer.as_ref()).collect();
        let avg = |f: fn(&AnswerMetrics) -> f64| mean(&answers.iter().map(|a| f(a)).collect::<Vec<_>>());

        Self {
            runs: runs.len(),
            actions: mean(&runs.iter().map(|m| m.actions as f64).collect::<Vec<_>>()),
            action_score: mean(&runs.iter().map(|m| m.action_score).collect::<Vec<_>>()),
            evaluated: answers.len(),
            crawler_recall: avg(|a| a.crawler_recall),
            precision: avg(|a| a.precision),
            recall: avg(|a| a.recall),
            recall_at_20: avg(|a| a.recall_at_20),
            recall_at_50: avg(|a| a.recall_at_50),
            recall_at_100: avg(|a| a.recall_at_100),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn hits(predicted: &HashSet<String>, answer: &HashSet<String>) -> usize {
    predicted.intersection(answer).count()
}

fn precision(predicted: &HashSet<String>, answer: &HashSet<String>) -> f64 {
    if predicted.is_empty() {
        return 0.0;
    }
    hits(predicted, answer) as f64 / predicted.len() as f64
}

fn recall(predicted: &HashSet<String>, answer: &HashSet<String>) -> f64 {
    if answer.is_empty() {
        return 0.0;
    }
    hits(predicted, answer) as f64 / answer.len() as f64
}
