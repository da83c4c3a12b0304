use std::path::Path;

use serde::{Deserialize, Serialize};

use pasa_core::error::Result;

const GENERATE_QUERY: &str = "You are an elite researcher in the field of AI, conducting research on {user_query}. \
What are the most important keywords or phrases to search for in order to find papers that answer this query? \
Write each search query as Search] your query [ and give at most five of them.\n\n\
User Query: {user_query}\n";

const SELECT_SECTION: &str = "You are conducting research on `{user_query}`. You need to predict which sections \
of the following paper cite references that are worth reading to answer the query.\n\n\
Title: {title}\nAbstract: {abstract}\nSections: {sections}\n\n\
For every section worth expanding, write Expand] exact section name [ on its own line. \
If no section is useful, write nothing in that format.\n";

const GET_SELECTED: &str = "You are an elite researcher in the field of AI, conducting research on {user_query}. \
Evaluate whether the following paper fully satisfies the detailed requirements of the user query.\n\n\
Searched Paper:\nTitle: {title}\nAbstract: {abstract}\n\n\
User Query: {user_query}\n";

/// Prompt templates with `{user_query}`, `{title}`, `{abstract}` and
/// `{sections}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplates {
    pub generate_query: String,
    pub select_section: String,
    pub get_selected: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            generate_query: GENERATE_QUERY.to_string(),
            select_section: SELECT_SECTION.to_string(),
            get_selected: GET_SELECTED.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Loads templates from a JSON object with the three template keys.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn query_prompt(&self, user_query: &str) -> String {
        self.generate_query
            .replace("{user_query}", user_query)
            .trim()
            .to_string()
    }

    pub fn section_prompt(&self, user_query: &str, title: &str, abstract_text: &str, sections: &[&str]) -> String {
        let names = serde_json::to_string(sections).unwrap_or_default();
        self.select_section
            .replace("{user_query}", user_query)
            .replace("{title}", title)
            .replace("{abstract}", abstract_text)
            .replace("{sections}", &names)
            .trim()
            .to_string()
    }

    pub fn score_prompt(&self, user_query: &str, title: &str, abstract_text: &str) -> String {
        self.get_selected
            .replace("{user_query}", user_query)
            .replace("{title}", title)
            .replace("{abstract}", abstract_text)
    }
}
