use std::path::Path;

use chrono::{Days, NaiveDate};
use serde::Deserialize;

use pasa_core::error::{PasaError, Result};

/// Days subtracted from a query's publication date to get the search cut-off.
pub const END_DATE_OFFSET_DAYS: u64 = 7;

/// One line of a benchmark JSONL file.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRecord {
    pub question: String,
    #[serde(default)]
    pub source_meta: Option<SourceMeta>,
    #[serde(default)]
    pub answer: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceMeta {
    /// `YYYYMMDD`.
    pub published_time: Option<String>,
}

impl QueryRecord {
    /// Latest publication date a search for this query may return: a week
    /// before the query itself was published.
    pub fn end_date(&self) -> Result<Option<NaiveDate>> {
        let Some(published) = self
            .source_meta
            .as_ref()
            .and_then(|m| m.published_time.as_deref())
        else {
            return Ok(None);
        };

        let date = NaiveDate::parse_from_str(published, "%Y%m%d")
            .map_err(|e| PasaError::Parse(format!("published_time {published:?}: {e}")))?;
        Ok(date.checked_sub_days(Days::new(END_DATE_OFFSET_DAYS)))
    }
}

/// Parses every non-blank line of a JSONL file.
pub fn parse_queries(raw: &str) -> Result<Vec<QueryRecord>> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(PasaError::from))
        .collect()
}

pub async fn load_queries(path: impl AsRef<Path>) -> Result<Vec<QueryRecord>> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_queries(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_queries() {
        let raw = r#"{"question": "Which papers study RLHF?", "source_meta": {"published_time": "20240301"}, "answer": ["Paper A"]}

{"question": "Diffusion models for audio"}
"#;
        let queries = parse_queries(raw).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].answer.as_deref(), Some(&["Paper A".to_string()][..]));
        assert!(queries[1].source_meta.is_none());
    }

    #[test]
    fn test_end_date_is_one_week_earlier() {
        let record: QueryRecord = serde_json::from_str(
            r#"{"question": "q", "source_meta": {"published_time": "20240305"}}"#,
        )
        .unwrap();
        assert_eq!(
            record.end_date().unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 27)
        );
    }

    #[test]
    fn test_end_date_missing_or_malformed() {
        let record: QueryRecord = serde_json::from_str(r#"{"question": "q"}"#).unwrap();
        assert_eq!(record.end_date().unwrap(), None);

        let bad: QueryRecord = serde_json::from_str(
            r#"{"question": "q", "source_meta": {"published_time": "March 2024"}}"#,
        )
        .unwrap();
        assert!(matches!(bad.end_date(), Err(PasaError::Parse(_))));
    }

    #[test]
    fn test_parse_queries_rejects_bad_line() {
        assert!(parse_queries("{not json}").is_err());
    }

    #[tokio::test]
    async fn test_load_queries_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.jsonl");
        std::fs::write(&path, "{\"question\": \"q1\"}\n{\"question\": \"q2\"}\n").unwrap();
        let queries = load_queries(&path).await.unwrap();
        assert_eq!(queries[1].question, "q2");
    }
}
