mod anthropic;

pub use anthropic::{parse_score, AnthropicModelClient};
