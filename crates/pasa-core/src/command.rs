use serde::{Deserialize, Serialize};

/// Directive kinds understood in model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Search,
    Expand,
}

impl CommandKind {
    /// Opening marker as it appears in model output. The directive ends at
    /// the next `[`.
    pub fn marker(self) -> &'static str {
        match self {
            CommandKind::Search => "Search]",
            CommandKind::Expand => "Expand]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub payload: String,
}

/// Parser for the bracket-token protocol: `Search] payload [` and
/// `Expand] payload [`. Unterminated markers and text outside markers are
/// ignored, so malformed output yields an empty list.
pub struct CommandParser;

impl CommandParser {
    pub fn parse(text: &str, kind: CommandKind) -> Vec<Command> {
        let marker = kind.marker();
        let mut commands = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find(marker) {
            let after = &rest[start + marker.len()..];
            let Some(end) = after.find('[') else {
                break;
            };
            let payload = after[..end].trim();
            if !payload.is_empty() {
                commands.push(Command {
                    kind,
                    payload: payload.to_string(),
                });
            }
            rest = &after[end + 1..];
        }

        commands
    }

    pub fn search_queries(text: &str) -> Vec<String> {
        Self::parse(text, CommandKind::Search)
            .into_iter()
            .map(|c| c.payload)
            .collect()
    }

    pub fn expand_sections(text: &str) -> Vec<String> {
        Self::parse(text, CommandKind::Expand)
            .into_iter()
            .map(|c| c.payload)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_search_directives() {
        let text = "I will search for:\nSearch] graph neural networks [\nand Search] message passing [ done";
        assert_eq!(
            CommandParser::search_queries(text),
            vec!["graph neural networks", "message passing"]
        );
    }

    #[test]
    fn test_payload_may_span_lines() {
        let text = "Expand] Related\nWork [";
        assert_eq!(CommandParser::expand_sections(text), vec!["Related\nWork"]);
    }

    #[test]
    fn test_no_markers_yields_empty() {
        assert!(CommandParser::search_queries("nothing useful here").is_empty());
        assert!(CommandParser::expand_sections("").is_empty());
    }

    #[test]
    fn test_unterminated_marker_ignored() {
        let text = "Search] first [ Search] never closed";
        assert_eq!(CommandParser::search_queries(text), vec!["first"]);
    }

    #[test]
    fn test_kinds_are_independent() {
        let text = "Search] a Expand] b [";
        assert_eq!(CommandParser::search_queries(text), vec!["a Expand] b"]);
        assert_eq!(CommandParser::expand_sections(text), vec!["b"]);
    }

    #[test]
    fn test_marker_is_case_sensitive_and_exact() {
        let text = "search] lower [ Search ] spaced [ [Search] bracketed [";
        assert_eq!(CommandParser::search_queries(text), vec!["bracketed"]);
    }

    #[test]
    fn test_empty_payload_dropped() {
        let parsed = CommandParser::parse("Expand] [ Expand]  Method [", CommandKind::Expand);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].payload, "Method");
        assert_eq!(parsed[0].kind, CommandKind::Expand);
    }
}
