//! Full-text skeleton extraction from ar5iv HTML renderings of arXiv papers.
//!
//! The skeleton maps each body section (and `Section Subsection` pair) to the
//! titles of the references cited inside it. Reference titles come from the
//! bibliography block, so they are only as good as ar5iv's citation parsing.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use pasa_core::error::{PasaError, Result};
use pasa_core::paper::Sections;

pub const AR5IV_HTML_URL: &str = "https://ar5iv.labs.arxiv.org/html";

/// Sections whose title contains one of these are not part of the body.
const STOP_WORDS: &[&str] = &[
    "references",
    "acknowledgments",
    "acknowledgements",
    "about this document",
    "appendix",
];

/// Trailing year marker inside a bibliography entry, e.g. `. 2022a.`
static YEAR_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s\d{4}[a-z]?\.").expect("year suffix regex"));

/// `Authors. Title. Venue` split of a flattened bibliography entry.
static AUTHOR_TITLE_VENUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*?\.\s)(.*?)(\.\s.*|$)").expect("bib entry regex"));

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| PasaError::Parse(format!("invalid selector {css}: {e}")))
}

fn clean_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_stop_section(title: &str) -> bool {
    let lower = title.to_lowercase();
    STOP_WORDS.iter().any(|w| lower.contains(w))
}

/// Pulls the title out of the text blocks of one bibliography entry.
pub fn parse_reference_title(blocks: &[String]) -> String {
    let blocks: Vec<String> = blocks.iter().map(|b| b.replace('\n', " ")).collect();
    if blocks.len() == 3 {
        return blocks[1].trim().to_string();
    }

    let joined = blocks.join(" ");
    let joined = YEAR_SUFFIX.replace_all(&joined, ".");
    AUTHOR_TITLE_VENUE
        .captures(&joined)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Bibliography item id (`bib.bib12`) -> reference title.
fn parse_bibliography(document: &Html) -> Result<HashMap<String, String>> {
    let item_sel = selector("ul.ltx_biblist > li")?;
    let block_sel = selector("span.ltx_bibblock")?;

    let mut references = HashMap::new();
    for item in document.select(&item_sel) {
        let Some(id) = item.value().attr("id") else {
            continue;
        };
        let blocks: Vec<String> = item.select(&block_sel).map(clean_text).collect();
        let title = parse_reference_title(&blocks);
        if !title.is_empty() {
            references.insert(id.to_string(), title);
        }
    }
    Ok(references)
}

/// Parses an ar5iv page into its section/citation skeleton.
///
/// Returns `Ok(None)` when the page is not an ar5iv rendering or carries no
/// cited references in its body.
pub fn parse_sections(html: &str) -> Result<Option<Sections>> {
    if !html.contains(AR5IV_HTML_URL) {
        return Ok(None);
    }

    let document = Html::parse_document(html);
    let references = parse_bibliography(&document)?;

    let section_sel = selector("section.ltx_section")?;
    let subsection_sel = selector("section.ltx_subsection")?;
    let h2_sel = selector("h2")?;
    let h3_sel = selector("h3")?;
    let cite_sel = selector("cite a.ltx_ref")?;

    // Section element -> skeleton key.
    let mut keys = HashMap::new();
    for section in document.select(&section_sel) {
        let Some(title) = section.select(&h2_sel).next().map(clean_text) else {
            continue;
        };
        if title.is_empty() || is_stop_section(&title) {
            continue;
        }
        for subsection in section.select(&subsection_sel) {
            let Some(sub_title) = subsection.select(&h3_sel).next().map(clean_text) else {
                continue;
            };
            if sub_title.is_empty() || is_stop_section(&sub_title) {
                continue;
            }
            keys.insert(subsection.id(), format!("{title} {sub_title}"));
        }
        keys.insert(section.id(), title);
    }

    let mut sections = Sections::new();
    for link in document.select(&cite_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(reference) = references.get(href.trim_start_matches('#')) else {
            continue;
        };
        let Some(key) = link.ancestors().find_map(|node| keys.get(&node.id())) else {
            continue;
        };
        let cited = sections.entry(key.clone()).or_default();
        if !cited.contains(reference) {
            cited.push(reference.clone());
        }
    }

    if sections.is_empty() {
        return Ok(None);
    }
    Ok(Some(sections))
}
