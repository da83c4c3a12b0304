use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Section name -> raw citation strings found in that section.
pub type Sections = BTreeMap<String, Vec<String>>;

/// Index of a node inside a [`PaperGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// Where a node came from. Serialized as `Root`, `Search:<provenance>` or
/// `Expand:<provenance>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PaperSource {
    Root,
    Search(String),
    Expand(String),
}

impl fmt::Display for PaperSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaperSource::Root => write!(f, "Root"),
            PaperSource::Search(p) => write!(f, "Search:{p}"),
            PaperSource::Expand(p) => write!(f, "Expand:{p}"),
        }
    }
}

impl From<PaperSource> for String {
    fn from(source: PaperSource) -> Self {
        source.to_string()
    }
}

impl TryFrom<String> for PaperSource {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if value == "Root" {
            return Ok(PaperSource::Root);
        }
        match value.split_once(':') {
            Some(("Search", p)) => Ok(PaperSource::Search(p.to_string())),
            Some(("Expand", p)) => Ok(PaperSource::Expand(p.to_string())),
            _ => Err(format!("unknown paper source: {value}")),
        }
    }
}

/// Outcome of trying to expand a paper during one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandStatus {
    Success,
    NotExpanded,
    FetchError,
}

/// Auxiliary per-node metadata. Provenance lists are only filled on the root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scratch {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub touched_ids: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crawled_papers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_papers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answer: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<ExpandStatus>,
}

/// A paper as returned by a search service or paper repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedPaper {
    pub external_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub sections: Option<Sections>,
    /// Provenance tag, e.g. `arxiv` or `local_paper_db`.
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct PaperNode {
    pub title: String,
    pub external_id: Option<String>,
    pub depth: i32,
    pub children: BTreeMap<String, Vec<NodeId>>,
    pub abstract_text: String,
    pub sections: Option<Sections>,
    pub source: PaperSource,
    relevance_score: f64,
    pub scratch: Scratch,
}

impl PaperNode {
    /// The question node every run starts from.
    pub fn root(question: &str) -> Self {
        Self {
            title: question.to_string(),
            external_id: None,
            depth: -1,
            children: BTreeMap::new(),
            abstract_text: String::new(),
            sections: None,
            source: PaperSource::Root,
            relevance_score: 0.0,
            scratch: Scratch::default(),
        }
    }

    /// Builds a scored node from a fetched paper. The score is fixed for the
    /// lifetime of the node.
    pub fn from_paper(paper: FetchedPaper, depth: i32, source: PaperSource, score: f64) -> Self {
        Self {
            title: paper.title,
            external_id: Some(paper.external_id),
            depth,
            children: BTreeMap::new(),
            abstract_text: paper.abstract_text,
            sections: paper.sections,
            source,
            relevance_score: clamp_score(score),
            scratch: Scratch::default(),
        }
    }

    pub fn relevance_score(&self) -> f64 {
        self.relevance_score
    }
}

/// Arena owning every node of a run. Children refer to nodes by [`NodeId`],
/// so links can only point at nodes created earlier and the graph stays
/// acyclic.
#[derive(Debug, Clone)]
pub struct PaperGraph {
    nodes: Vec<PaperNode>,
}

impl PaperGraph {
    pub fn new(question: &str) -> Self {
        Self {
            nodes: vec![PaperNode::root(question)],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &PaperNode {
        &self.nodes[0]
    }

    pub fn root_mut(&mut self) -> &mut PaperNode {
        &mut self.nodes[0]
    }

    pub fn get(&self, id: NodeId) -> Option<&PaperNode> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut PaperNode> {
        self.nodes.get_mut(id.0)
    }

    /// Ensures `parent` has an edge called `label`, even if it stays empty.
    pub fn open_edge(&mut self, parent: NodeId, label: &str) {
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.entry(label.to_string()).or_default();
        }
    }

    /// Adds `child` to the arena and links it under `parent[label]`.
    pub fn attach(&mut self, parent: NodeId, label: &str, child: PaperNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(child);
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.entry(label.to_string()).or_default().push(id);
        }
        id
    }

    /// Serializable snapshot of the subtree rooted at `id`.
    pub fn record(&self, id: NodeId) -> Option<PaperRecord> {
        self.nodes.get(id.0).map(|node| self.node_record(node))
    }

    /// Serializable snapshot of the whole graph.
    pub fn root_record(&self) -> PaperRecord {
        self.node_record(self.root())
    }

    fn node_record(&self, node: &PaperNode) -> PaperRecord {
        let children = node
            .children
            .iter()
            .map(|(label, ids)| {
                let records = ids.iter().filter_map(|c| self.record(*c)).collect();
                (label.clone(), records)
            })
            .collect();

        PaperRecord {
            title: node.title.clone(),
            external_id: node.external_id.clone(),
            depth: node.depth,
            children,
            abstract_text: node.abstract_text.clone(),
            sections: node.sections.clone(),
            source: node.source.clone(),
            relevance_score: node.relevance_score,
            scratch: node.scratch.clone(),
        }
    }
}

/// Recursive, serializable form of a node and everything below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub external_id: Option<String>,
    pub depth: i32,
    #[serde(default)]
    pub children: BTreeMap<String, Vec<PaperRecord>>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub sections: Option<Sections>,
    pub source: PaperSource,
    pub relevance_score: f64,
    #[serde(default)]
    pub scratch: Scratch,
}

impl PaperRecord {
    /// Breadth-first list of every record in this subtree, self first.
    pub fn descendants(&self) -> Vec<&PaperRecord> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([self]);
        while let Some(record) = queue.pop_front() {
            out.push(record);
            for children in record.children.values() {
                queue.extend(children.iter());
            }
        }
        out
    }
}

/// Pins a model score into `[0, 1]`. Non-finite scores count as 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Lowercased letters only. Used as the cache key for local paper files and
/// for comparing titles across sources.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Drops a trailing arXiv version suffix: `2307.00235v2` -> `2307.00235`,
/// `solv-int/9901001v1` -> `solv-int/9901001`.
pub fn strip_version(external_id: &str) -> &str {
    match external_id.rsplit_once('v') {
        Some((base, version))
            if !base.is_empty()
                && !version.is_empty()
                && version.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => external_id,
    }
}
