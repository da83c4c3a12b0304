pub mod command;
pub mod config;
pub mod error;
pub mod model;
pub mod paper;
pub mod source;

pub use command::{Command, CommandKind, CommandParser};
pub use config::{AgentConfig, AppConfig};
pub use error::{PasaError, Result};
pub use model::ModelClient;
pub use paper::{
    clamp_score, normalize_title, strip_version, ExpandStatus, FetchedPaper, NodeId, PaperGraph,
    PaperNode, PaperRecord, PaperSource, Scratch, Sections,
};
pub use source::{PaperRepository, SearchService};
