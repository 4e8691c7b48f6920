//! The normalized answer returned for every successful query.

use serde::{Deserialize, Serialize};

/// A report the engine attributes as supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Unique within one answer's citation list.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Relevance value as emitted by the engine. Direction is engine-defined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_readable_id: Option<String>,
}

impl Citation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            rank: None,
            summary: None,
            community: None,
            human_readable_id: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_rank(mut self, rank: f64) -> Self {
        self.rank = Some(rank);
        self
    }
}

/// Response body of `POST /query`.
///
/// `citations` is always serialized (possibly empty); `run_dir` is omitted
/// entirely when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Markdown answer text.
    pub answer: String,

    /// Citations in the order the service decided; clients must not re-sort.
    pub citations: Vec<Citation>,

    /// Engine run directory backing this answer. Operator diagnostics only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_dir: Option<String>,
}

impl Answer {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            citations: Vec::new(),
            run_dir: None,
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    pub fn with_run_dir(mut self, run_dir: impl Into<String>) -> Self {
        self.run_dir = Some(run_dir.into());
        self
    }
}
