//! Knowledge base retrieval for the planning oracle
//!
//! Each `*.txt` file in the knowledge base directory is one document named
//! after its file stem. Documents are ranked by how many distinct task tokens
//! they contain.

use std::collections::BTreeSet;
use std::path::Path;

use tokio::fs;
use tracing::{debug, warn};

/// Placeholder returned when the knowledge base holds nothing
pub const EMPTY_KNOWLEDGE: (&str, &str) = ("default", "No KB available.");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub text: String,
    tokens: BTreeSet<String>,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = tokenize(&text);
        Self {
            name: name.into(),
            text,
            tokens,
        }
    }

    fn score(&self, query: &BTreeSet<String>) -> usize {
        query.intersection(&self.tokens).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    documents: Vec<Document>,
}

impl KnowledgeBase {
    pub fn new(mut documents: Vec<Document>) -> Self {
        documents.sort_by(|a, b| a.name.cmp(&b.name));
        Self { documents }
    }

    /// Load every non-empty `*.txt` file in `dir`.
    ///
    /// A missing directory yields an empty knowledge base.
    pub async fn load(dir: &Path) -> std::io::Result<Self> {
        if !fs::try_exists(dir).await? {
            warn!(dir = %dir.display(), "knowledge base directory not found");
            return Ok(Self::default());
        }

        let mut documents = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let text = fs::read_to_string(&path).await?;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            documents.push(Document::new(name, text));
        }
        debug!(dir = %dir.display(), documents = documents.len(), "loaded knowledge base");
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Top `top_k` documents for `query` as `(name, text)`, best first.
    ///
    /// Ties keep name order. An empty knowledge base answers with
    /// [`EMPTY_KNOWLEDGE`].
    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<(String, String)> {
        if self.documents.is_empty() {
            let (name, text) = EMPTY_KNOWLEDGE;
            return vec![(name.to_string(), text.to_string())];
        }
        let query = tokenize(query);
        let mut ranked: Vec<(usize, &Document)> = self
            .documents
            .iter()
            .map(|doc| (doc.score(&query), doc))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        ranked
            .into_iter()
            .take(top_k)
            .map(|(_, doc)| (doc.name.clone(), doc.text.clone()))
            .collect()
    }
}

/// Render retrieved documents as the planner's context block
pub fn format_context(documents: &[(String, String)]) -> String {
    documents
        .iter()
        .map(|(name, text)| format!("{}:\n{}", name.to_uppercase(), text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 1)
        .map(str::to_lowercase)
        .collect()
}
