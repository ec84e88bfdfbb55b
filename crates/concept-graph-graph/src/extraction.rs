//! Association extraction from free text.
//!
//! Text is split into sentences, each sentence into short phrase chunks at
//! punctuation and clause connectives. Tokens inside a chunk are linked to
//! their next `window` neighbors in both directions (`CoOccurrence`), and the
//! first token of each chunk links to the first token of the next chunk of
//! the same sentence (`Semantic`). Every token contributes at most
//! `2 * window` edges and every chunk at most one more, so the plan grows
//! linearly with the document.

use std::collections::HashSet;

use concept_graph_core::config::ExtractionConfig;
use concept_graph_core::tokenize;
use concept_graph_core::types::AssociationType;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SENTENCE_BREAKS: &[char] = &['.', '!', '?', ';', '\n'];

const CLAUSE_BREAKS: &[char] = &[',', ':', '(', ')', '"', '[', ']'];

const CONNECTIVES: &[&str] = &[
    "and", "because", "but", "or", "so", "that", "then", "which", "while",
];

/// One directed edge between two extracted concepts, by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlannedAssociation {
    pub source: String,
    pub target: String,
    pub assoc_type: AssociationType,
}

/// Concepts and associations to learn for a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionPlan {
    /// Distinct normalized tokens in first-appearance order.
    pub concepts: Vec<String>,
    /// Distinct associations in discovery order.
    pub associations: Vec<PlannedAssociation>,
    /// Tokens across all chunks, duplicates included.
    pub token_count: usize,
    pub chunk_count: usize,
}

impl ExtractionPlan {
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Upper bound on `associations.len()` for this plan's size.
    pub fn edge_bound(&self, window: usize) -> usize {
        2 * window * self.token_count + self.chunk_count
    }
}

/// Split `text` into sentences, each a list of token chunks.
fn chunk_sentences(text: &str, max_chunk_tokens: usize) -> Vec<Vec<Vec<String>>> {
    let mut sentences = Vec::new();
    for sentence in text.split(SENTENCE_BREAKS) {
        let mut chunks: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for clause in sentence.split(CLAUSE_BREAKS) {
            close_chunk(&mut chunks, &mut current);
            for word in clause.split_whitespace() {
                let bare = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
                if CONNECTIVES.contains(&bare.as_str()) {
                    close_chunk(&mut chunks, &mut current);
                    continue;
                }
                for token in tokenize(word) {
                    current.push(token);
                    if current.len() >= max_chunk_tokens {
                        close_chunk(&mut chunks, &mut current);
                    }
                }
            }
        }
        close_chunk(&mut chunks, &mut current);
        if !chunks.is_empty() {
            sentences.push(chunks);
        }
    }
    sentences
}

fn close_chunk(chunks: &mut Vec<Vec<String>>, current: &mut Vec<String>) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }
}

#[derive(Default)]
struct PlanBuilder {
    plan: ExtractionPlan,
    seen_concepts: HashSet<String>,
    seen_edges: HashSet<PlannedAssociation>,
}

impl PlanBuilder {
    fn concept(&mut self, token: &str) {
        if self.seen_concepts.insert(token.to_string()) {
            self.plan.concepts.push(token.to_string());
        }
    }

    fn edge(&mut self, source: &str, target: &str, assoc_type: AssociationType) {
        if source == target {
            return;
        }
        let edge = PlannedAssociation {
            source: source.to_string(),
            target: target.to_string(),
            assoc_type,
        };
        if self.seen_edges.insert(edge.clone()) {
            self.plan.associations.push(edge);
        }
    }
}

/// Build an [`ExtractionPlan`] for `text`.
///
/// # Example
///
/// ```rust
/// use concept_graph_core::config::ExtractionConfig;
/// use concept_graph_graph::extraction::extract_associations;
///
/// let plan = extract_associations("Heat melts ice", &ExtractionConfig::default());
/// assert_eq!(plan.concepts, vec!["heat", "melts", "ice"]);
/// assert_eq!(plan.associations.len(), 6);
/// ```
pub fn extract_associations(text: &str, config: &ExtractionConfig) -> ExtractionPlan {
    let max_chunk_tokens = config.max_chunk_tokens.max(1);
    let mut builder = PlanBuilder::default();

    for chunks in chunk_sentences(text, max_chunk_tokens) {
        for chunk in &chunks {
            builder.plan.chunk_count += 1;
            builder.plan.token_count += chunk.len();
            for (i, token) in chunk.iter().enumerate() {
                builder.concept(token);
                for next in chunk.iter().skip(i + 1).take(config.window) {
                    builder.edge(token, next, AssociationType::CoOccurrence);
                    builder.edge(next, token, AssociationType::CoOccurrence);
                }
            }
        }
        for pair in chunks.windows(2) {
            builder.edge(&pair[0][0], &pair[1][0], AssociationType::Semantic);
        }
    }

    let plan = builder.plan;
    debug!(
        concepts = plan.concepts.len(),
        associations = plan.associations.len(),
        chunks = plan.chunk_count,
        "Extracted associations"
    );
    plan
}
