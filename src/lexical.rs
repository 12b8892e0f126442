//! Lexical fallback index for retrieval.
//!
//! Embedding similarity handles well-formed natural-language queries, but a
//! short keyword query (a product name, an acronym) often fails the cosine
//! threshold. This index answers those from the same chunk texts: tokens are
//! matched exactly, by prefix, or within a small Levenshtein distance, and
//! candidates are ranked by an internal relevance score.

use rustc_hash::FxHashMap;

/// A chunk text registered in the lexical index, keyed by insertion order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexicalDocument {
    pub id: usize,
    pub text: String,
}

/// A ranked match from [`LexicalIndex::search`].
#[derive(Clone, Debug, PartialEq)]
pub struct LexicalMatch {
    pub id: usize,
    pub text: String,
    pub score: f32,
}

/// In-memory inverted index over whitespace/word-boundary tokens.
///
/// Built once per page, alongside the embeddings, from the same chunk
/// sequence; ids auto-increment in chunk order so both derived structures
/// stay in sync.
///
/// # Examples
///
/// ```
/// use pagelens::lexical::LexicalIndex;
///
/// let mut index = LexicalIndex::new();
/// index.add("The Framework Laptop ships with modular ports.");
/// index.add("Battery life depends on the expansion cards.");
///
/// let best = index.best_match("framwork").unwrap();
/// assert!(best.text.contains("Framework"));
/// ```
#[derive(Debug, Default)]
pub struct LexicalIndex {
    documents: Vec<LexicalDocument>,
    // token -> (doc id -> occurrences)
    postings: FxHashMap<String, FxHashMap<usize, u32>>,
}

const EXACT_WEIGHT: f32 = 3.0;
const PREFIX_WEIGHT: f32 = 1.5;
const FUZZY_WEIGHT: f32 = 1.0;

impl LexicalIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Add a document; ids auto-increment in insertion order.
    pub fn add(&mut self, text: impl Into<String>) -> usize {
        let id = self.documents.len();
        let text = text.into();
        for token in tokenize(&text) {
            *self.postings.entry(token).or_default().entry(id).or_insert(0) += 1;
        }
        self.documents.push(LexicalDocument { id, text });
        id
    }

    /// Search for documents matching `query`, ranked by relevance.
    ///
    /// Every query token contributes the best of its exact, prefix, and
    /// fuzzy match weights per document; scores are summed across tokens and
    /// dampened by document length so short precise chunks outrank long
    /// rambling ones.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<LexicalMatch> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() || self.documents.is_empty() {
            return Vec::new();
        }

        let mut scores: FxHashMap<usize, f32> = FxHashMap::default();
        for query_token in &query_tokens {
            for (token, docs) in &self.postings {
                let weight = match_weight(query_token, token);
                if weight <= 0.0 {
                    continue;
                }
                for (&doc_id, &count) in docs {
                    *scores.entry(doc_id).or_insert(0.0) += weight * (count as f32).sqrt();
                }
            }
        }

        let mut matches: Vec<LexicalMatch> = scores
            .into_iter()
            .map(|(id, raw)| {
                let doc = &self.documents[id];
                let dampen = (doc.text.len() as f32).max(1.0).ln().max(1.0);
                LexicalMatch {
                    id,
                    text: doc.text.clone(),
                    score: raw / dampen,
                }
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches
    }

    /// The single best match for `query`, if any token matched at all.
    #[must_use]
    pub fn best_match(&self, query: &str) -> Option<LexicalMatch> {
        self.search(query).into_iter().next()
    }
}

/// Lowercased word-boundary tokenization.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

/// Weight of a query token against an indexed token, 0.0 for no match.
fn match_weight(query: &str, indexed: &str) -> f32 {
    if query == indexed {
        return EXACT_WEIGHT;
    }
    if indexed.starts_with(query) && query.len() >= 2 {
        return PREFIX_WEIGHT;
    }
    let tolerance = edit_tolerance(query.chars().count());
    if tolerance == 0 {
        return 0.0;
    }
    let distance = strsim::levenshtein(query, indexed);
    if distance <= tolerance {
        FUZZY_WEIGHT / (1.0 + distance as f32)
    } else {
        0.0
    }
}

/// Edit-distance tolerance grows with token length; short tokens match
/// exactly or not at all.
fn edit_tolerance(len: usize) -> usize {
    match len {
        0..=3 => 0,
        4..=7 => 1,
        _ => 2,
    }
}
