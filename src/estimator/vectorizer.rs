//! TF-IDF text vectorizer
//!
//! The vocabulary and idf weights are fixed when the vectorizer is fitted
//! and saved as a JSON artifact. Terms outside the vocabulary are ignored
//! at transform time.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Artifact format version written by [`TfidfVectorizer::fit`]
pub const VECTORIZER_VERSION: u32 = 1;

static TOKEN: OnceLock<Regex> = OnceLock::new();

fn token_pattern() -> &'static Regex {
    // Two or more word characters; single letters are not tokens
    TOKEN.get_or_init(|| Regex::new(r"\b\w\w+\b").unwrap())
}

fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    token_pattern().find_iter(text).map(|m| m.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub version: u32,
    /// term -> column index
    pub vocabulary: BTreeMap<String, usize>,
    /// Smoothed inverse document frequency per column
    pub idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Fit on already-normalized documents.
    ///
    /// Keeps the `max_features` terms with the highest corpus frequency
    /// (ties broken alphabetically) and assigns columns in alphabetical
    /// order.
    pub fn fit(documents: &[String], max_features: usize) -> Self {
        let mut term_counts: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();

        for doc in documents {
            let mut seen: Vec<&str> = Vec::new();
            for token in tokenize(doc) {
                *term_counts.entry(token).or_insert(0) += 1;
                if !seen.contains(&token) {
                    seen.push(token);
                    *doc_freq.entry(token).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(&str, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);

        let mut terms: Vec<&str> = ranked.into_iter().map(|(t, _)| t).collect();
        terms.sort_unstable();

        let n_docs = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(terms.len());
        for (column, term) in terms.into_iter().enumerate() {
            let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term.to_string(), column);
        }

        Self {
            version: VECTORIZER_VERSION,
            vocabulary,
            idf,
        }
    }

    /// Number of output features
    pub fn feature_count(&self) -> usize {
        self.idf.len()
    }

    /// Vectorize a single normalized document.
    ///
    /// Returns an all-zero vector when no token is in the vocabulary.
    pub fn transform(&self, text: &str) -> Vec<f64> {
        let mut features = vec![0.0_f64; self.feature_count()];
        for token in tokenize(text) {
            if let Some(&column) = self.vocabulary.get(token) {
                if let Some(slot) = features.get_mut(column) {
                    *slot += 1.0;
                }
            }
        }

        for (value, idf) in features.iter_mut().zip(&self.idf) {
            *value *= idf;
        }

        let norm = features.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut features {
                *value /= norm;
            }
        }
        features
    }

    /// Check the artifact is internally consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.version != VECTORIZER_VERSION {
            return Err(format!(
                "unsupported vectorizer version {} (expected {})",
                self.version, VECTORIZER_VERSION
            ));
        }
        if self.vocabulary.len() != self.idf.len() {
            return Err(format!(
                "vocabulary has {} terms but idf has {} weights",
                self.vocabulary.len(),
                self.idf.len()
            ));
        }
        if let Some((term, column)) = self.vocabulary.iter().find(|(_, &c)| c >= self.idf.len()) {
            return Err(format!("term '{term}' points at missing column {column}"));
        }
        Ok(())
    }
}
