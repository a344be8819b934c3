//! Cross-document coherence
//!
//! Each text becomes a TF-IDF vector (raw term counts, smoothed idf
//! `ln((1 + n) / (1 + df)) + 1`, L2-normalized; tokens are runs of two or
//! more word characters). The coherence score is the mean cosine similarity
//! over all unordered document pairs, bucketed into a consistency level.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherenceResult {
    pub coherence_score: f64,
    pub consistency_level: String,
    pub confidence: f64,
}

/// (upper bound exclusive, level, confidence); the last bucket includes 1.0
const LEVELS: [(f64, &str, f64); 5] = [
    (0.2, "Very Low", 0.1),
    (0.4, "Low", 0.3),
    (0.6, "Medium", 0.5),
    (0.8, "High", 0.7),
    (f64::INFINITY, "Very High", 0.9),
];

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("valid regex"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("valid regex"))
}

/// Strip everything but ASCII letters, digits and whitespace, collapse
/// whitespace, lowercase.
pub fn preprocess_text(text: &str) -> String {
    let stripped = non_alphanumeric().replace_all(text, "");
    let collapsed = whitespace_run().replace_all(&stripped, " ");
    collapsed.trim().to_lowercase()
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// One L2-normalized sparse TF-IDF vector per document
fn tfidf_vectors(documents: &[String]) -> Vec<HashMap<String, f64>> {
    let counts: Vec<HashMap<String, f64>> = documents
        .iter()
        .map(|doc| {
            let mut tf = HashMap::new();
            for t in tokenize(doc) {
                *tf.entry(t).or_insert(0.0) += 1.0;
            }
            tf
        })
        .collect();

    let mut df: HashMap<&str, f64> = HashMap::new();
    for tf in &counts {
        for term in tf.keys() {
            *df.entry(term.as_str()).or_insert(0.0) += 1.0;
        }
    }

    let n = documents.len() as f64;
    let idf: HashMap<&str, f64> = df
        .into_iter()
        .map(|(term, df)| (term, ((1.0 + n) / (1.0 + df)).ln() + 1.0))
        .collect();

    counts
        .iter()
        .map(|tf| {
            let mut v: HashMap<String, f64> = tf
                .iter()
                .map(|(term, count)| (term.clone(), count * idf[term.as_str()]))
                .collect();
            let norm = v.values().map(|x| x * x).sum::<f64>().sqrt();
            if norm > 0.0 {
                v.values_mut().for_each(|x| *x /= norm);
            }
            v
        })
        .collect()
}

fn dot(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, x)| large.get(term).map(|y| x * y))
        .sum()
}

fn level_for(score: f64) -> (&'static str, f64) {
    LEVELS
        .iter()
        .find(|(upper, _, _)| score < *upper)
        .map(|(_, level, confidence)| (*level, *confidence))
        .unwrap_or(("Very High", 0.9))
}

/// Mean pairwise cosine similarity of the documents' TF-IDF vectors.
/// Fewer than two documents are trivially coherent.
pub fn analyze_text_coherence(documents: &[String]) -> CoherenceResult {
    if documents.len() < 2 {
        return CoherenceResult {
            coherence_score: 1.0,
            consistency_level: "High".to_string(),
            confidence: 0.9,
        };
    }

    let vectors = tfidf_vectors(documents);

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            total += dot(&vectors[i], &vectors[j]);
            pairs += 1;
        }
    }

    let score = (total / pairs as f64).clamp(0.0, 1.0);
    let (level, confidence) = level_for(score);

    CoherenceResult {
        coherence_score: score,
        consistency_level: level.to_string(),
        confidence,
    }
}
