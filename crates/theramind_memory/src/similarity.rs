//! TF-vector text similarity for the memory layer.
//!
//! A cheap, explainable continuity mechanism, not a learned embedding:
//! lower-cased word tokens, raw counts, L2 normalization, cosine over the
//! vocabulary intersection. Vectors are ephemeral and recomputed per query.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Term-frequency vector, L2-normalized at construction.
pub type TfVector = HashMap<String, f64>;

static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-zA-Z']{2,}\b").unwrap());

/// Lower-cased word tokens of length ≥ 2 (apostrophes kept, so "can't"
/// stays one token).
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    RE_WORD
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Build an L2-normalized term-frequency vector.
pub fn build_tf_vector(text: &str) -> TfVector {
    let mut vec: TfVector = HashMap::new();
    for token in tokenize(text) {
        *vec.entry(token).or_insert(0.0) += 1.0;
    }
    let norm = vec.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    for v in vec.values_mut() {
        *v /= norm;
    }
    vec
}

/// Dot product over the vocabulary intersection. With normalized inputs this
/// is cosine similarity. Iterates the smaller map.
pub fn cosine_sim(a: &TfVector, b: &TfVector) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (small, large) = if a.len() > b.len() { (b, a) } else { (a, b) };
    small
        .iter()
        .filter_map(|(k, v)| large.get(k).map(|w| v * w))
        .sum()
}
