//! Cosine-similarity ranking over the in-memory index
//!
//! A linear scan: every entry is scored against the query vector and the scores are
//! stable-sorted, so equal scores keep corpus order.

use crate::index::IndexEntry;

/// Cosine similarity in [-1, 1]. Mismatched lengths, zero vectors and overflowing
/// (non-finite) inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let score = dot / (norm_a * norm_b);
    if score.is_finite() {
        score.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// An index entry paired with its score against a query.
#[derive(Debug, Clone, Copy)]
pub struct Scored<'a> {
    pub entry: &'a IndexEntry,
    pub score: f32,
}

/// Top-`k` entries by cosine similarity, highest first. `k` below 1 is treated as 1.
pub fn rank<'a>(query: &[f32], entries: &'a [IndexEntry], k: usize) -> Vec<Scored<'a>> {
    if entries.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<Scored<'a>> = entries
        .iter()
        .map(|entry| Scored {
            entry,
            score: cosine_similarity(query, &entry.vector),
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k.max(1));
    scored
}

/// True when the best score clears `threshold`.
pub fn is_confident(results: &[Scored<'_>], threshold: f32) -> bool {
    results.first().is_some_and(|top| top.score > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityKind, Record};

    fn entry(name: &str, vector: Vec<f32>) -> IndexEntry {
        let record = Record::new(EntityKind::Drug, name, "drug_database");
        IndexEntry::new(record, format!("Drug: {}", name), vector)
    }

    #[test]
    fn test_cosine_symmetric() {
        let a = [0.3, -1.2, 4.0];
        let b = [2.0, 0.5, -0.7];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_cosine_scale_invariant() {
        let a = [0.3, -1.2, 4.0];
        let b = [2.0, 0.5, -0.7];
        let b2: Vec<f32> = b.iter().map(|x| x * 2.0).collect();
        let b_big: Vec<f32> = b.iter().map(|x| x * 1000.0).collect();
        assert!((cosine_similarity(&a, &b) - cosine_similarity(&a, &b2)).abs() < 1e-6);
        assert!((cosine_similarity(&a, &b) - cosine_similarity(&a, &b_big)).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_bounds_and_degenerate_inputs() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_rank_empty_corpus_returns_empty() {
        assert!(rank(&[1.0, 0.0], &[], 5).is_empty());
    }

    #[test]
    fn test_rank_orders_by_non_increasing_score() {
        let entries = vec![
            entry("a", vec![0.0, 1.0]),
            entry("b", vec![1.0, 0.0]),
            entry("c", vec![1.0, 1.0]),
            entry("d", vec![-1.0, 0.2]),
        ];
        let results = rank(&[1.0, 0.1], &entries, 10);

        assert_eq!(results.len(), 4);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(results[0].entry.record.name, "b");
        assert_eq!(results[3].entry.record.name, "d");
    }

    #[test]
    fn test_rank_ties_keep_corpus_order() {
        let entries = vec![
            entry("first", vec![1.0, 0.0]),
            entry("second", vec![2.0, 0.0]),
            entry("third", vec![0.5, 0.0]),
        ];
        let names: Vec<&str> = rank(&[1.0, 0.0], &entries, 3)
            .iter()
            .map(|s| s.entry.record.name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_truncates_and_clamps_k() {
        let entries = vec![
            entry("a", vec![1.0, 0.0]),
            entry("b", vec![0.9, 0.1]),
            entry("c", vec![0.0, 1.0]),
        ];
        assert_eq!(rank(&[1.0, 0.0], &entries, 2).len(), 2);
        assert_eq!(rank(&[1.0, 0.0], &entries, 0).len(), 1);
    }

    #[test]
    fn test_confidence_threshold_is_strict() {
        let entries = vec![entry("a", vec![1.0, 0.0])];
        let results = rank(&[1.0, 0.0], &entries, 1);
        assert!(is_confident(&results, 0.3));
        assert!(!is_confident(&results, 1.0));
        assert!(!is_confident(&[], 0.3));
    }

    #[test]
    fn test_overflowing_vectors_score_zero() {
        let huge = [f32::MAX, f32::MAX];
        assert_eq!(cosine_similarity(&huge, &huge), 0.0);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_rank_with_degenerate_entries_stays_ordered() {
        let entries = vec![
            entry("Overflow", vec![f32::MAX, f32::MAX]),
            entry("Match", vec![1.0, 1.0]),
            entry("Nan", vec![f32::NAN, 0.0]),
            entry("Opposite", vec![-1.0, -1.0]),
        ];
        let results = rank(&[1.0, 1.0], &entries, 10);

        let names: Vec<&str> = results.iter().map(|s| s.entry.record.name.as_str()).collect();
        assert_eq!(names, vec!["Match", "Overflow", "Nan", "Opposite"]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
