//! Menu name similarity
//!
//! Shared by the catalog's fuzzy lookup and the order extractor so that both
//! score candidates the same way.

use std::collections::HashSet;

/// Similarity of two names in [0, 1].
///
/// When one string contains the other the score is the ratio of their
/// character counts; otherwise it is the Jaccard overlap of their
/// whitespace-separated word sets. Comparison is case-insensitive.
///
/// ```
/// use kiosk_agent_core::similarity::name_similarity;
/// assert_eq!(name_similarity("아메리카노", "아메리카노"), 1.0);
/// assert!((name_similarity("아메리카", "아메리카노") - 0.8).abs() < 1e-6);
/// assert_eq!(name_similarity("티라미수", "카페라떼"), 0.0);
/// ```
pub fn name_similarity(a: &str, b: &str) -> f32 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    if a.contains(&b) || b.contains(&a) {
        let len_a = a.chars().count() as f32;
        let len_b = b.chars().count() as f32;
        return len_a.min(len_b) / len_a.max(len_b);
    }

    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    words_a.intersection(&words_b).count() as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_ratio() {
        assert!((name_similarity("아메", "아메리카노") - 0.4).abs() < 1e-6);
        assert!((name_similarity("아메리카노를", "아메리카노") - 5.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_word_overlap() {
        // {그린티, 라떼} vs {라떼, 주세요}: one shared word out of three
        let score = name_similarity("그린티 라떼", "라떼 주세요");
        assert!((score - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(name_similarity("Latte", "latte"), 1.0);
    }

    #[test]
    fn test_empty() {
        assert_eq!(name_similarity("", "아메리카노"), 0.0);
    }
}
