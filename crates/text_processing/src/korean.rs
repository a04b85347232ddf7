//! Korean Language Utilities
//!
//! Particle stripping, number words and text normalization shared by the
//! classifier and the extractor.

use unicode_segmentation::UnicodeSegmentation;

/// Postpositional particles that may trail a menu name
pub const PARTICLES: [&str; 21] = [
    "을", "를", "이", "가", "은", "는", "와", "과", "로", "으로", "의", "에", "에서", "으로부터",
    "부터", "까지", "하고", "랑", "이랑", "만", "도",
];

/// Strip the longest particle the word ends with.
///
/// The word is returned unchanged when no particle matches or when stripping
/// would leave nothing.
///
/// # Examples
/// ```
/// use kiosk_agent_text_processing::korean::strip_particle;
/// assert_eq!(strip_particle("아메리카노를"), "아메리카노");
/// assert_eq!(strip_particle("카페라떼로"), "카페라떼");
/// assert_eq!(strip_particle("케이크에서"), "케이크");
/// assert_eq!(strip_particle("를"), "를");
/// ```
pub fn strip_particle(word: &str) -> &str {
    let word = word.trim();
    PARTICLES
        .iter()
        .filter_map(|particle| word.strip_suffix(particle).map(|rest| (particle.len(), rest)))
        .filter(|(_, rest)| !rest.trim().is_empty())
        .max_by_key(|(len, _)| *len)
        .map(|(_, rest)| rest.trim_end())
        .unwrap_or(word)
}

/// Convert a Korean quantity expression to a count
///
/// Accepts native number words with or without a counter (잔, 개, 컵) and
/// digit counts. Whitespace inside the expression is ignored.
///
/// # Examples
/// ```
/// use kiosk_agent_text_processing::korean::word_to_quantity;
/// assert_eq!(word_to_quantity("하나"), Some(1));
/// assert_eq!(word_to_quantity("두잔"), Some(2));
/// assert_eq!(word_to_quantity("세 잔"), Some(3));
/// assert_eq!(word_to_quantity("12컵"), Some(12));
/// assert_eq!(word_to_quantity("많이"), None);
/// ```
pub fn word_to_quantity(word: &str) -> Option<u32> {
    let compact: String = word.chars().filter(|c| !c.is_whitespace()).collect();

    let digits = compact.trim_end_matches(|c: char| matches!(c, '잔' | '개' | '컵'));
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return digits.parse().ok();
    }

    match compact.as_str() {
        "하나" | "한" | "한개" | "한잔" | "한컵" => Some(1),
        "둘" | "두" | "두개" | "두잔" | "두컵" => Some(2),
        "셋" | "세" | "세개" | "세잔" | "세컵" => Some(3),
        "넷" | "네" | "네개" | "네잔" | "네컵" => Some(4),
        "다섯" | "다섯개" | "다섯잔" | "다섯컵" => Some(5),
        _ => None,
    }
}

/// Lowercase, trim and collapse internal whitespace
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalization used for statistical features: punctuation other than
/// `? ! . ,` is removed before whitespace is collapsed.
pub fn preprocess(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '?' | '!' | '.' | ',' | '_'))
        .collect();
    normalize(&kept)
}

/// Words of the normalized text
pub fn words(text: &str) -> Vec<&str> {
    text.unicode_words().collect()
}

/// Particle-stripped words of at least `min_chars` characters
pub fn content_tokens(text: &str, min_chars: usize) -> Vec<String> {
    text.unicode_words()
        .filter(|w| w.chars().count() >= min_chars)
        .map(|w| strip_particle(w).to_string())
        .collect()
}
