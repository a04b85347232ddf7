//! Option phrase extraction
//!
//! Each category is an ordered list of (option, pattern). Within a category
//! the first matching pattern wins, so negations are listed before the
//! additions they would otherwise be mistaken for. A second confirmation
//! pass recognises spoken size letters and indirect temperature cues, and
//! only fills categories the first pass left unset.

use kiosk_agent_core::categories;
use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical option names produced by the extractor
pub mod names {
    pub const HOT: &str = "핫";
    pub const ICED: &str = "아이스";
    pub const REGULAR: &str = "레귤러";
    pub const LARGE: &str = "라지";
    pub const CAFFEINATED: &str = "일반";
    pub const DECAF: &str = "디카페인";
    pub const WHIPPED_CREAM: &str = "휘핑크림 추가";
    pub const NO_WHIPPED_CREAM: &str = "휘핑크림 없음";
}

struct CategoryPatterns {
    category: &'static str,
    patterns: Vec<(&'static str, Regex)>,
}

type PatternTable<'a> = &'a [(&'static str, &'a [(&'static str, &'static str)])];

fn compile(table: PatternTable<'_>) -> Vec<CategoryPatterns> {
    table
        .iter()
        .map(|(category, entries)| CategoryPatterns {
            category: *category,
            patterns: entries
                .iter()
                .filter_map(|(option, pattern)| match Regex::new(pattern) {
                    Ok(regex) => Some((*option, regex)),
                    Err(e) => {
                        tracing::warn!("Failed to compile option pattern for {}: {}", option, e);
                        None
                    },
                })
                .collect(),
        })
        .collect()
}

static PRIMARY_PATTERNS: Lazy<Vec<CategoryPatterns>> = Lazy::new(|| {
    compile(&[
        (
            categories::TEMPERATURE,
            &[
                (names::HOT, r"(?i)따뜻|따듯|뜨겁|뜨거운|핫|hot|더운"),
                (names::ICED, r"(?i)차갑|차가운|차게|시원|아이스|ice"),
            ],
        ),
        (
            categories::SIZE,
            &[
                (names::LARGE, r"(?i)크게|큰|라지|라아지|large|l\s*사이즈|대형"),
                (
                    names::REGULAR,
                    r"(?i)작게|작은|스몰|small|s\s*사이즈|소형|중간|보통|medium|미디엄|m\s*사이즈|레귤러|기본",
                ),
            ],
        ),
        (
            categories::CAFFEINE,
            &[
                (names::DECAF, r"디카페인|디카페|카페인\s*없|카페인\s*제거"),
                (names::CAFFEINATED, r"일반|원래|카페인"),
            ],
        ),
        (
            categories::TOPPING,
            &[
                (
                    names::NO_WHIPPED_CREAM,
                    r"휘핑(?:크림)?\s*(?:없이|없음|빼)|크림\s*(?:없이|빼)|토핑\s*없이",
                ),
                (names::WHIPPED_CREAM, r"휘핑|크림\s*(?:추가|넣|올려)|토핑"),
            ],
        ),
    ])
});

static CONFIRMATION_PATTERNS: Lazy<Vec<CategoryPatterns>> = Lazy::new(|| {
    compile(&[
        (
            categories::SIZE,
            &[
                (
                    names::LARGE,
                    r"(?i)(?:^|\s)(?:l|엘)(?:\s*사이즈)?(?:으로|로|이요|요)?(?:\s|[.!?,]|$)",
                ),
                (
                    names::REGULAR,
                    r"(?i)(?:^|\s)(?:s|에스|m|엠)(?:\s*사이즈)?(?:으로|로|이요|요)?(?:\s|[.!?,]|$)",
                ),
            ],
        ),
        (
            categories::TEMPERATURE,
            &[
                (names::HOT, r"데운|데워|뜨끈"),
                (names::ICED, r"얼음|냉"),
            ],
        ),
    ])
});

/// Canonical option names mentioned in `text`, at most one per category,
/// ordered temperature, size, caffeine, topping.
pub fn extract_options(text: &str) -> Vec<String> {
    let mut found: Vec<(&'static str, &'static str)> = Vec::new();

    for group in PRIMARY_PATTERNS.iter() {
        if let Some((option, _)) = group.patterns.iter().find(|(_, re)| re.is_match(text)) {
            found.push((group.category, *option));
        }
    }

    for group in CONFIRMATION_PATTERNS.iter() {
        if found.iter().any(|(category, _)| *category == group.category) {
            continue;
        }
        if let Some((option, _)) = group.patterns.iter().find(|(_, re)| re.is_match(text)) {
            found.push((group.category, *option));
        }
    }

    let rank = |category: &str| {
        [
            categories::TEMPERATURE,
            categories::SIZE,
            categories::CAFFEINE,
            categories::TOPPING,
        ]
        .iter()
        .position(|c| *c == category)
        .unwrap_or(usize::MAX)
    };
    found.sort_by_key(|(category, _)| rank(*category));
    found.into_iter().map(|(_, option)| option.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_and_size() {
        assert_eq!(extract_options("아이스 라지로 주세요"), vec!["아이스", "라지"]);
        assert_eq!(extract_options("따뜻하게 작은 사이즈로"), vec!["핫", "레귤러"]);
        assert_eq!(extract_options("ICE large"), vec!["아이스", "라지"]);
    }

    #[test]
    fn test_first_pattern_in_category_wins() {
        // Both temperature cues present: hot is listed first
        assert_eq!(extract_options("따뜻한 거 말고 아이스"), vec!["핫"]);
    }

    #[test]
    fn test_topping_negation_checked_first() {
        assert_eq!(extract_options("휘핑 빼주세요"), vec!["휘핑크림 없음"]);
        assert_eq!(extract_options("휘핑크림 없이요"), vec!["휘핑크림 없음"]);
        assert_eq!(extract_options("휘핑크림 추가해주세요"), vec!["휘핑크림 추가"]);
    }

    #[test]
    fn test_caffeine() {
        assert_eq!(extract_options("디카페인으로 변경할게요"), vec!["디카페인"]);
        assert_eq!(extract_options("일반 원두로 해주세요"), vec!["일반"]);
    }

    #[test]
    fn test_spoken_size_letters() {
        assert_eq!(extract_options("엘 사이즈로"), vec!["라지"]);
        assert_eq!(extract_options("L로 주세요"), vec!["라지"]);
        assert_eq!(extract_options("에스요"), vec!["레귤러"]);
        // Not a size letter
        assert!(extract_options("에스프레소").is_empty());
    }

    #[test]
    fn test_confirmation_does_not_override() {
        assert_eq!(extract_options("얼음 넣어서"), vec!["아이스"]);
        assert_eq!(extract_options("데워서 주세요"), vec!["핫"]);
        // Primary pass already chose hot
        assert_eq!(extract_options("따뜻하게 얼음 없이"), vec!["핫"]);
    }

    #[test]
    fn test_no_options() {
        assert!(extract_options("아메리카노 주세요").is_empty());
        assert!(extract_options("").is_empty());
    }
}
