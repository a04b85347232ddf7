//! Menu catalog types
//!
//! Option categories are plain strings so that a menu file can introduce new
//! ones; the four categories the extractor understands are exposed as
//! constants.

use serde::{Deserialize, Serialize};

/// Option category names used by the bundled menu
pub mod categories {
    pub const TEMPERATURE: &str = "온도";
    pub const SIZE: &str = "크기";
    pub const CAFFEINE: &str = "카페인";
    pub const TOPPING: &str = "토핑";

    /// Order in which missing categories are asked about
    pub const CLARIFICATION_PRIORITY: [&str; 2] = [TEMPERATURE, SIZE];
}

/// A single selectable option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub name: String,
    #[serde(default)]
    pub price_adjustment: i64,
}

impl MenuOption {
    pub fn new(name: impl Into<String>, price_adjustment: i64) -> Self {
        Self {
            name: name.into(),
            price_adjustment,
        }
    }
}

/// Options of one category, in presentation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub category: String,
    pub options: Vec<MenuOption>,
}

impl OptionGroup {
    pub fn new(category: impl Into<String>, options: Vec<MenuOption>) -> Self {
        Self {
            category: category.into(),
            options,
        }
    }

    pub fn contains(&self, option_name: &str) -> bool {
        self.options.iter().any(|o| o.name == option_name)
    }
}

/// Catalog listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub base_price: i64,
    pub category: String,
}

/// Full menu item definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub base_price: i64,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_options: Vec<OptionGroup>,
    #[serde(default)]
    pub optional_options: Vec<OptionGroup>,
}

impl MenuItem {
    pub fn entry(&self) -> CatalogEntry {
        CatalogEntry {
            name: self.name.clone(),
            base_price: self.base_price,
            category: self.category.clone(),
        }
    }

    pub fn schema(&self) -> OptionsSchema {
        OptionsSchema {
            required: self.required_options.clone(),
            optional: self.optional_options.clone(),
            base_price: self.base_price,
        }
    }
}

/// Option schema of one menu item
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OptionsSchema {
    pub required: Vec<OptionGroup>,
    pub optional: Vec<OptionGroup>,
    pub base_price: i64,
}

impl OptionsSchema {
    /// Required categories none of whose options has been chosen, in schema order
    pub fn missing_required<S: AsRef<str>>(&self, chosen: &[S]) -> Vec<String> {
        self.required
            .iter()
            .filter(|group| !chosen.iter().any(|c| group.contains(c.as_ref())))
            .map(|group| group.category.clone())
            .collect()
    }

    /// Category an option name belongs to, searching required groups first
    pub fn category_of(&self, option_name: &str) -> Option<&str> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .find(|g| g.contains(option_name))
            .map(|g| g.category.as_str())
    }

    /// All groups, required first
    pub fn groups(&self) -> impl Iterator<Item = &OptionGroup> {
        self.required.iter().chain(self.optional.iter())
    }
}

/// Result of a fuzzy catalog lookup
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub name: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coffee_schema() -> OptionsSchema {
        OptionsSchema {
            required: vec![
                OptionGroup::new(
                    categories::TEMPERATURE,
                    vec![MenuOption::new("핫", 0), MenuOption::new("아이스", 500)],
                ),
                OptionGroup::new(
                    categories::SIZE,
                    vec![MenuOption::new("레귤러", 0), MenuOption::new("라지", 1000)],
                ),
            ],
            optional: vec![OptionGroup::new(
                categories::CAFFEINE,
                vec![MenuOption::new("일반", 0), MenuOption::new("디카페인", 500)],
            )],
            base_price: 4500,
        }
    }

    #[test]
    fn test_missing_required_in_schema_order() {
        let schema = coffee_schema();
        let none: [&str; 0] = [];
        assert_eq!(schema.missing_required(&none), vec!["온도", "크기"]);
        assert_eq!(schema.missing_required(&["아이스"]), vec!["크기"]);
        assert!(schema.missing_required(&["핫", "라지", "디카페인"]).is_empty());
    }

    #[test]
    fn test_optional_options_do_not_satisfy_required() {
        let schema = coffee_schema();
        assert_eq!(schema.missing_required(&["디카페인"]).len(), 2);
        assert_eq!(schema.category_of("디카페인"), Some("카페인"));
        assert_eq!(schema.category_of("휘핑크림 추가"), None);
    }
}
