//! Menu configuration and the in-memory catalog
//!
//! The menu is loaded once from YAML (or JSON) and served read-only through
//! [`StaticMenuCatalog`], which implements the core `MenuCatalog` trait.

use std::collections::HashMap;
use std::path::Path;

use kiosk_agent_core::similarity::name_similarity;
use kiosk_agent_core::{
    categories, CatalogEntry, Error, FuzzyMatch, MenuCatalog, MenuItem, MenuOption, OptionGroup,
    Result,
};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Menu file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuConfig {
    pub items: Vec<MenuItem>,
}

impl MenuConfig {
    /// Load from a YAML or JSON file, chosen by extension
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.display(), e)))?;

        let config: MenuConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?,
            _ => serde_yaml::from_str(&content)
                .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.items.is_empty() {
            return Err(ConfigError::MissingField("items".to_string()));
        }
        let mut seen = HashMap::new();
        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "items.name".to_string(),
                    message: "Menu item name must not be empty".to_string(),
                });
            }
            if item.base_price < 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("items.{}.base_price", item.name),
                    message: format!("Must be non-negative, got {}", item.base_price),
                });
            }
            if seen.insert(item.name.to_lowercase(), ()).is_some() {
                return Err(ConfigError::InvalidValue {
                    field: "items.name".to_string(),
                    message: format!("Duplicate menu item '{}'", item.name),
                });
            }
        }
        Ok(())
    }

    /// The café menu the kiosk ships with
    pub fn cafe_default() -> Self {
        let temperature = OptionGroup::new(
            categories::TEMPERATURE,
            vec![MenuOption::new("핫", 0), MenuOption::new("아이스", 500)],
        );
        let size = OptionGroup::new(
            categories::SIZE,
            vec![MenuOption::new("레귤러", 0), MenuOption::new("라지", 1000)],
        );
        let caffeine = OptionGroup::new(
            categories::CAFFEINE,
            vec![MenuOption::new("일반", 0), MenuOption::new("디카페인", 500)],
        );
        let topping = OptionGroup::new(
            categories::TOPPING,
            vec![
                MenuOption::new("휘핑크림 없음", 0),
                MenuOption::new("휘핑크림 추가", 500),
            ],
        );

        let drink = |name: &str, price: i64, category: &str, description: &str, extra: &OptionGroup| {
            MenuItem {
                name: name.to_string(),
                base_price: price,
                category: category.to_string(),
                description: description.to_string(),
                required_options: vec![temperature.clone(), size.clone()],
                optional_options: vec![extra.clone()],
            }
        };
        let dessert = |name: &str, price: i64, description: &str| MenuItem {
            name: name.to_string(),
            base_price: price,
            category: "디저트".to_string(),
            description: description.to_string(),
            required_options: Vec::new(),
            optional_options: Vec::new(),
        };

        Self {
            items: vec![
                drink("아메리카노", 4500, "커피", "진한 에스프레소에 물을 더한 커피", &caffeine),
                drink("카페라떼", 5000, "커피", "에스프레소와 스팀 밀크", &caffeine),
                drink("그린티 라떼", 5500, "티", "말차와 우유", &topping),
                drink("캐모마일", 4000, "티", "은은한 캐모마일 허브티", &topping),
                dessert("티라미수", 6500, "마스카포네 치즈 케이크"),
                dessert("치즈케이크", 6000, "뉴욕 스타일 치즈케이크"),
            ],
        }
    }
}

/// In-memory `MenuCatalog`
#[derive(Debug, Clone)]
pub struct StaticMenuCatalog {
    items: Vec<MenuItem>,
    /// lowercase name -> index
    by_name: HashMap<String, usize>,
}

impl StaticMenuCatalog {
    pub fn new(config: MenuConfig) -> Self {
        let by_name = config
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.name.trim().to_lowercase(), i))
            .collect();
        Self {
            items: config.items,
            by_name,
        }
    }

    pub fn cafe_default() -> Self {
        Self::new(MenuConfig::cafe_default())
    }

    /// Load from `path` when given, else use the bundled café menu
    pub fn from_path_or_default(path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        match path {
            Some(p) => {
                let config = MenuConfig::load(p)?;
                tracing::info!(path = %p, items = config.items.len(), "Loaded menu");
                Ok(Self::new(config))
            },
            None => Ok(Self::cafe_default()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl MenuCatalog for StaticMenuCatalog {
    fn lookup(&self, name: &str) -> Result<MenuItem> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(|&i| self.items[i].clone())
            .ok_or_else(|| Error::CatalogMiss(name.to_string()))
    }

    fn lookup_fuzzy(&self, name: &str) -> Result<FuzzyMatch> {
        let mut best: Option<FuzzyMatch> = None;
        for item in &self.items {
            let score = name_similarity(name, &item.name);
            // Ties keep the earlier menu entry
            if score > 0.0 && best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(FuzzyMatch {
                    name: item.name.clone(),
                    score,
                });
            }
        }
        best.ok_or_else(|| Error::CatalogMiss(name.to_string()))
    }

    fn all_items(&self) -> Vec<CatalogEntry> {
        self.items.iter().map(MenuItem::entry).collect()
    }
}
