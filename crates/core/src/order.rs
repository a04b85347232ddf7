//! Order state
//!
//! `total_price` is derived data. Every mutating method ends with
//! [`OrderState::recompute_total`], so the total is never accumulated
//! incrementally. Option price adjustments are not part of the total.

use serde::{Deserialize, Serialize};

use crate::menu::OptionsSchema;

/// One line of the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    /// Chosen option names, unique, in the order they were chosen
    pub options: Vec<String>,
    /// Required option categories still unanswered
    pub missing_required_options: Vec<String>,
    /// Catalog base price of one unit
    pub unit_price: i64,
}

impl OrderItem {
    /// Build an item and derive its missing categories from the schema
    pub fn new(
        name: impl Into<String>,
        quantity: u32,
        options: Vec<String>,
        schema: &OptionsSchema,
    ) -> Self {
        let mut item = Self {
            name: name.into(),
            quantity: quantity.max(1),
            options: Vec::new(),
            missing_required_options: Vec::new(),
            unit_price: schema.base_price,
        };
        item.apply_options(&options, schema);
        item
    }

    /// Merge options into the item and recompute missing categories.
    ///
    /// A new option replaces a previously chosen option of the same category,
    /// so answering "아이스" after "핫" switches the temperature.
    pub fn apply_options<S: AsRef<str>>(&mut self, options: &[S], schema: &OptionsSchema) {
        for option in options {
            let option = option.as_ref();
            if self.options.iter().any(|o| o == option) {
                continue;
            }
            if let Some(category) = schema.category_of(option) {
                self.options
                    .retain(|existing| schema.category_of(existing) != Some(category));
            }
            self.options.push(option.to_string());
        }
        self.missing_required_options = schema.missing_required(&self.options);
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required_options.is_empty()
    }

    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// The customer's current order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderState {
    pub items: Vec<OrderItem>,
    pub total_price: i64,
    #[serde(default)]
    pub special_requests: String,
}

impl OrderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item; returns its index
    pub fn add_item(&mut self, item: OrderItem) -> usize {
        self.items.push(item);
        self.recompute_total();
        self.items.len() - 1
    }

    /// Replace all items
    pub fn replace_items(&mut self, items: Vec<OrderItem>) {
        self.items = items;
        self.recompute_total();
    }

    /// Apply options to the item at `index`
    pub fn apply_options<S: AsRef<str>>(
        &mut self,
        index: usize,
        options: &[S],
        schema: &OptionsSchema,
    ) -> Option<&OrderItem> {
        let item = self.items.get_mut(index)?;
        item.apply_options(options, schema);
        self.recompute_total();
        self.items.get(index)
    }

    /// Index of the most recently added item with this name
    pub fn find_last(&self, name: &str) -> Option<usize> {
        self.items.iter().rposition(|item| item.name == name)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.items.len().checked_sub(1)
    }

    /// Recompute `total_price` from scratch
    pub fn recompute_total(&mut self) {
        self.total_price = self.items.iter().map(OrderItem::line_total).sum();
    }

    /// Whether any item still needs a required option
    pub fn has_missing_options(&self) -> bool {
        self.items.iter().any(|item| !item.is_complete())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.special_requests.clear();
        self.recompute_total();
    }
}
