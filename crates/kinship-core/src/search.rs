//! Filtering related items by text and category

use std::collections::HashSet;

use serde::Serialize;

use crate::category::RelationshipCategory;
use crate::item::{DescendantMatch, DisplayItem};

/// What to keep from a list of related items
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Case-insensitive substring; blank matches everything
    pub query: String,
    /// Categories to keep; empty keeps every category
    pub categories: HashSet<RelationshipCategory>,
}

impl ItemFilter {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            categories: HashSet::new(),
        }
    }

    /// Restrict to one more category
    #[must_use]
    pub fn with_category(mut self, category: RelationshipCategory) -> Self {
        self.categories.insert(category);
        self
    }

    fn admits(&self, category: RelationshipCategory) -> bool {
        self.categories.is_empty() || self.categories.contains(&category)
    }
}

/// An item that passed a filter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub item: DisplayItem,
    /// Descendants whose own text matched the query
    pub matched_descendants: Vec<DescendantMatch>,
}

/// Keep the items matching `filter`, preserving their order
pub fn filter_items(items: &[DisplayItem], filter: &ItemFilter) -> Vec<SearchHit> {
    let needle = filter.query.trim().to_lowercase();

    items
        .iter()
        .filter(|item| filter.admits(item.category))
        .filter_map(|item| {
            if needle.is_empty() {
                return Some(SearchHit {
                    item: item.clone(),
                    matched_descendants: Vec::new(),
                });
            }
            if !item.searchable_text.contains(&needle) {
                return None;
            }
            Some(SearchHit {
                item: item.clone(),
                matched_descendants: item
                    .descendants
                    .iter()
                    .filter(|d| d.matches(&needle))
                    .cloned()
                    .collect(),
            })
        })
        .collect()
}
