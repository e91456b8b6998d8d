//! Grouping and de-duplication of display items
//!
//! Categories are walked in [`RelationshipCategory::PRECEDENCE`] order. The
//! first item seen for a `id-text` key keeps its category; later items with
//! the same key are dropped, whichever category they came from. The flat list
//! is the concatenation of the groups in that same order.

use std::collections::HashSet;

use serde::Serialize;

use crate::block::BlockId;
use crate::category::RelationshipCategory;
use crate::item::{CategoryItems, DisplayItem};

/// Items of one category after de-duplication
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemGroup {
    pub category: RelationshipCategory,
    pub items: Vec<DisplayItem>,
}

/// Grouped, de-duplicated related items
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedItems {
    /// Non-empty groups in precedence order
    pub groups: Vec<ItemGroup>,
    /// Every item, in precedence order
    pub items: Vec<DisplayItem>,
    pub tag_ids: Vec<BlockId>,
    pub contained_in_ids: Vec<BlockId>,
}

impl GroupedItems {
    /// Items of one category
    pub fn group(&self, category: RelationshipCategory) -> &[DisplayItem] {
        self.groups
            .iter()
            .find(|g| g.category == category)
            .map_or(&[], |g| g.items.as_slice())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Per-category lists of the grouped items, for re-grouping
    pub fn to_lists(&self) -> CategoryItems {
        self.groups
            .iter()
            .map(|g| (g.category, g.items.clone()))
            .collect()
    }

    /// The flat list with non-tag contained-in items moved to the front
    pub fn presentation_order(&self) -> Vec<DisplayItem> {
        let tag_ids: HashSet<BlockId> = self.tag_ids.iter().copied().collect();
        promote_contained_in(self.items.clone(), &tag_ids)
    }
}

/// Merge per-category lists into precedence-ordered, de-duplicated groups
pub fn build_grouped_items(
    lists: &CategoryItems,
    tag_ids: &[BlockId],
    contained_in_ids: &[BlockId],
) -> GroupedItems {
    let mut seen = HashSet::new();
    let mut grouped = GroupedItems {
        tag_ids: tag_ids.to_vec(),
        contained_in_ids: contained_in_ids.to_vec(),
        ..GroupedItems::default()
    };

    for category in RelationshipCategory::PRECEDENCE {
        let Some(list) = lists.get(&category) else {
            continue;
        };

        let items: Vec<DisplayItem> = list
            .iter()
            .filter(|item| seen.insert(item.key()))
            .cloned()
            .collect();

        if !items.is_empty() {
            grouped.items.extend(items.iter().cloned());
            grouped.groups.push(ItemGroup { category, items });
        }
    }

    grouped
}

/// Stable-move contained-in items that are not tags to the front
pub fn promote_contained_in(items: Vec<DisplayItem>, tag_ids: &HashSet<BlockId>) -> Vec<DisplayItem> {
    let (promoted, rest): (Vec<_>, Vec<_>) = items.into_iter().partition(|item| {
        item.category == RelationshipCategory::ContainedIn && !tag_ids.contains(&item.id)
    });
    promoted.into_iter().chain(rest).collect()
}
