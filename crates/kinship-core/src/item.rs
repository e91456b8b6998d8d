//! Display items
//!
//! [`ItemBuilder`] turns raw related blocks into [`DisplayItem`]s: it
//! resolves the display text and parent, relabels date-like property values
//! and builds the searchable text, including the text of every descendant.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use futures::future::join_all;
use kinship_config::SearchConfig;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::aggregate::RelatedSnapshot;
use crate::block::{Block, BlockId, PROP_HIDE, PROP_ICON};
use crate::category::RelationshipCategory;
use crate::date::{detect_date, format_relative};
use crate::gateway::BlockGateway;
use crate::journal::JournalResolver;
use crate::store::BlockTable;
use crate::traverse::{depth_first, ChildBlocks, TraversalLimits};

/// Display items per category
pub type CategoryItems = BTreeMap<RelationshipCategory, Vec<DisplayItem>>;

/// Source of the current local time
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Parent block of an item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentRef {
    pub id: BlockId,
    /// Parent's name, when the parent is loaded and has one
    pub text: Option<String>,
}

/// One descendant of an item, kept for search drill-down
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescendantMatch {
    pub id: BlockId,
    pub text: String,
    pub aliases: Vec<String>,
    /// 1 for direct children
    pub depth: usize,
}

impl DescendantMatch {
    /// Whether the text or an alias contains `needle` (already lowercased)
    pub fn matches(&self, needle: &str) -> bool {
        self.text.to_lowercase().contains(needle)
            || self.aliases.iter().any(|a| a.to_lowercase().contains(needle))
    }
}

/// A related block ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayItem {
    pub id: BlockId,
    pub text: String,
    pub aliases: Vec<String>,
    pub is_page: bool,
    pub parent: Option<ParentRef>,
    pub category: RelationshipCategory,
    pub icon: Option<String>,
    /// Lowercased text of the item, its descendants and what it references
    pub searchable_text: String,
    pub descendants: Vec<DescendantMatch>,
    /// Journal page of a date-like item
    pub journal_id: Option<BlockId>,
    pub date: Option<NaiveDate>,
}

impl DisplayItem {
    /// Block to open when the item is activated
    pub fn target(&self) -> BlockId {
        self.journal_id.unwrap_or(self.id)
    }

    /// Grouping key: id and display text
    pub fn key(&self) -> String {
        format!("{}-{}", self.id, self.text)
    }
}

/// Builds display items from raw blocks
pub struct ItemBuilder {
    gateway: Arc<BlockGateway>,
    table: Arc<dyn BlockTable>,
    search: SearchConfig,
    journal: Option<Arc<JournalResolver>>,
    clock: Clock,
}

impl ItemBuilder {
    pub fn new(gateway: Arc<BlockGateway>, table: Arc<dyn BlockTable>, search: SearchConfig) -> Self {
        Self {
            gateway,
            table,
            search,
            journal: None,
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }

    /// Resolve journal pages for date-like items
    #[must_use]
    pub fn with_journal(mut self, journal: Arc<JournalResolver>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Replace the clock used for relative date labels
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Build the display item for `block` without search data.
    ///
    /// `display_text` overrides the resolved text. Date detection only runs
    /// for property-reference categories.
    pub async fn create_display_item(
        &self,
        block: &Block,
        category: RelationshipCategory,
        display_text: Option<&str>,
    ) -> DisplayItem {
        let mut text = display_text
            .map(str::to_string)
            .or_else(|| block.name().map(str::to_string))
            .unwrap_or_else(|| format!("Block #{}", block.id));

        let aliases = if block.has_aliases() {
            block.aliases.clone()
        } else {
            vec![text.clone()]
        };

        let is_page = !block.property(PROP_HIDE).is_some_and(|p| p.is_truthy());

        let parent = block.parent.map(|id| ParentRef {
            id,
            text: self
                .table
                .block(id)
                .and_then(|parent| parent.name().map(str::to_string)),
        });

        let icon = block
            .property(PROP_ICON)
            .and_then(|p| p.value.as_str())
            .filter(|icon| !icon.is_empty())
            .map(str::to_string);

        let mut date = None;
        let mut journal_id = None;
        if category.is_property_ref() {
            if let Some(detected) = detect_date(block) {
                if display_text.is_none() {
                    text = format_relative(&detected, (self.clock)());
                }
                date = Some(detected.date);
                if let Some(journal) = &self.journal {
                    journal_id = journal.resolve(detected.date).await;
                }
            }
        }

        DisplayItem {
            id: block.id,
            text,
            aliases,
            is_page,
            parent,
            category,
            icon,
            searchable_text: String::new(),
            descendants: Vec::new(),
            journal_id,
            date,
        }
    }

    /// Fill in the item's searchable text and descendant records.
    ///
    /// Gathers the item's own names, every descendant (cycle-guarded, depth
    /// capped by the search configuration), the names of referenced blocks
    /// and of blocks whose ids appear as property values.
    pub async fn enhance_for_search(&self, item: &mut DisplayItem, block: &Block) {
        let mut parts: Vec<String> = Vec::new();
        parts.push(item.text.clone());
        parts.extend(item.aliases.iter().cloned());
        if let Some(text) = block.text() {
            parts.push(text.to_string());
        }

        if self.search.index_descendants {
            let limits = match self.search.max_descendant_depth {
                Some(depth) => TraversalLimits::unbounded().with_max_depth(depth),
                None => TraversalLimits::unbounded(),
            };
            let neighbors = ChildBlocks::new(self.gateway.clone());
            let mut visited = HashSet::new();

            for visit in depth_first(block, &neighbors, limits, &mut visited).await {
                let Some(text) = visit.block.name().map(str::to_string) else {
                    continue;
                };
                parts.push(text.clone());
                parts.extend(visit.block.aliases.iter().cloned());
                item.descendants.push(DescendantMatch {
                    id: visit.block.id,
                    text,
                    aliases: visit.block.aliases,
                    depth: visit.depth,
                });
            }
        }

        let mut linked: Vec<BlockId> = block.ref_targets();
        for property in block.properties.iter().filter(|p| !p.name.starts_with('_')) {
            collect_id_values(&property.value, &mut linked);
        }
        let linked = crate::block::dedup_ids(linked.into_iter().filter(|id| *id != block.id));
        for target in self.gateway.get_blocks(&linked).await {
            parts.extend(target.name().map(str::to_string));
        }

        item.searchable_text = parts.join(" ").to_lowercase();
    }

    /// Build the searchable display items of every category in `snapshot`
    pub async fn build_items(&self, snapshot: &RelatedSnapshot) -> CategoryItems {
        let mut lists = CategoryItems::new();

        for (category, blocks) in &snapshot.categories {
            let items = join_all(blocks.iter().map(|block| async move {
                let mut item = self.create_display_item(block, *category, None).await;
                self.enhance_for_search(&mut item, block).await;
                item
            }))
            .await;
            lists.insert(*category, items);
        }

        debug!(
            "Built {} display items for {}",
            lists.values().map(Vec::len).sum::<usize>(),
            snapshot.root
        );
        lists
    }
}

/// Numeric values that may be block ids, at the top level or one level
/// into an array or object
fn collect_id_values(value: &Value, out: &mut Vec<BlockId>) {
    let as_id = |v: &Value| v.as_i64().filter(|n| *n > 0).map(BlockId);
    match value {
        Value::Array(items) => out.extend(items.iter().filter_map(as_id)),
        Value::Object(map) => out.extend(map.values().filter_map(as_id)),
        other => out.extend(as_id(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockRef, PROP_REPR};
    use crate::store::MemoryBlockStore;
    use serde_json::json;

    fn builder(store: &MemoryBlockStore) -> ItemBuilder {
        let gateway = Arc::new(BlockGateway::new(Arc::new(store.clone())));
        ItemBuilder::new(gateway, Arc::new(store.clone()), SearchConfig::default())
            .with_clock(Arc::new(|| {
                NaiveDate::from_ymd_opt(2024, 6, 12)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap()
            }))
    }

    #[tokio::test]
    async fn test_text_alias_and_placeholder() {
        let store = MemoryBlockStore::from_blocks(vec![Block::new(1).with_alias("Home")]);
        let builder = builder(&store);

        let item = builder
            .create_display_item(&Block::new(2).with_text("body"), RelationshipCategory::Backref, None)
            .await;
        assert_eq!(item.text, "body");
        assert_eq!(item.aliases, vec!["body".to_string()]);

        let item = builder
            .create_display_item(&Block::new(3), RelationshipCategory::PropertyRefBlock, None)
            .await;
        assert_eq!(item.text, "Block #3");

        let item = builder
            .create_display_item(
                &Block::new(4).with_alias("Page"),
                RelationshipCategory::Tag,
                Some("Override"),
            )
            .await;
        assert_eq!(item.text, "Override");
        assert_eq!(item.aliases, vec!["Page".to_string()]);
    }

    #[tokio::test]
    async fn test_page_flag_parent_and_icon() {
        let store = MemoryBlockStore::from_blocks(vec![Block::new(1).with_alias("Parent page")]);
        let block = Block::new(2)
            .with_text("child")
            .with_parent(1)
            .with_property(PROP_HIDE, json!(true))
            .with_property(PROP_ICON, json!("ti ti-star"));

        let item = builder(&store)
            .create_display_item(&block, RelationshipCategory::Backref, None)
            .await;
        assert!(!item.is_page);
        assert_eq!(
            item.parent,
            Some(ParentRef {
                id: BlockId(1),
                text: Some("Parent page".into())
            })
        );
        assert_eq!(item.icon.as_deref(), Some("ti ti-star"));
    }

    #[tokio::test]
    async fn test_dates_only_for_property_refs() {
        let store = MemoryBlockStore::new();
        store.add_journal("2024-01-01", 50);
        let gateway = Arc::new(BlockGateway::new(Arc::new(store.clone())));
        let journal = Arc::new(JournalResolver::new(gateway, std::time::Duration::from_secs(60)));
        let builder = builder(&store).with_journal(journal);

        let block = Block::new(7)
            .with_text("2024-01-01")
            .with_property(PROP_REPR, json!({"date": "2024-01-01"}));

        let item = builder
            .create_display_item(&block, RelationshipCategory::PropertyRefBlock, None)
            .await;
        assert_eq!(item.text, "January 1, 2024");
        assert_eq!(item.journal_id, Some(BlockId(50)));
        assert_eq!(item.target(), BlockId(50));

        let item = builder
            .create_display_item(&block, RelationshipCategory::Backref, None)
            .await;
        assert_eq!(item.text, "2024-01-01");
        assert_eq!(item.journal_id, None);
    }

    #[tokio::test]
    async fn test_search_text_covers_descendants_refs_and_property_ids() {
        let store = MemoryBlockStore::from_blocks(vec![
            Block::new(1)
                .with_alias("Trip")
                .with_children([2])
                .with_ref(BlockRef::new(1, 5, 1))
                .with_property("owner", json!(6))
                .with_property("members", json!([7, "x"])),
            Block::new(2).with_text("Packing list").with_children([3]),
            Block::new(3).with_text("Passport").with_children([1]),
            Block::new(5).with_alias("Lisbon"),
            Block::new(6).with_alias("Alice"),
            Block::new(7).with_alias("Bob"),
        ]);
        let builder = builder(&store);
        let block = crate::store::BlockTable::block(&store, BlockId(1)).unwrap();

        let mut item = builder
            .create_display_item(&block, RelationshipCategory::Backref, None)
            .await;
        builder.enhance_for_search(&mut item, &block).await;

        for needle in ["trip", "packing list", "passport", "lisbon", "alice", "bob"] {
            assert!(item.searchable_text.contains(needle), "{needle}");
        }
        let depths: Vec<_> = item.descendants.iter().map(|d| (d.id.get(), d.depth)).collect();
        assert_eq!(depths, vec![(2, 1), (3, 2)]);
    }

    #[test]
    fn test_collect_id_values() {
        let mut out = Vec::new();
        collect_id_values(&json!({"a": 3, "b": "x", "c": [4]}), &mut out);
        collect_id_values(&json!(-1), &mut out);
        collect_id_values(&json!(9), &mut out);
        assert_eq!(out, vec![BlockId(3), BlockId(9)]);
    }
}
