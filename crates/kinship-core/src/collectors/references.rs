//! Tags and outgoing references of the root

use std::collections::HashMap;

use tracing::debug;

use super::{finalize, ids_without, Collectors};
use crate::block::{Block, BlockId};
use crate::category::RelationshipCategory;
use crate::classify::process_references;

/// Outgoing references of the root, split by classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferencedBlocks {
    /// Targets of tag references, fetched or not, in reference order
    pub tag_ids: Vec<BlockId>,
    /// Targets of tag references
    pub tags: Vec<Block>,
    /// Property-value targets that are alias blocks
    pub property_alias: Vec<Block>,
    /// Property-value targets without aliases
    pub property_block: Vec<Block>,
    /// Inline reference targets
    pub inline: Vec<Block>,
}

impl Collectors {
    /// Direct child tags of the root
    #[tracing::instrument(skip(self, root), fields(root = %root.id))]
    pub async fn children_tags(&self, root: &Block) -> Vec<Block> {
        let blocks = finalize(
            RelationshipCategory::Tag,
            self.gateway.get_children_tags(root.id).await,
            root.id,
        );
        debug!("children-tags: {}", blocks.len());
        blocks
    }

    /// Classify the root's outgoing references and fetch their targets
    #[tracing::instrument(skip(self, root), fields(root = %root.id))]
    pub async fn referenced(&self, root: &Block) -> ReferencedBlocks {
        let ids = ids_without(root.ref_targets(), root.id);
        let targets = self.gateway.get_blocks(&ids).await;
        let buckets = process_references(root, &targets);

        let by_id: HashMap<BlockId, &Block> = targets.iter().map(|b| (b.id, b)).collect();
        let pick = |ids: &[BlockId]| -> Vec<Block> {
            ids.iter()
                .filter_map(|id| by_id.get(id).map(|b| (*b).clone()))
                .collect()
        };

        let (property_alias, property_block): (Vec<Block>, Vec<Block>) = pick(&buckets.property)
            .into_iter()
            .partition(Block::has_aliases);

        let referenced = ReferencedBlocks {
            tags: finalize(RelationshipCategory::ReferencedTag, pick(&buckets.tag_ids), root.id),
            tag_ids: buckets.tag_ids,
            property_alias: finalize(
                RelationshipCategory::PropertyRefAlias,
                property_alias,
                root.id,
            ),
            property_block: finalize(
                RelationshipCategory::PropertyRefBlock,
                property_block,
                root.id,
            ),
            inline: finalize(RelationshipCategory::InlineRef, pick(&buckets.inline), root.id),
        };

        debug!(
            "referenced: {} tags, {} property aliases, {} property blocks, {} inline",
            referenced.tags.len(),
            referenced.property_alias.len(),
            referenced.property_block.len(),
            referenced.inline.len()
        );
        referenced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockRef;
    use crate::classify::TAG_REF_TYPE;
    use crate::gateway::BlockGateway;
    use crate::host::NoBreadcrumb;
    use crate::store::MemoryBlockStore;
    use kinship_config::BreadcrumbConfig;
    use serde_json::json;
    use std::sync::Arc;

    fn collectors(store: &MemoryBlockStore) -> Collectors {
        let gateway = Arc::new(BlockGateway::new(Arc::new(store.clone())));
        Collectors::new(gateway, Arc::new(NoBreadcrumb), BreadcrumbConfig::default())
    }

    fn ids(blocks: &[Block]) -> Vec<i64> {
        blocks.iter().map(|b| b.id.get()).collect()
    }

    #[tokio::test]
    async fn test_referenced_splits_by_class() {
        let root = Block::new(1)
            .with_text("root")
            .with_ref(BlockRef::new(1, 10, TAG_REF_TYPE))
            .with_ref(BlockRef::new(1, 11, 1))
            .with_ref(BlockRef::new(1, 12, 3).with_data(vec![crate::block::BlockProperty::new(
                "status",
                json!("open"),
            )]))
            .with_ref(BlockRef::new(1, 13, 4))
            .with_ref(BlockRef::new(1, 1, 0));
        let store = MemoryBlockStore::from_blocks(vec![
            root.clone(),
            Block::new(10).with_alias("Project"),
            Block::new(11).with_text("inline target"),
            Block::new(12).with_alias("Open"),
            Block::new(13),
        ]);

        let referenced = collectors(&store).referenced(&root).await;

        assert_eq!(ids(&referenced.tags), vec![10]);
        assert_eq!(ids(&referenced.inline), vec![11]);
        assert_eq!(ids(&referenced.property_alias), vec![12]);
        // Unnamed property targets are kept
        assert_eq!(ids(&referenced.property_block), vec![13]);
        assert_eq!(referenced.tag_ids, vec![BlockId(10)]);
    }

    #[tokio::test]
    async fn test_children_tags_skip_unnamed_and_self() {
        let store = MemoryBlockStore::from_blocks(vec![
            Block::new(1).with_alias("Root"),
            Block::new(2).with_alias("Child"),
            Block::new(3),
        ]);
        store.add_child_tag(1, 2);
        store.add_child_tag(1, 3);
        store.add_child_tag(1, 1);

        let root = Block::new(1).with_alias("Root");
        let tags = collectors(&store).children_tags(&root).await;
        assert_eq!(ids(&tags), vec![2]);
    }

    #[tokio::test]
    async fn test_referenced_degrades_on_failure() {
        let root = Block::new(1).with_ref(BlockRef::new(1, 2, 1));
        let store = MemoryBlockStore::from_blocks(vec![root.clone(), Block::new(2).with_text("x")]);
        store.fail_on(crate::store::StoreOp::GetBlocks);

        let referenced = collectors(&store).referenced(&root).await;
        assert!(referenced.inline.is_empty());
    }
}
