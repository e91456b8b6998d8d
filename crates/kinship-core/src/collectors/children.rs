//! The root's structural children and what they reference

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{finalize, ids_without, Collectors};
use crate::block::{Block, BlockId, BlockRef};
use crate::category::RelationshipCategory;
use crate::classify::{
    is_inline_reference, is_inline_reference_type1, is_property_value_alias_block,
    is_property_value_ref, is_tag_block, is_tag_reference,
};
use crate::traverse::{depth_first, ChildBlocks, TraversalLimits};

/// Blocks referenced from the root's direct children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildReferenced {
    /// Alias blocks referenced inline
    pub alias: Vec<Block>,
    /// Tag blocks referenced by a child
    pub tag_alias: Vec<Block>,
    /// Non-alias blocks referenced with a plain type-1 reference
    pub inline: Vec<Block>,
}

impl Collectors {
    /// Scan the outgoing references of the root's direct children.
    ///
    /// References are grouped per target before classifying, so a target
    /// referenced twice in different ways is decided once. `tag_ids` are the
    /// tags already resolved for the root.
    #[tracing::instrument(skip(self, root, tag_ids), fields(root = %root.id))]
    pub async fn child_referenced(&self, root: &Block, tag_ids: &HashSet<BlockId>) -> ChildReferenced {
        let children = self.gateway.get_blocks(&root.children).await;

        let mut order = Vec::new();
        let mut refs_by_target: HashMap<BlockId, Vec<BlockRef>> = HashMap::new();
        for child in &children {
            for reference in child.refs.iter().filter(|r| r.to != root.id && r.to != child.id) {
                refs_by_target
                    .entry(reference.to)
                    .or_insert_with(|| {
                        order.push(reference.to);
                        Vec::new()
                    })
                    .push(reference.clone());
            }
        }

        let targets: HashMap<BlockId, Block> = self
            .gateway
            .get_blocks(&ids_without(order.iter().copied(), root.id))
            .await
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        let mut result = ChildReferenced::default();
        for id in &order {
            let (Some(target), Some(refs)) = (targets.get(id), refs_by_target.get(id)) else {
                continue;
            };

            if is_tag_reference(refs) || tag_ids.contains(id) || is_tag_block(target) {
                if target.has_aliases() {
                    result.tag_alias.push(target.clone());
                }
                continue;
            }
            if is_property_value_ref(refs) || is_property_value_alias_block(target) {
                continue;
            }

            if target.has_aliases() {
                if is_inline_reference(refs) {
                    result.alias.push(target.clone());
                }
            } else if is_inline_reference_type1(refs) {
                result.inline.push(target.clone());
            }
        }

        let result = ChildReferenced {
            alias: finalize(RelationshipCategory::ChildReferencedAlias, result.alias, root.id),
            tag_alias: finalize(
                RelationshipCategory::ChildReferencedTagAlias,
                result.tag_alias,
                root.id,
            ),
            inline: finalize(RelationshipCategory::ChildReferencedInline, result.inline, root.id),
        };
        debug!(
            "child-referenced: {} alias, {} tag alias, {} inline",
            result.alias.len(),
            result.tag_alias.len(),
            result.inline.len()
        );
        result
    }

    /// The root's direct children
    #[tracing::instrument(skip(self, root), fields(root = %root.id))]
    pub async fn page_direct_children(&self, root: &Block) -> Vec<Block> {
        let blocks = finalize(
            RelationshipCategory::PageDirectChildren,
            self.gateway.get_blocks(&root.children).await,
            root.id,
        );
        debug!("page-direct-children: {}", blocks.len());
        blocks
    }

    /// Descendants below the direct children, in depth-first order
    #[tracing::instrument(skip(self, root), fields(root = %root.id))]
    pub async fn page_recursive_children(&self, root: &Block) -> Vec<Block> {
        let neighbors = ChildBlocks::new(self.gateway.clone());
        let mut visited = HashSet::new();
        let visits = depth_first(root, &neighbors, TraversalLimits::unbounded(), &mut visited).await;

        let blocks = finalize(
            RelationshipCategory::PageRecursiveChildren,
            visits
                .into_iter()
                .filter(|visit| visit.depth > 1)
                .map(|visit| visit.block)
                .collect(),
            root.id,
        );
        debug!("page-recursive-children: {}", blocks.len());
        blocks
    }
}
