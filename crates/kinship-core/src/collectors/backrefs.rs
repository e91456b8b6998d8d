//! Incoming references: direct, via alias blocks, and through child tags

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{finalize, ids_without, Collectors};
use crate::block::{Block, BlockId};
use crate::category::RelationshipCategory;
use crate::traverse::{depth_first, ChildTags, TraversalLimits};

/// Backrefs gathered over the root's child-tag tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecursiveBackrefs {
    /// Backref sources without aliases
    pub plain: Vec<Block>,
    /// Backref sources carrying aliases
    pub alias: Vec<Block>,
}

impl Collectors {
    /// Blocks referencing the root directly
    #[tracing::instrument(skip(self, root), fields(root = %root.id))]
    pub async fn backrefs(&self, root: &Block) -> Vec<Block> {
        let ids = ids_without(root.back_ref_sources(), root.id);
        let blocks = finalize(
            RelationshipCategory::Backref,
            self.gateway.get_blocks(&ids).await,
            root.id,
        );
        debug!("backref: {}", blocks.len());
        blocks
    }

    /// Alias blocks referencing the root, directly or through a child block.
    ///
    /// A referencing block without aliases is replaced by its parent when the
    /// parent is an alias block.
    #[tracing::instrument(skip(self, root), fields(root = %root.id))]
    pub async fn referencing_alias(&self, root: &Block) -> Vec<Block> {
        let ids = ids_without(root.back_ref_sources(), root.id);
        let sources = self.gateway.get_blocks(&ids).await;

        let parent_ids = ids_without(
            sources
                .iter()
                .filter(|b| !b.has_aliases())
                .filter_map(|b| b.parent),
            root.id,
        );
        let parents: HashMap<BlockId, Block> = self
            .gateway
            .get_blocks(&parent_ids)
            .await
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        let candidates = sources.into_iter().filter_map(|source| {
            if source.has_aliases() {
                return Some(source);
            }
            source
                .parent
                .and_then(|parent| parents.get(&parent))
                .filter(|parent| parent.has_aliases())
                .cloned()
        });

        let blocks = finalize(
            RelationshipCategory::ReferencingAlias,
            candidates.collect(),
            root.id,
        );
        debug!("referencing-alias: {}", blocks.len());
        blocks
    }

    /// Alias blocks two hops away: children and reference targets of the
    /// blocks referencing the root
    #[tracing::instrument(skip(self, root), fields(root = %root.id))]
    pub async fn backref_alias_blocks(&self, root: &Block) -> Vec<Block> {
        let ids = ids_without(root.back_ref_sources(), root.id);
        let sources = self.gateway.get_blocks(&ids).await;

        let hop = ids_without(
            sources
                .iter()
                .flat_map(|b| b.children.iter().copied().chain(b.ref_targets())),
            root.id,
        );
        let blocks: Vec<Block> = self
            .gateway
            .get_blocks(&hop)
            .await
            .into_iter()
            .filter(Block::has_aliases)
            .collect();

        let blocks = finalize(RelationshipCategory::BackrefAliasBlocks, blocks, root.id);
        debug!("backref-alias-blocks: {}", blocks.len());
        blocks
    }

    /// Backrefs of every block in the root's child-tag tree.
    ///
    /// One walk over the tree feeds both outputs; a block lands in `alias`
    /// when it carries aliases and in `plain` otherwise.
    #[tracing::instrument(skip(self, root), fields(root = %root.id))]
    pub async fn recursive_backrefs(&self, root: &Block) -> RecursiveBackrefs {
        let neighbors = ChildTags::new(self.gateway.clone());
        let mut visited = HashSet::new();
        let tags = depth_first(root, &neighbors, TraversalLimits::unbounded(), &mut visited).await;

        let mut seen = HashSet::from([root.id]);
        let mut result = RecursiveBackrefs::default();

        for visit in &tags {
            let ids = ids_without(visit.block.back_ref_sources(), root.id);
            for block in self.gateway.get_blocks(&ids).await {
                if !block.has_name() || !seen.insert(block.id) {
                    continue;
                }
                if block.has_aliases() {
                    result.alias.push(block);
                } else {
                    result.plain.push(block);
                }
            }
        }

        debug!(
            "recursive-backref: {} child tags, {} plain, {} alias",
            tags.len(),
            result.plain.len(),
            result.alias.len()
        );
        result
    }
}
