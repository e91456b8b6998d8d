//! Relationship collectors
//!
//! Each collector discovers the blocks of one (or a few sibling) relationship
//! categories for a root block. Collectors are independent and safe to run
//! concurrently; they share nothing but the memoizing gateway.
//!
//! Collectors are infallible by signature: every store access goes through
//! the gateway's best-effort wrappers, so a failed fetch shrinks a category
//! instead of aborting the aggregation pass.
//!
//! Every collector output:
//! - excludes the root block itself
//! - holds each block at most once
//! - drops blocks with neither text nor alias, except property-value
//!   reference categories

mod backrefs;
mod children;
mod contained;
mod references;

use std::collections::HashSet;
use std::sync::Arc;

use kinship_config::BreadcrumbConfig;

use crate::block::{Block, BlockId};
use crate::category::RelationshipCategory;
use crate::gateway::BlockGateway;
use crate::host::BreadcrumbSource;

pub use backrefs::RecursiveBackrefs;
pub use children::ChildReferenced;
pub use contained::parse_breadcrumb;
pub use references::ReferencedBlocks;

/// Runs the relationship collectors against one gateway
pub struct Collectors {
    gateway: Arc<BlockGateway>,
    breadcrumbs: Arc<dyn BreadcrumbSource>,
    breadcrumb_config: BreadcrumbConfig,
}

impl Collectors {
    pub fn new(
        gateway: Arc<BlockGateway>,
        breadcrumbs: Arc<dyn BreadcrumbSource>,
        breadcrumb_config: BreadcrumbConfig,
    ) -> Self {
        Self {
            gateway,
            breadcrumbs,
            breadcrumb_config,
        }
    }

    /// Gateway shared by the collectors
    pub fn gateway(&self) -> &Arc<BlockGateway> {
        &self.gateway
    }
}

/// Drop the root and repeated ids, plus unnamed blocks unless `category`
/// admits them
fn finalize(category: RelationshipCategory, blocks: Vec<Block>, root: BlockId) -> Vec<Block> {
    let keep_unnamed = category.admits_unnamed();
    let mut seen = HashSet::new();
    blocks
        .into_iter()
        .filter(|block| {
            block.id != root && (keep_unnamed || block.has_name()) && seen.insert(block.id)
        })
        .collect()
}

/// Ids without `root`, keeping first occurrences only
fn ids_without(ids: impl IntoIterator<Item = BlockId>, root: BlockId) -> Vec<BlockId> {
    crate::block::dedup_ids(ids.into_iter().filter(|id| *id != root))
}
