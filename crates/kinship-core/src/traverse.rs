//! Depth-first traversal over the block graph
//!
//! Every recursive walk in the crate (child-tag recursion for backrefs,
//! recursive page children, descendant indexing for search) goes through
//! [`depth_first`]. Neighbor fetches are awaited one at a time: each step
//! depends on the block returned by the previous one, and it keeps the number
//! of in-flight store calls bounded.
//!
//! The caller owns the visited set. Seeding it lets a walk skip blocks that
//! are already accounted for; sharing it across walks makes them jointly
//! cycle-safe.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::block::{Block, BlockId};
use crate::gateway::BlockGateway;

/// Source of neighbors for a traversal
#[async_trait]
pub trait Neighbors: Send + Sync {
    /// Blocks adjacent to `block`, in visiting order
    async fn neighbors(&self, block: &Block) -> Vec<Block>;
}

/// Structural children, fetched in one batch per block
pub struct ChildBlocks {
    gateway: Arc<BlockGateway>,
}

impl ChildBlocks {
    pub fn new(gateway: Arc<BlockGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Neighbors for ChildBlocks {
    async fn neighbors(&self, block: &Block) -> Vec<Block> {
        self.gateway.get_blocks(&block.children).await
    }
}

/// Child tags in the tag hierarchy
pub struct ChildTags {
    gateway: Arc<BlockGateway>,
}

impl ChildTags {
    pub fn new(gateway: Arc<BlockGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Neighbors for ChildTags {
    async fn neighbors(&self, block: &Block) -> Vec<Block> {
        self.gateway.get_children_tags(block.id).await
    }
}

/// Bounds for a traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalLimits {
    /// Deepest level to visit; the start block is depth 0
    pub max_depth: Option<usize>,
    /// Stop after this many visited blocks (start excluded)
    pub max_nodes: Option<usize>,
}

impl TraversalLimits {
    /// No bounds beyond the visited set
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Limit the depth
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Limit the number of visited blocks
    #[must_use]
    pub fn with_max_nodes(mut self, nodes: usize) -> Self {
        self.max_nodes = Some(nodes);
        self
    }
}

/// A block reached by a traversal
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub block: Block,
    /// Distance from the start block (direct neighbors are depth 1)
    pub depth: usize,
}

/// Walk the graph depth-first from `start`, in pre-order.
///
/// The start block is marked visited but not returned. A block whose id is
/// already in `visited` is neither returned nor expanded, which guarantees
/// termination on cyclic graphs.
pub async fn depth_first<N>(
    start: &Block,
    neighbors: &N,
    limits: TraversalLimits,
    visited: &mut HashSet<BlockId>,
) -> Vec<Visit>
where
    N: Neighbors + ?Sized,
{
    let mut visits = Vec::new();
    visited.insert(start.id);

    let mut stack: Vec<(Block, usize)> = vec![(start.clone(), 0)];

    while let Some((current, depth)) = stack.pop() {
        if depth > 0 {
            visits.push(Visit {
                block: current.clone(),
                depth,
            });
            if limits.max_nodes.is_some_and(|max| visits.len() >= max) {
                break;
            }
        }
        if limits.max_depth.is_some_and(|max| depth >= max) {
            continue;
        }

        let next: Vec<Block> = neighbors
            .neighbors(&current)
            .await
            .into_iter()
            .filter(|block| visited.insert(block.id))
            .collect();

        // Reverse so the first neighbor is popped first
        for block in next.into_iter().rev() {
            stack.push((block, depth + 1));
        }
    }

    visits
}
