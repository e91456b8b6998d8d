//! Aggregation of every relationship category for one root block
//!
//! [`Aggregator::gather_all_data`] runs the collectors for a root and caches
//! the resulting [`RelatedSnapshot`] per root id. The referenced-blocks
//! collector runs first because its tag ids feed the child-reference
//! collector; every other collector then runs concurrently and the pass waits
//! for all of them.
//!
//! ## Cache
//!
//! The snapshot cache is injected, so each aggregator (and each test) owns
//! its entries. Expiry is lazy on lookup, plus an optional periodic sweep
//! started with [`Aggregator::spawn_sweeper`].

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::join;
use kinship_config::{FeatureConfig, KinshipConfig};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::block::{Block, BlockId};
use crate::cache::{CacheStats, TtlCache};
use crate::category::RelationshipCategory;
use crate::collectors::Collectors;
use crate::gateway::BlockGateway;
use crate::host::BreadcrumbSource;
use crate::journal::JournalResolver;
use crate::store::BlockStore;

/// Snapshot cache keyed by root id
pub type SnapshotCache = TtlCache<BlockId, Arc<RelatedSnapshot>>;

/// Raw related blocks of one root, per category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedSnapshot {
    pub root: BlockId,
    /// Category lists; categories with nothing related are absent
    pub categories: BTreeMap<RelationshipCategory, Vec<Block>>,
    /// Tags of the root: tag references and direct child tags
    pub tag_ids: Vec<BlockId>,
    /// Blocks enclosing the root in the tag hierarchy
    pub contained_in_ids: Vec<BlockId>,
}

impl RelatedSnapshot {
    /// Snapshot with no related blocks
    pub fn empty(root: BlockId) -> Self {
        Self {
            root,
            categories: BTreeMap::new(),
            tag_ids: Vec::new(),
            contained_in_ids: Vec::new(),
        }
    }

    /// Blocks of one category
    pub fn blocks(&self, category: RelationshipCategory) -> &[Block] {
        self.categories.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Total number of blocks across categories
    pub fn total(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Tag ids as a set
    pub fn tag_set(&self) -> HashSet<BlockId> {
        self.tag_ids.iter().copied().collect()
    }

    fn put(&mut self, category: RelationshipCategory, blocks: Vec<Block>) {
        if !blocks.is_empty() {
            self.categories.insert(category, blocks);
        }
    }
}

/// Runs the collectors for a root and caches the snapshot
pub struct Aggregator {
    collectors: Collectors,
    snapshots: Arc<SnapshotCache>,
    features: FeatureConfig,
    journal: Option<Arc<JournalResolver>>,
}

impl Aggregator {
    /// Create an aggregator around an injected snapshot cache
    pub fn new(collectors: Collectors, snapshots: SnapshotCache, features: FeatureConfig) -> Self {
        Self {
            collectors,
            snapshots: Arc::new(snapshots),
            features,
            journal: None,
        }
    }

    /// Wire a gateway, collectors and snapshot cache from configuration
    pub fn from_config(
        store: Arc<dyn BlockStore>,
        breadcrumbs: Arc<dyn BreadcrumbSource>,
        config: &KinshipConfig,
    ) -> Self {
        let gateway = Arc::new(BlockGateway::with_ttl(store, config.cache.gateway_ttl()));
        let collectors = Collectors::new(gateway, breadcrumbs, config.breadcrumb.clone());
        Self::new(
            collectors,
            TtlCache::new(config.cache.snapshot_ttl()),
            config.features.clone(),
        )
    }

    /// Include a journal resolver's cache in sweeps
    #[must_use]
    pub fn with_journal(mut self, journal: Arc<JournalResolver>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Gateway shared with the collectors
    pub fn gateway(&self) -> &Arc<BlockGateway> {
        self.collectors.gateway()
    }

    /// Collect every relationship category for `root`.
    ///
    /// A live cached snapshot is returned as-is. When the root block itself
    /// cannot be fetched the pass ends with an empty snapshot, which is not
    /// cached.
    #[tracing::instrument(skip_all, fields(root = %root))]
    pub async fn gather_all_data(&self, root: BlockId) -> Arc<RelatedSnapshot> {
        if let Some(snapshot) = self.snapshots.get(&root) {
            debug!("Snapshot cache hit for {}", root);
            return snapshot;
        }
        debug!("Snapshot cache miss for {}", root);

        let Some(root_block) = self.collectors.gateway().get_block(root).await else {
            warn!("Root block {} could not be fetched; no related items", root);
            return Arc::new(RelatedSnapshot::empty(root));
        };

        let snapshot = Arc::new(self.collect(&root_block).await);
        self.snapshots.insert(root, snapshot.clone());

        info!(
            "Gathered {} related blocks in {} categories for {}",
            snapshot.total(),
            snapshot.categories.len(),
            root
        );
        snapshot
    }

    async fn collect(&self, root: &Block) -> RelatedSnapshot {
        let c = &self.collectors;
        let referenced = c.referenced(root).await;
        let tag_set: HashSet<BlockId> = referenced.tag_ids.iter().copied().collect();

        let alias_blocks = async {
            if self.features.alias_backref_query {
                c.backref_alias_blocks(root).await
            } else {
                Vec::new()
            }
        };

        let (
            children_tags,
            contained_in,
            referencing_alias,
            backrefs,
            alias_blocks,
            recursive,
            child_referenced,
            direct_children,
            recursive_children,
        ) = join!(
            c.children_tags(root),
            c.contained_in(root),
            c.referencing_alias(root),
            c.backrefs(root),
            alias_blocks,
            c.recursive_backrefs(root),
            c.child_referenced(root, &tag_set),
            c.page_direct_children(root),
            c.page_recursive_children(root),
        );

        let tag_ids = crate::block::dedup_ids(
            referenced
                .tag_ids
                .iter()
                .copied()
                .chain(children_tags.iter().map(|b| b.id)),
        );

        let mut snapshot = RelatedSnapshot::empty(root.id);
        snapshot.tag_ids = tag_ids;
        snapshot.contained_in_ids = contained_in.iter().map(|b| b.id).collect();

        use RelationshipCategory::*;
        snapshot.put(Tag, children_tags);
        snapshot.put(ReferencedTag, referenced.tags);
        snapshot.put(PropertyRefAlias, referenced.property_alias);
        snapshot.put(PropertyRefBlock, referenced.property_block);
        snapshot.put(ContainedIn, contained_in);
        snapshot.put(InlineRef, referenced.inline);
        snapshot.put(ReferencingAlias, referencing_alias);
        snapshot.put(ChildReferencedAlias, child_referenced.alias);
        snapshot.put(ChildReferencedTagAlias, child_referenced.tag_alias);
        snapshot.put(ChildReferencedInline, child_referenced.inline);
        snapshot.put(BackrefAliasBlocks, alias_blocks);
        snapshot.put(Backref, backrefs);
        snapshot.put(RecursiveBackref, recursive.plain);
        snapshot.put(RecursiveBackrefAlias, recursive.alias);
        snapshot.put(PageDirectChildren, direct_children);
        snapshot.put(PageRecursiveChildren, recursive_children);
        snapshot
    }

    /// Drop the cached snapshot of `root`
    pub fn invalidate(&self, root: BlockId) -> bool {
        self.snapshots.invalidate(&root)
    }

    /// Sweep the snapshot, gateway and journal caches once
    pub fn sweep_expired(&self) -> usize {
        sweep(&self.snapshots, self.gateway(), self.journal.as_deref())
    }

    /// Snapshot cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.snapshots.stats()
    }

    /// Start a background task sweeping every cache each `interval`.
    ///
    /// The task stops when the returned guard is dropped, or on its own once
    /// the aggregator is gone.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> CacheSweeper {
        let aggregator: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(aggregator) = aggregator.upgrade() else {
                    debug!("Aggregator dropped, stopping cache sweeper");
                    break;
                };
                let removed = aggregator.sweep_expired();
                if removed > 0 {
                    debug!("Swept {} expired cache entries", removed);
                }
            }
        });
        CacheSweeper { handle }
    }
}

/// Handle to a running cache sweep task; aborts the task on drop
#[derive(Debug)]
pub struct CacheSweeper {
    handle: JoinHandle<()>,
}

impl CacheSweeper {
    /// Whether the sweep task has stopped
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn sweep(
    snapshots: &SnapshotCache,
    gateway: &BlockGateway,
    journal: Option<&JournalResolver>,
) -> usize {
    snapshots.sweep_expired()
        + gateway.sweep_expired()
        + journal.map_or(0, JournalResolver::sweep_expired)
}
