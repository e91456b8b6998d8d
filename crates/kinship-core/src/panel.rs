//! Related-items panel session
//!
//! Tracks which root the panel shows and guards against out-of-order
//! completions: every navigation takes a new generation number, and a pass
//! that finishes after a newer navigation started is discarded instead of
//! replacing the newer view. Revisiting the shown root also takes a
//! generation, so a slower pass for another root cannot land afterwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::aggregate::{Aggregator, CacheSweeper};
use crate::block::BlockId;
use crate::group::{build_grouped_items, GroupedItems};
use crate::host::Navigator;
use crate::item::{DisplayItem, ItemBuilder};
use crate::search::{filter_items, ItemFilter, SearchHit};

/// Grouped related items of one root
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedView {
    pub root: BlockId,
    pub grouped: GroupedItems,
}

/// Result of [`RelatedPanel::navigate`]
#[derive(Debug, Clone, PartialEq)]
pub enum PanelOutcome {
    /// The root was already shown; nothing was recomputed
    Unchanged(Arc<RelatedView>),
    /// A fresh view was computed and is now shown
    Updated(Arc<RelatedView>),
    /// A newer navigation started while this one ran; its result was dropped
    Superseded,
}

/// Related-items panel for the block open in the host
pub struct RelatedPanel {
    aggregator: Arc<Aggregator>,
    builder: Arc<ItemBuilder>,
    navigator: Arc<dyn Navigator>,
    generation: AtomicU64,
    view: Mutex<Option<Arc<RelatedView>>>,
    // Held for its drop, which stops the sweep task
    _sweeper: Option<CacheSweeper>,
}

impl RelatedPanel {
    pub fn new(
        aggregator: Arc<Aggregator>,
        builder: Arc<ItemBuilder>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            aggregator,
            builder,
            navigator,
            generation: AtomicU64::new(0),
            view: Mutex::new(None),
            _sweeper: None,
        }
    }

    /// Sweep the aggregator's caches every `interval` for as long as the
    /// panel lives
    #[must_use]
    pub fn with_cache_sweeper(mut self, interval: Duration) -> Self {
        self._sweeper = Some(self.aggregator.spawn_sweeper(interval));
        self
    }

    /// Show the related items of `root`
    #[tracing::instrument(skip_all, fields(root = %root))]
    pub async fn navigate(&self, root: BlockId) -> PanelOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(view) = self.current().filter(|view| view.root == root) {
            debug!("Root {} unchanged, keeping the current view", root);
            return PanelOutcome::Unchanged(view);
        }

        let snapshot = self.aggregator.gather_all_data(root).await;
        let lists = self.builder.build_items(&snapshot).await;
        let grouped = build_grouped_items(&lists, &snapshot.tag_ids, &snapshot.contained_in_ids);

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Navigation to {} superseded (generation {})", root, generation);
            return PanelOutcome::Superseded;
        }

        let view = Arc::new(RelatedView { root, grouped });
        *self.view.lock() = Some(view.clone());
        info!("Showing {} related items for {}", view.grouped.len(), root);
        PanelOutcome::Updated(view)
    }

    /// Recompute the current root, bypassing the snapshot cache and the
    /// gateway memo
    pub async fn refresh(&self) -> Option<PanelOutcome> {
        let root = self.view.lock().take()?.root;
        self.aggregator.invalidate(root);
        self.aggregator.gateway().clear();
        Some(self.navigate(root).await)
    }

    /// The view currently shown
    pub fn current(&self) -> Option<Arc<RelatedView>> {
        self.view.lock().clone()
    }

    /// Filter the current view, contained-in items first
    pub fn search(&self, filter: &ItemFilter) -> Vec<SearchHit> {
        match self.current() {
            Some(view) => filter_items(&view.grouped.presentation_order(), filter),
            None => Vec::new(),
        }
    }

    /// Open an item in the host; date-like items open their journal page
    pub fn open(&self, item: &DisplayItem, in_side_view: bool) {
        let target = item.target();
        if in_side_view {
            self.navigator.open_block_in_side_view(target);
        } else {
            self.navigator.open_block(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockRef};
    use crate::category::RelationshipCategory;
    use crate::host::NoBreadcrumb;
    use crate::store::{BlockStore, MemoryBlockStore, StoreOp, StoreResult};
    use async_trait::async_trait;
    use kinship_config::{KinshipConfig, SearchConfig};
    use serde_json::{json, Value};

    #[derive(Default)]
    struct RecordingNavigator {
        opened: Mutex<Vec<(BlockId, bool)>>,
    }

    impl Navigator for RecordingNavigator {
        fn open_block(&self, id: BlockId) {
            self.opened.lock().push((id, false));
        }

        fn open_block_in_side_view(&self, id: BlockId) {
            self.opened.lock().push((id, true));
        }
    }

    /// Delays fetching one root block
    struct SlowRoot {
        inner: MemoryBlockStore,
        slow: BlockId,
    }

    #[async_trait]
    impl BlockStore for SlowRoot {
        async fn invoke(&self, op: StoreOp, args: &[Value]) -> StoreResult<Value> {
            if op == StoreOp::GetBlock && args.first() == Some(&json!(self.slow)) {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            self.inner.invoke(op, args).await
        }
    }

    fn store() -> MemoryBlockStore {
        MemoryBlockStore::from_blocks(vec![
            Block::new(1).with_alias("First"),
            Block::new(2).with_alias("Second"),
            Block::new(3).with_text("mentions first").with_ref(BlockRef::new(3, 1, 1)),
            Block::new(4).with_text("mentions second").with_ref(BlockRef::new(4, 2, 1)),
        ])
    }

    fn panel(
        store: Arc<dyn BlockStore>,
        table: MemoryBlockStore,
        navigator: Arc<dyn Navigator>,
    ) -> RelatedPanel {
        let config = KinshipConfig::default();
        let aggregator = Aggregator::from_config(store, Arc::new(NoBreadcrumb), &config);
        let builder = ItemBuilder::new(
            aggregator.gateway().clone(),
            Arc::new(table),
            SearchConfig::default(),
        );
        RelatedPanel::new(Arc::new(aggregator), Arc::new(builder), navigator)
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_root_short_circuits() {
        let store = store();
        let panel = panel(Arc::new(store.clone()), store.clone(), Arc::new(RecordingNavigator::default()));

        assert!(matches!(panel.navigate(BlockId(1)).await, PanelOutcome::Updated(_)));
        let calls = store.total_calls();
        assert!(matches!(panel.navigate(BlockId(1)).await, PanelOutcome::Unchanged(_)));
        assert_eq!(store.total_calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_navigation_is_superseded() {
        let store = store();
        let slow = SlowRoot {
            inner: store.clone(),
            slow: BlockId(1),
        };
        let panel = panel(Arc::new(slow), store, Arc::new(RecordingNavigator::default()));

        let (first, second) = futures::join!(panel.navigate(BlockId(1)), panel.navigate(BlockId(2)));

        assert_eq!(first, PanelOutcome::Superseded);
        assert!(matches!(second, PanelOutcome::Updated(_)));
        assert_eq!(panel.current().map(|v| v.root), Some(BlockId(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_return_to_shown_root_supersedes_pending_navigation() {
        let store = store();
        let slow = SlowRoot {
            inner: store.clone(),
            slow: BlockId(2),
        };
        let panel = panel(Arc::new(slow), store, Arc::new(RecordingNavigator::default()));
        assert!(matches!(panel.navigate(BlockId(1)).await, PanelOutcome::Updated(_)));

        let (away, back) = futures::join!(panel.navigate(BlockId(2)), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            panel.navigate(BlockId(1)).await
        });

        assert!(matches!(back, PanelOutcome::Unchanged(_)));
        assert_eq!(away, PanelOutcome::Superseded);
        assert_eq!(panel.current().map(|v| v.root), Some(BlockId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_sweeper_runs_with_panel() {
        let store = store();
        let panel = panel(Arc::new(store.clone()), store, Arc::new(RecordingNavigator::default()))
            .with_cache_sweeper(Duration::from_secs(60));
        panel.navigate(BlockId(1)).await;
        assert_eq!(panel.aggregator.cache_stats().entry_count, 1);

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(panel.aggregator.cache_stats().entry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_and_open() {
        let store = store();
        let navigator = Arc::new(RecordingNavigator::default());
        let panel = panel(Arc::new(store.clone()), store, navigator.clone());
        panel.navigate(BlockId(1)).await;

        let hits = panel.search(&ItemFilter::new("MENTIONS"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.category, RelationshipCategory::Backref);

        panel.open(&hits[0].item, true);
        assert_eq!(*navigator.opened.lock(), vec![(BlockId(3), true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_recomputes() {
        let store = store();
        let panel = panel(Arc::new(store.clone()), store.clone(), Arc::new(RecordingNavigator::default()));
        assert!(panel.refresh().await.is_none());

        panel.navigate(BlockId(1)).await;
        store.insert(Block::new(5).with_text("late mention").with_ref(BlockRef::new(5, 1, 1)));
        store.link_back_refs();

        let outcome = panel.refresh().await;
        let Some(PanelOutcome::Updated(view)) = outcome else {
            panic!("expected a fresh view");
        };
        assert_eq!(view.grouped.group(RelationshipCategory::Backref).len(), 2);
    }
}
