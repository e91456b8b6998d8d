//! Journal page resolution
//!
//! Date-like blocks link to the journal page of their date. Resolving a
//! journal page costs a store call, and the answer rarely changes, so
//! resolutions (including "no journal page for that date") are cached per
//! calendar date with a TTL longer than the snapshot cache's.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::block::BlockId;
use crate::cache::{CacheStats, TtlCache};
use crate::gateway::BlockGateway;

/// Default lifetime of a journal resolution
pub const DEFAULT_JOURNAL_TTL: Duration = Duration::from_secs(30 * 60);

/// Resolves `date -> journal page id` through the store, with a date-keyed cache
pub struct JournalResolver {
    gateway: Arc<BlockGateway>,
    cache: TtlCache<String, Option<BlockId>>,
}

impl JournalResolver {
    pub fn new(gateway: Arc<BlockGateway>, ttl: Duration) -> Self {
        Self {
            gateway,
            cache: TtlCache::new(ttl),
        }
    }

    /// Journal page for `date`, if the host has one.
    ///
    /// Store failures are logged and answered with `None`. Transient ones
    /// are not cached, so the next call asks again; any other failure would
    /// repeat and is cached as a miss.
    pub async fn resolve(&self, date: NaiveDate) -> Option<BlockId> {
        let key = date_key(date);

        if let Some(cached) = self.cache.get(&key) {
            debug!("Journal cache hit for {}", key);
            return cached;
        }

        match self.gateway.get_journal_block(&key).await {
            Ok(found) => {
                self.cache.insert(key, found);
                found
            }
            Err(e) => {
                warn!("get-journal-block {} failed: {}", key, e);
                if !e.is_retryable() {
                    self.cache.insert(key, None);
                }
                None
            }
        }
    }

    /// Drop expired resolutions, returning how many were removed
    pub fn sweep_expired(&self) -> usize {
        self.cache.sweep_expired()
    }

    /// Cache usage statistics
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// `YYYY-MM-DD` cache and lookup key
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::store::{BlockStore, MemoryBlockStore, StoreError, StoreOp, StoreResult};
    use async_trait::async_trait;
    use serde_json::Value;

    fn resolver(store: &MemoryBlockStore) -> JournalResolver {
        // Gateway memo disabled so call counts reflect the journal cache alone
        let gateway = BlockGateway::with_ttl(Arc::new(store.clone()), Duration::ZERO);
        JournalResolver::new(Arc::new(gateway), DEFAULT_JOURNAL_TTL)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_resolves_and_caches_hits_and_misses() {
        let store = MemoryBlockStore::from_blocks(vec![Block::new(7).with_text("2024-01-01")]);
        store.add_journal("2024-01-01", 7);
        let resolver = resolver(&store);

        assert_eq!(resolver.resolve(day(2024, 1, 1)).await, Some(BlockId(7)));
        assert_eq!(resolver.resolve(day(2024, 1, 1)).await, Some(BlockId(7)));
        assert_eq!(resolver.resolve(day(2024, 1, 2)).await, None);
        assert_eq!(resolver.resolve(day(2024, 1, 2)).await, None);

        assert_eq!(store.call_count(StoreOp::GetJournalBlock), 2);
        assert_eq!(resolver.stats().hits, 2);
    }

    /// Answers every journal lookup with a backend error
    struct BrokenJournal(MemoryBlockStore);

    #[async_trait]
    impl BlockStore for BrokenJournal {
        async fn invoke(&self, op: StoreOp, args: &[Value]) -> StoreResult<Value> {
            let answer = self.0.invoke(op, args).await;
            if op == StoreOp::GetJournalBlock {
                return Err(StoreError::backend("journal plugin missing"));
            }
            answer
        }
    }

    #[tokio::test]
    async fn test_permanent_failure_is_cached_as_miss() {
        let store = MemoryBlockStore::new();
        let gateway = BlockGateway::with_ttl(Arc::new(BrokenJournal(store.clone())), Duration::ZERO);
        let resolver = JournalResolver::new(Arc::new(gateway), DEFAULT_JOURNAL_TTL);

        assert_eq!(resolver.resolve(day(2024, 3, 5)).await, None);
        assert_eq!(resolver.resolve(day(2024, 3, 5)).await, None);

        assert_eq!(store.call_count(StoreOp::GetJournalBlock), 1);
        assert_eq!(resolver.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_not_cached() {
        let store = MemoryBlockStore::new();
        store.add_journal("2024-03-05", 9);
        store.fail_on(StoreOp::GetJournalBlock);
        let resolver = resolver(&store);

        assert_eq!(resolver.resolve(day(2024, 3, 5)).await, None);
        store.heal();
        assert_eq!(resolver.resolve(day(2024, 3, 5)).await, Some(BlockId(9)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryBlockStore::new();
        let gateway = BlockGateway::with_ttl(Arc::new(store.clone()), Duration::ZERO);
        let resolver = JournalResolver::new(Arc::new(gateway), Duration::from_secs(60));

        resolver.resolve(day(2024, 1, 1)).await;
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(resolver.sweep_expired(), 1);
    }

    #[test]
    fn test_date_key_format() {
        assert_eq!(date_key(day(2024, 1, 5)), "2024-01-05");
    }
}
