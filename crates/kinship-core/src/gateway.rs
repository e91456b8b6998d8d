//! Block store gateway
//!
//! A thin request/response facade over [`BlockStore`] that memoizes raw calls
//! by `(operation, serialized arguments)` for a short TTL. Collectors running
//! in the same aggregation pass frequently ask for the same blocks; the memo
//! turns those repeats into map lookups. Identical calls issued while one is
//! still pending share that pending call instead of reaching the store again.
//!
//! [`BlockGateway::call`] propagates store failures unchanged. The typed
//! wrappers (`get_block`, `get_blocks`, ...) swallow them, log, and return an
//! empty fallback so one failed sub-fetch never aborts a whole pass.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::block::{Block, BlockId};
use crate::cache::{CacheStats, TtlCache};
use crate::store::{BlockStore, StoreOp, StoreResult};

/// Default lifetime of a memoized store call
pub const DEFAULT_GATEWAY_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct IdHolder {
    id: BlockId,
}

type PendingCall = Shared<BoxFuture<'static, StoreResult<Value>>>;

/// Memoizing facade over the host store
pub struct BlockGateway {
    store: Arc<dyn BlockStore>,
    memo: TtlCache<String, Value>,
    inflight: Mutex<HashMap<String, PendingCall>>,
}

impl BlockGateway {
    /// Create a gateway with the default memo lifetime
    pub fn new(store: Arc<dyn BlockStore>) -> Self {
        Self::with_ttl(store, DEFAULT_GATEWAY_TTL)
    }

    /// Create a gateway with a custom memo lifetime
    pub fn with_ttl(store: Arc<dyn BlockStore>, ttl: Duration) -> Self {
        Self {
            store,
            memo: TtlCache::new(ttl),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Invoke `op`, answering from the memo when a live entry exists.
    ///
    /// Concurrent identical calls share one store invocation. Failures are
    /// not memoized and are returned to every waiting caller as-is.
    pub async fn call(&self, op: StoreOp, args: &[Value]) -> StoreResult<Value> {
        let key = memo_key(op, args)?;

        if let Some(hit) = self.memo.get(&key) {
            debug!("Gateway memo hit: {}", key);
            return Ok(hit);
        }

        let pending = {
            let mut inflight = self.inflight.lock();
            // A call may have finished since the first lookup
            if self.memo.contains(&key) {
                if let Some(hit) = self.memo.get(&key) {
                    return Ok(hit);
                }
            }
            if let Some(pending) = inflight.get(&key) {
                debug!("Joining pending store call: {}", key);
                pending.clone()
            } else {
                let store = self.store.clone();
                let args = args.to_vec();
                let pending = async move { store.invoke(op, &args).await }.boxed().shared();
                inflight.insert(key.clone(), pending.clone());
                pending
            }
        };

        let result = pending.clone().await;

        let mut inflight = self.inflight.lock();
        if inflight.get(&key).is_some_and(|current| current.ptr_eq(&pending)) {
            inflight.remove(&key);
            if let Ok(value) = &result {
                self.memo.insert(key, value.clone());
            }
        }
        result
    }

    /// Invoke `op` and decode its answer
    pub async fn call_as<T: DeserializeOwned>(&self, op: StoreOp, args: &[Value]) -> StoreResult<T> {
        let value = self.call(op, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch one block; `None` when missing or on failure
    pub async fn get_block(&self, id: BlockId) -> Option<Block> {
        match self
            .call_as::<Option<Block>>(StoreOp::GetBlock, &[json!(id)])
            .await
        {
            Ok(block) => block,
            Err(e) => {
                warn!("get-block {} failed: {}", id, e);
                None
            }
        }
    }

    /// Fetch several blocks in one call; empty on failure.
    ///
    /// Missing ids are skipped. An empty request never reaches the store.
    pub async fn get_blocks(&self, ids: &[BlockId]) -> Vec<Block> {
        if ids.is_empty() {
            return Vec::new();
        }
        match self
            .call_as::<Vec<Block>>(StoreOp::GetBlocks, &[json!(ids)])
            .await
        {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!("get-blocks ({} ids) failed: {}", ids.len(), e);
                Vec::new()
            }
        }
    }

    /// Child tags of a tag block; empty on failure
    pub async fn get_children_tags(&self, id: BlockId) -> Vec<Block> {
        match self
            .call_as::<Option<Vec<Block>>>(StoreOp::GetChildrenTags, &[json!(id)])
            .await
        {
            Ok(blocks) => blocks.unwrap_or_default(),
            Err(e) => {
                warn!("get-children-tags {} failed: {}", id, e);
                Vec::new()
            }
        }
    }

    /// Resolve an alias to a block id; `None` when unknown or on failure
    pub async fn get_block_id_by_alias(&self, alias: &str) -> Option<BlockId> {
        match self
            .call_as::<Option<IdHolder>>(StoreOp::GetBlockIdByAlias, &[json!(alias)])
            .await
        {
            Ok(found) => found.map(|holder| holder.id),
            Err(e) => {
                warn!("get-blockid-by-alias {:?} failed: {}", alias, e);
                None
            }
        }
    }

    /// Resolve the journal page for a `YYYY-MM-DD` date.
    ///
    /// Unlike the other wrappers this one reports failures, so the journal
    /// cache can tell "no journal page" apart from "could not ask".
    pub async fn get_journal_block(&self, date: &str) -> StoreResult<Option<BlockId>> {
        let found = self
            .call_as::<Option<IdHolder>>(StoreOp::GetJournalBlock, &[json!(date)])
            .await?;
        Ok(found.map(|holder| holder.id))
    }

    /// Drop expired memo entries, returning how many were removed
    pub fn sweep_expired(&self) -> usize {
        self.memo.sweep_expired()
    }

    /// Forget every memoized call; pending calls finish without being memoized
    pub fn clear(&self) {
        self.inflight.lock().clear();
        self.memo.clear();
    }

    /// Memo usage statistics
    pub fn stats(&self) -> CacheStats {
        self.memo.stats()
    }
}

fn memo_key(op: StoreOp, args: &[Value]) -> StoreResult<String> {
    // serde_json objects are BTreeMap-backed, so serialization is key-order stable
    let serialized = serde_json::to_string(args)?;
    Ok(format!("{}:{}", op.as_str(), serialized))
}
