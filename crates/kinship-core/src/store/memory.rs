//! In-memory host store
//!
//! Answers every [`StoreOp`] from a map of blocks. Call counts are tracked per
//! operation and failures can be injected per operation, so tests can assert
//! on memoization and on best-effort degradation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::block::{Block, BlockId, BlockRef};
use crate::classify::TAG_REF_TYPE;

use super::{BlockStore, BlockTable, StoreError, StoreOp, StoreResult};

/// Serialized store contents, as read by [`MemoryBlockStore::from_json`]
///
/// A bare JSON array of blocks is accepted as well.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDump {
    pub blocks: Vec<Block>,
    /// `[tag, child]` pairs
    #[serde(default)]
    pub child_tags: Vec<(BlockId, BlockId)>,
    /// Journal page per `YYYY-MM-DD` date
    #[serde(default)]
    pub journals: HashMap<String, BlockId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DumpShape {
    Full(BlockDump),
    Blocks(Vec<Block>),
}

#[derive(Debug, Default)]
struct MemoryState {
    blocks: BTreeMap<BlockId, Block>,
    child_tags: HashMap<BlockId, Vec<BlockId>>,
    journals: HashMap<String, BlockId>,
    failing: HashSet<StoreOp>,
    calls: HashMap<StoreOp, usize>,
}

/// Map-backed [`BlockStore`] and [`BlockTable`]
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryBlockStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `blocks`, with back-references derived from
    /// every block's outgoing references
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        let store = Self::new();
        for block in blocks {
            store.insert(block);
        }
        store.link_back_refs();
        store
    }

    /// Load a store from a JSON dump.
    ///
    /// Back-references are derived from outgoing references unless the dump
    /// already carries them for every block.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let dump = match serde_json::from_str::<DumpShape>(json)? {
            DumpShape::Full(dump) => dump,
            DumpShape::Blocks(blocks) => BlockDump {
                blocks,
                ..BlockDump::default()
            },
        };
        if dump.blocks.is_empty() {
            return Err(crate::KinshipError::dump("no blocks"));
        }

        let has_back_refs = dump.blocks.iter().any(|b| !b.back_refs.is_empty());
        let store = Self::new();
        for block in dump.blocks {
            store.insert(block);
        }
        if !has_back_refs {
            store.link_back_refs();
        }
        for (tag, child) in dump.child_tags {
            store.add_child_tag(tag, child);
        }
        for (date, id) in dump.journals {
            store.add_journal(date, id);
        }
        Ok(store)
    }

    /// Insert or replace a block as-is
    pub fn insert(&self, block: Block) {
        self.state.write().blocks.insert(block.id, block);
    }

    /// Rebuild every block's `back_refs` from the outgoing references
    pub fn link_back_refs(&self) {
        let mut state = self.state.write();

        let mut incoming: HashMap<BlockId, Vec<BlockRef>> = HashMap::new();
        for block in state.blocks.values() {
            for reference in &block.refs {
                incoming
                    .entry(reference.to)
                    .or_default()
                    .push(reference.clone());
            }
        }

        for block in state.blocks.values_mut() {
            block.back_refs = incoming.remove(&block.id).unwrap_or_default();
        }
    }

    /// Register `child` as a child tag of `tag`
    pub fn add_child_tag(&self, tag: impl Into<BlockId>, child: impl Into<BlockId>) {
        self.state
            .write()
            .child_tags
            .entry(tag.into())
            .or_default()
            .push(child.into());
    }

    /// Register the journal page for a `YYYY-MM-DD` date
    pub fn add_journal(&self, date: impl Into<String>, id: impl Into<BlockId>) {
        self.state.write().journals.insert(date.into(), id.into());
    }

    /// Make every call to `op` fail until [`Self::heal`] is called
    pub fn fail_on(&self, op: StoreOp) {
        self.state.write().failing.insert(op);
    }

    /// Stop injecting failures
    pub fn heal(&self) {
        self.state.write().failing.clear();
    }

    /// Number of times `op` has been invoked
    pub fn call_count(&self, op: StoreOp) -> usize {
        self.state.read().calls.get(&op).copied().unwrap_or(0)
    }

    /// Total number of invocations across all operations
    pub fn total_calls(&self) -> usize {
        self.state.read().calls.values().sum()
    }

    /// Number of stored blocks
    pub fn len(&self) -> usize {
        self.state.read().blocks.len()
    }

    /// Whether the store holds no blocks
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn block_value(state: &MemoryState, id: BlockId) -> StoreResult<Value> {
        match state.blocks.get(&id) {
            Some(block) => Ok(serde_json::to_value(block)?),
            None => Ok(Value::Null),
        }
    }

    fn blocks_value(state: &MemoryState, ids: &[BlockId]) -> StoreResult<Value> {
        let blocks: Vec<&Block> = ids.iter().filter_map(|id| state.blocks.get(id)).collect();
        Ok(serde_json::to_value(blocks)?)
    }

    fn tagged_with(state: &MemoryState, tag: BlockId) -> Vec<BlockId> {
        state
            .blocks
            .values()
            .filter(|block| {
                block
                    .refs
                    .iter()
                    .any(|r| r.to == tag && r.ref_type == TAG_REF_TYPE)
            })
            .map(|block| block.id)
            .collect()
    }
}

fn id_arg(op: StoreOp, args: &[Value]) -> StoreResult<BlockId> {
    args.first()
        .and_then(Value::as_i64)
        .map(BlockId)
        .ok_or_else(|| StoreError::invalid_arguments(op.as_str(), "expected a block id"))
}

fn str_arg(op: StoreOp, args: &[Value]) -> StoreResult<String> {
    args.first()
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::invalid_arguments(op.as_str(), "expected a string"))
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn invoke(&self, op: StoreOp, args: &[Value]) -> StoreResult<Value> {
        {
            let mut state = self.state.write();
            *state.calls.entry(op).or_insert(0) += 1;
            if state.failing.contains(&op) {
                return Err(StoreError::Unavailable(format!("injected failure for {}", op)));
            }
        }

        let state = self.state.read();
        match op {
            StoreOp::GetBlock => Self::block_value(&state, id_arg(op, args)?),
            StoreOp::GetBlocks => {
                let ids: Vec<BlockId> = match args.first() {
                    Some(value) => serde_json::from_value(value.clone())?,
                    None => return Err(StoreError::invalid_arguments(op.as_str(), "expected ids")),
                };
                Self::blocks_value(&state, &ids)
            }
            StoreOp::GetChildrenTags => {
                let tag = id_arg(op, args)?;
                let children = state.child_tags.get(&tag).cloned().unwrap_or_default();
                Self::blocks_value(&state, &children)
            }
            StoreOp::GetChildrenTagBlocks => {
                let tag = id_arg(op, args)?;
                let tagged = Self::tagged_with(&state, tag);
                Self::blocks_value(&state, &tagged)
            }
            StoreOp::GetBlockIdByAlias => {
                let alias = str_arg(op, args)?;
                let found = state
                    .blocks
                    .values()
                    .find(|block| block.aliases.iter().any(|a| a == &alias));
                Ok(found.map_or(Value::Null, |block| json!({ "id": block.id })))
            }
            StoreOp::GetJournalBlock => {
                let date = str_arg(op, args)?;
                Ok(state
                    .journals
                    .get(&date)
                    .map_or(Value::Null, |id| json!({ "id": id })))
            }
        }
    }
}

impl BlockTable for MemoryBlockStore {
    fn block(&self, id: BlockId) -> Option<Block> {
        self.state.read().blocks.get(&id).cloned()
    }
}
