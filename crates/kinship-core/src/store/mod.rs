//! Host block store capabilities
//!
//! The host owns block storage. This crate only consumes two read-side
//! capabilities from it:
//!
//! - [`BlockStore`] - the async request/response query surface
//! - [`BlockTable`] - the synchronous in-memory block table used for
//!   parent lookups
//!
//! [`MemoryBlockStore`] implements both over a plain map and is used by the
//! command-line driver and the test suites.

pub mod error;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::block::{Block, BlockId};

pub use error::{StoreError, StoreResult};
pub use memory::{BlockDump, MemoryBlockStore};

/// Operations understood by the host query surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `get-block(id)` -> block or null
    GetBlock,
    /// `get-blocks(ids[])` -> blocks that exist, in request order
    GetBlocks,
    /// `get-children-tag-blocks(id)` -> blocks tagged with the tag `id`
    GetChildrenTagBlocks,
    /// `get-children-tags(id)` -> child tags of the tag `id`
    GetChildrenTags,
    /// `get-blockid-by-alias(alias)` -> `{id}` or null
    GetBlockIdByAlias,
    /// `get-journal-block(date)` -> `{id}` or null
    GetJournalBlock,
}

impl StoreOp {
    /// Wire name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOp::GetBlock => "get-block",
            StoreOp::GetBlocks => "get-blocks",
            StoreOp::GetChildrenTagBlocks => "get-children-tag-blocks",
            StoreOp::GetChildrenTags => "get-children-tags",
            StoreOp::GetBlockIdByAlias => "get-blockid-by-alias",
            StoreOp::GetJournalBlock => "get-journal-block",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Async query surface of the host
///
/// Arguments and results are JSON values, exactly as the host exchanges them.
/// Implementations must not retry internally; callers decide what a failure
/// means.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Run `op` with positional `args`
    async fn invoke(&self, op: StoreOp, args: &[Value]) -> StoreResult<Value>;
}

/// Read-only view of the host's in-memory block table
pub trait BlockTable: Send + Sync {
    /// Look up a loaded block by id
    fn block(&self, id: BlockId) -> Option<Block>;
}
