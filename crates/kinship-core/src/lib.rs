//! Kinship Core - related-items resolution for block-based notes
//!
//! Given a root block and read access to the host's block graph, this crate
//! discovers every block connected to the root, classifies each connection
//! into one of sixteen [`RelationshipCategory`]s, and turns the result into a
//! de-duplicated, searchable list of display items.
//!
//! ## Pipeline
//!
//! 1. [`BlockGateway`] memoizes raw store calls for a short TTL
//! 2. [`classify`] labels individual references as inline, tag or property value
//! 3. [`Collectors`] gather one category each, best-effort
//! 4. [`Aggregator`] runs the collectors concurrently and caches a per-root
//!    [`RelatedSnapshot`]
//! 5. [`ItemBuilder`] builds [`DisplayItem`]s with searchable text
//! 6. [`build_grouped_items`] merges the categories in precedence order
//!
//! [`RelatedPanel`] ties the pipeline to navigation in the host.

pub mod aggregate;
pub mod block;
pub mod cache;
pub mod category;
pub mod classify;
pub mod collectors;
pub mod date;
pub mod error;
pub mod gateway;
pub mod group;
pub mod host;
pub mod item;
pub mod journal;
pub mod panel;
pub mod retry;
pub mod search;
pub mod store;
pub mod traverse;

pub use aggregate::{Aggregator, CacheSweeper, RelatedSnapshot, SnapshotCache};
pub use block::{Block, BlockId, BlockProperty, BlockRef, ContentFragment};
pub use cache::{CacheStats, TtlCache};
pub use category::RelationshipCategory;
pub use classify::{classify_reference, process_references, ClassRule, Classification, RefClass};
pub use collectors::Collectors;
pub use error::{KinshipError, Result};
pub use gateway::BlockGateway;
pub use group::{build_grouped_items, promote_contained_in, GroupedItems, ItemGroup};
pub use host::{BreadcrumbSource, Navigator, NoBreadcrumb, StaticBreadcrumb};
pub use item::{CategoryItems, DescendantMatch, DisplayItem, ItemBuilder, ParentRef};
pub use journal::JournalResolver;
pub use panel::{PanelOutcome, RelatedPanel, RelatedView};
pub use search::{filter_items, ItemFilter, SearchHit};
pub use store::{BlockStore, BlockTable, MemoryBlockStore, StoreError, StoreOp, StoreResult};
pub use traverse::{depth_first, Neighbors, TraversalLimits, Visit};
