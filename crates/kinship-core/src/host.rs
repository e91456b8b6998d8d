//! Host-side capabilities outside the block store
//!
//! - [`BreadcrumbSource`] reads the rendered tag-hierarchy breadcrumb around
//!   the open page
//! - [`Navigator`] opens a block in the host editor

use crate::block::BlockId;

/// Provides the breadcrumb text currently rendered for a root block
///
/// Returns `None` while nothing is rendered yet; callers retry.
pub trait BreadcrumbSource: Send + Sync {
    fn breadcrumb_text(&self, root: BlockId) -> Option<String>;
}

/// Fixed breadcrumb text, for hosts that compute it up front and for tests
#[derive(Debug, Clone, Default)]
pub struct StaticBreadcrumb(pub Option<String>);

impl BreadcrumbSource for StaticBreadcrumb {
    fn breadcrumb_text(&self, _root: BlockId) -> Option<String> {
        self.0.clone()
    }
}

/// No breadcrumb is ever rendered
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBreadcrumb;

impl BreadcrumbSource for NoBreadcrumb {
    fn breadcrumb_text(&self, _root: BlockId) -> Option<String> {
        None
    }
}

/// Outbound navigation commands
pub trait Navigator: Send + Sync {
    /// Open a block in the main view
    fn open_block(&self, id: BlockId);

    /// Open a block in a side view
    fn open_block_in_side_view(&self, id: BlockId);
}
