//! Blocks enclosing the root in the rendered tag hierarchy

use tracing::debug;

use super::{finalize, ids_without, Collectors};
use crate::block::Block;
use crate::category::RelationshipCategory;
use crate::retry::retry_fixed;

const SEPARATORS: [char; 4] = ['/', '›', '»', '>'];

/// Split a rendered breadcrumb into its segment names.
///
/// Empty segments are dropped; surrounding whitespace is trimmed.
pub fn parse_breadcrumb(text: &str) -> Vec<String> {
    text.split(|c: char| SEPARATORS.contains(&c))
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

impl Collectors {
    /// Blocks named by the breadcrumb rendered around the root.
    ///
    /// The breadcrumb may not be rendered yet when the pass starts, so reads
    /// are retried with a fixed backoff before giving up with an empty list.
    #[tracing::instrument(skip(self, root), fields(root = %root.id))]
    pub async fn contained_in(&self, root: &Block) -> Vec<Block> {
        let attempts = self.breadcrumb_config.max_attempts;
        let delay = self.breadcrumb_config.backoff();

        let segments = retry_fixed(attempts, delay, |_| {
            let text = self.breadcrumbs.breadcrumb_text(root.id);
            async move {
                text.map(|text| parse_breadcrumb(&text))
                    .filter(|segments| !segments.is_empty())
            }
        })
        .await;

        let Some(segments) = segments else {
            debug!("contained-in: no breadcrumb after {} attempts", attempts);
            return Vec::new();
        };

        let root_names: Vec<&str> = root
            .aliases
            .iter()
            .map(String::as_str)
            .chain(root.text())
            .collect();

        let mut ids = Vec::new();
        for segment in segments.iter().filter(|s| !root_names.contains(&s.as_str())) {
            if let Some(id) = self.gateway.get_block_id_by_alias(segment).await {
                ids.push(id);
            }
        }

        let ids = ids_without(ids, root.id);
        let blocks = finalize(
            RelationshipCategory::ContainedIn,
            self.gateway.get_blocks(&ids).await,
            root.id,
        );
        debug!("contained-in: {}", blocks.len());
        blocks
    }
}
