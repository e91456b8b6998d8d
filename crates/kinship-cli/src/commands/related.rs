//! `kinship related`: resolve and print the related items of one block

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use kinship_config::KinshipConfig;
use kinship_core::{
    build_grouped_items, filter_items, Aggregator, BlockId, BlockTable, BreadcrumbSource,
    GroupedItems, ItemBuilder, ItemFilter, JournalResolver, MemoryBlockStore, NoBreadcrumb,
    RelationshipCategory, SearchHit, StaticBreadcrumb,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::output;

/// Arguments of the `related` command
#[derive(Debug, Clone)]
pub struct RelatedArgs {
    pub root: i64,
    pub blocks: PathBuf,
    pub query: Option<String>,
    pub categories: Vec<RelationshipCategory>,
    pub breadcrumb: Option<String>,
}

impl RelatedArgs {
    fn filter(&self) -> Option<ItemFilter> {
        if self.query.is_none() && self.categories.is_empty() {
            return None;
        }
        let mut filter = ItemFilter::new(self.query.clone().unwrap_or_default());
        filter.categories.extend(self.categories.iter().copied());
        Some(filter)
    }
}

/// What the command prints
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RelatedOutput {
    /// Every related item, grouped by category
    Grouped(GroupedItems),
    /// Items matching a query or category filter, contained-in items first
    Hits(Vec<SearchHit>),
}

pub async fn execute(config: &KinshipConfig, args: RelatedArgs, format: OutputFormat) -> Result<()> {
    let result = run(config, &args).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Table => match &result {
            RelatedOutput::Grouped(grouped) => print!("{}", output::grouped_table(grouped)),
            RelatedOutput::Hits(hits) => print!("{}", output::hits_table(hits)),
        },
    }
    Ok(())
}

/// Load the block dump and run the whole related-items pipeline
pub async fn run(config: &KinshipConfig, args: &RelatedArgs) -> Result<RelatedOutput> {
    let text = tokio::fs::read_to_string(&args.blocks)
        .await
        .with_context(|| format!("Failed to read block dump {}", args.blocks.display()))?;
    let store = MemoryBlockStore::from_json(&text)
        .with_context(|| format!("Invalid block dump {}", args.blocks.display()))?;
    debug!("Loaded {} blocks from {}", store.len(), args.blocks.display());

    let root = BlockId(args.root);
    if store.block(root).is_none() {
        bail!("Block {} is not in {}", root, args.blocks.display());
    }

    let breadcrumbs: Arc<dyn BreadcrumbSource> = match &args.breadcrumb {
        Some(text) => Arc::new(StaticBreadcrumb(Some(text.clone()))),
        None => Arc::new(NoBreadcrumb),
    };

    let table = Arc::new(store.clone());
    let mut aggregator = Aggregator::from_config(Arc::new(store), breadcrumbs, config);
    let mut builder = ItemBuilder::new(aggregator.gateway().clone(), table, config.search.clone());

    if config.features.journal_pages {
        let journal = Arc::new(JournalResolver::new(
            aggregator.gateway().clone(),
            config.cache.journal_ttl(),
        ));
        aggregator = aggregator.with_journal(journal.clone());
        builder = builder.with_journal(journal);
    }

    let aggregator = Arc::new(aggregator);
    let _sweeper = aggregator.spawn_sweeper(config.cache.sweep_interval());

    let snapshot = aggregator.gather_all_data(root).await;
    let lists = builder.build_items(&snapshot).await;
    let grouped = build_grouped_items(&lists, &snapshot.tag_ids, &snapshot.contained_in_ids);
    info!("{} related items for {}", grouped.len(), root);

    Ok(match args.filter() {
        Some(filter) => RelatedOutput::Hits(filter_items(&grouped.presentation_order(), &filter)),
        None => RelatedOutput::Grouped(grouped),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DUMP: &str = r#"{
        "blocks": [
            {"id": 1, "aliases": ["Trip"], "children": [2]},
            {"id": 2, "text": "Packing list", "parent": 1},
            {"id": 3, "text": "Booked the trip", "refs": [{"from": 3, "to": 1, "type": 1}]},
            {"id": 4, "aliases": ["Travel"]}
        ],
        "childTags": [[4, 1]]
    }"#;

    fn dump() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(DUMP.as_bytes()).unwrap();
        file
    }

    fn args(file: &tempfile::NamedTempFile, root: i64) -> RelatedArgs {
        RelatedArgs {
            root,
            blocks: file.path().to_path_buf(),
            query: None,
            categories: Vec::new(),
            breadcrumb: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_grouped_output() {
        let file = dump();
        let output = run(&KinshipConfig::default(), &args(&file, 1)).await.unwrap();

        let RelatedOutput::Grouped(grouped) = output else {
            panic!("expected grouped output");
        };
        let ids = |category| -> Vec<i64> {
            grouped.group(category).iter().map(|i| i.id.get()).collect()
        };
        assert_eq!(ids(RelationshipCategory::PageDirectChildren), vec![2]);
        assert_eq!(ids(RelationshipCategory::Backref), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breadcrumb_and_query() {
        let file = dump();
        let mut args = args(&file, 1);
        args.breadcrumb = Some("Travel / Trip".into());
        args.query = Some("travel".into());

        let output = run(&KinshipConfig::default(), &args).await.unwrap();

        let RelatedOutput::Hits(hits) = output else {
            panic!("expected search hits");
        };
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id, BlockId(4));
        assert_eq!(hits[0].item.category, RelationshipCategory::ContainedIn);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_root_is_an_error() {
        let file = dump();
        let err = run(&KinshipConfig::default(), &args(&file, 99)).await.unwrap_err();
        assert!(err.to_string().contains("99"));
    }
}
