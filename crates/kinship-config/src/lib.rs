//! # Kinship Configuration Library
//!
//! Typed settings for the related-items engine: which optional queries run,
//! how long each cache keeps its entries, how hard the breadcrumb lookup
//! retries, how deep search indexing descends and how logging is filtered.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kinship_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("kinship.toml").await?;
//!     println!("snapshot ttl: {:?}", config.cache.snapshot_ttl());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod loader;

pub use config::*;
pub use loader::*;
