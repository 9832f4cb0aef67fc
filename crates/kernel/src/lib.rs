//! Sentiero navigation kernel.
//!
//! Builds navigation trees from pluggable menu sources, selects the node
//! matching the current request and shapes the tree for rendering through
//! a configurable modifier pipeline.

pub mod cache;
pub mod config;
pub mod error;
pub mod menu;

pub use cache::{CacheStore, MokaCacheStore};
pub use config::Config;
pub use error::{MenuError, MenuResult};
pub use menu::{Menu, MenuRequest, NodesQuery, Processor, Registry};
