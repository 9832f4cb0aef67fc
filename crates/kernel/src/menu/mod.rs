//! Navigation menu engine.
//!
//! Menus produce flat node lists; the [`Processor`] merges them into one
//! tree per menuconf, caches it, selects the node matching the request
//! path and runs the configured modifiers over it:
//! - [`builder`]: merging menu output into an arena tree
//! - [`paths`]: path index and selected node lookup
//! - [`modifiers`]: built-in tree transformations
//! - [`template`]: operations for the presentation layer

pub mod builder;
pub mod data;
pub mod metadata;
pub mod metatags;
pub mod modifier;
pub mod modifiers;
pub mod node;
pub mod paths;
pub mod processor;
pub mod registry;
pub mod request;
pub mod router;
pub mod settings;
pub mod source;
pub mod template;
pub mod tree;

pub use data::{MenuItem, NodesData};
pub use metadata::{ChainItem, MetaAction, MetaData};
pub use metatags::{MetaTag, MetaTags, MetaTagsAction};
pub use modifier::{
    CutLevelsArgs, ExtraActiveMode, LevelParam, ModifyArgs, ModifyEvent, ModifyMeta, Modifier,
};
pub use node::{NavigationNode, NodeData};
pub use paths::{PathPolicy, ShortestPathPolicy, WeightPathPolicy};
pub use processor::{
    CacheFilter, DEFAULT_REBUILD_LIMIT, NodesQuery, PathIndexBuilder, PostBuildHandler, Processor,
};
pub use registry::{LazyRegistry, Registry};
pub use request::{MenuRequest, UserContext};
pub use router::{RegexRouter, Router};
pub use settings::{MenuConf, MenuConfs, MenuSettings};
pub use source::Menu;
pub use tree::{Node, NodeId, NodeTree};
