//! Per-request metadata accumulator.
//!
//! Filled by the MetaDataProcessor modifier after selection and by
//! template helpers (`set_meta_title`, `set_meta_chain`). Contributions
//! from deeper nodes are prepended, so the nearest node's values come first.

use serde::{Deserialize, Serialize};

use super::metatags::MetaTags;
use super::node::NodeData;
use super::tree::Node;

/// One breadcrumb entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainItem {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub data: NodeData,
}

impl ChainItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            data: NodeData::default(),
        }
    }

    /// Breadcrumb entry for a node, using its current url.
    pub fn from_node(node: &Node) -> Self {
        Self {
            title: node.title.clone(),
            url: node.url.clone(),
            data: node.data.clone(),
        }
    }
}

/// Where a template contribution goes relative to existing values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetaAction {
    #[default]
    Add,
    AddLeft,
}

impl MetaAction {
    /// Parse a template action string; anything but `addleft` appends.
    pub fn parse(value: &str) -> Self {
        if value == "addleft" {
            Self::AddLeft
        } else {
            Self::Add
        }
    }
}

impl From<&str> for MetaAction {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Accumulated title, breadcrumb and meta values for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaData {
    /// Snapshot of the selected node of the routed menuconf.
    pub selected: Option<Node>,
    pub title: Vec<String>,
    pub chain: Vec<ChainItem>,
    pub keywords: Vec<String>,
    pub description: Vec<String>,
    pub metatags: MetaTags,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add title segments.
    pub fn push_title<I>(&mut self, segments: I, action: MetaAction)
    where
        I: IntoIterator<Item = String>,
    {
        let segments: Vec<String> = segments.into_iter().filter(|s| !s.is_empty()).collect();
        splice(&mut self.title, segments, action);
    }

    /// Add breadcrumb entries.
    pub fn push_chain<I>(&mut self, items: I, action: MetaAction)
    where
        I: IntoIterator<Item = ChainItem>,
    {
        splice(&mut self.chain, items.into_iter().collect(), action);
    }

    /// Keywords of the nearest node that declared any.
    pub fn keywords(&self) -> Option<&str> {
        first_non_empty(&self.keywords)
    }

    /// Description of the nearest node that declared one.
    pub fn description(&self) -> Option<&str> {
        first_non_empty(&self.description)
    }
}

fn splice<T>(target: &mut Vec<T>, mut items: Vec<T>, action: MetaAction) {
    match action {
        MetaAction::Add => target.append(&mut items),
        MetaAction::AddLeft => {
            items.append(target);
            *target = items;
        }
    }
}

fn first_non_empty(values: &[String]) -> Option<&str> {
    values.iter().map(String::as_str).find(|v| !v.is_empty())
}
