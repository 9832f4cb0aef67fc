//! Meta tag containers and their merge algebra.
//!
//! Compiling tag text and rendering HTML belong to the presentation layer;
//! the engine only needs to combine contributions from the selected node
//! and its ancestors in a predictable order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a container combines with the one it is added to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaTagsAction {
    /// Replace the other side entirely.
    Set,
    /// Replace the other side entirely (used with an empty container).
    Unset,
    /// Append values after the other side's.
    #[default]
    Add,
    /// Prepend values before the other side's.
    AddLeft,
}

/// A single named tag with its ordered values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTag {
    pub name: String,
    pub values: Vec<String>,
}

impl MetaTag {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Concatenate two tags with the same name.
    fn merged(&self, right: &MetaTag) -> MetaTag {
        let mut values = self.values.clone();
        values.extend(right.values.iter().cloned());
        MetaTag {
            name: self.name.clone(),
            values,
        }
    }
}

/// Named meta tags plus the action used when merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTags {
    #[serde(default)]
    tags: BTreeMap<String, MetaTag>,
    #[serde(default)]
    action: MetaTagsAction,
}

impl MetaTags {
    /// Empty container with the default `add` action.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a container from tags.
    pub fn from_tags<I>(tags: I, action: MetaTagsAction) -> Self
    where
        I: IntoIterator<Item = MetaTag>,
    {
        Self {
            tags: tags.into_iter().map(|t| (t.name.clone(), t)).collect(),
            action,
        }
    }

    pub fn action(&self) -> MetaTagsAction {
        self.action
    }

    pub fn get(&self, name: &str) -> Option<&MetaTag> {
        self.tags.get(name)
    }

    /// Remove and return a tag, e.g. when a template consumes `title`.
    pub fn take(&mut self, name: &str) -> Option<MetaTag> {
        self.tags.remove(name)
    }

    /// Tags sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &MetaTag> {
        self.tags.values()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// `self + other`: merge `other` into a copy of `self`, honouring
    /// `other`'s action.
    pub fn add(&self, other: &MetaTags) -> MetaTags {
        let mut this = self.clone();
        this.merge(&other.tags, other.action);
        this
    }

    /// `other + self` where `other` is not yet a container.
    pub fn radd(&self, other: &MetaTags) -> MetaTags {
        let mut this = MetaTags {
            tags: other.tags.clone(),
            action: other.action,
        };
        this.merge(&self.tags, self.action);
        this
    }

    /// In-place `self += other`.
    pub fn extend(&mut self, other: &MetaTags) {
        self.merge(&other.tags, other.action);
    }

    fn merge(&mut self, tags: &BTreeMap<String, MetaTag>, action: MetaTagsAction) {
        match action {
            MetaTagsAction::Set | MetaTagsAction::Unset => {
                self.tags = tags.clone();
            }
            MetaTagsAction::Add | MetaTagsAction::AddLeft if !tags.is_empty() => {
                let (mut left, right) = if action == MetaTagsAction::Add {
                    (std::mem::take(&mut self.tags), tags.clone())
                } else {
                    (tags.clone(), std::mem::take(&mut self.tags))
                };
                for (name, rtag) in right {
                    let merged = match left.get(&name) {
                        Some(ltag) => ltag.merged(&rtag),
                        None => rtag,
                    };
                    left.insert(name, merged);
                }
                self.tags = left;
            }
            _ => {}
        }
    }
}
