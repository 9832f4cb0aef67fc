//! Navigation nodes as produced by menu sources.
//!
//! A [`NavigationNode`] is the unlinked form a [`Menu`](super::Menu) returns:
//! its parent is expressed as an id within the same result set. The tree
//! builder turns these into linked [`Node`](super::Node)s inside an arena.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::metatags::MetaTags;

/// Default path weight used when comparing nodes claiming the same path.
pub const DEFAULT_PATH_WEIGHT: i32 = 500;

/// Cross-cutting node attributes read by modifiers.
///
/// Well-known keys are typed fields; anything menu- or modifier-specific
/// goes in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Remove this node (and its branch) for anonymous visitors.
    #[serde(default)]
    pub auth_required: bool,

    /// Remove this node unless the visitor holds this permission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,

    /// Redirect this node's url to its deepest jump target.
    #[serde(default)]
    pub jump: bool,

    /// Stable identifier used by the Root modifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_id: Option<String>,

    /// Namespaces whose root nodes are grafted below this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub navigation_extenders: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_keywords: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,

    /// Include this node in breadcrumbs and title segments.
    #[serde(default = "default_true")]
    pub visible_in_chain: bool,

    /// Path comparison weight (higher wins, default 500).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,

    /// Meta tags contributed when this node is selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metatags: Option<MetaTags>,

    /// Menu- or modifier-specific attributes.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl Default for NodeData {
    fn default() -> Self {
        Self {
            auth_required: false,
            permission: None,
            jump: false,
            reverse_id: None,
            navigation_extenders: Vec::new(),
            meta_title: None,
            meta_keywords: None,
            meta_description: None,
            visible_in_chain: true,
            weight: None,
            metatags: None,
            extra: Map::new(),
        }
    }
}

impl NodeData {
    /// Path comparison weight, falling back to the default.
    pub fn path_weight(&self) -> i32 {
        self.weight.unwrap_or(DEFAULT_PATH_WEIGHT)
    }

    /// Read an extra attribute as a string.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Read an extra attribute as a bool.
    pub fn extra_bool(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(Value::as_bool)
    }
}

/// A node as returned by a menu source, before linking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationNode {
    /// Unique within one menu call's result set.
    pub id: String,
    /// Parent id within the same result set.
    #[serde(default)]
    pub parent: Option<String>,
    /// Defaults to the producing menu's namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    pub title: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub data: NodeData,
}

impl NavigationNode {
    /// Create a visible root node.
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            namespace: None,
            title: title.into(),
            url: url.into(),
            visible: true,
            data: NodeData::default(),
        }
    }

    /// Set the parent id.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Override the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Replace the data attributes.
    pub fn with_data(mut self, data: NodeData) -> Self {
        self.data = data;
        self
    }

    /// Hide the node from rendered menus.
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Mark the node as requiring authentication.
    pub fn auth_required(mut self) -> Self {
        self.data.auth_required = true;
        self
    }

    /// Mark the node as a jump node.
    pub fn jump(mut self) -> Self {
        self.data.jump = true;
        self
    }

    /// Set the reverse id used by the Root modifier.
    pub fn with_reverse_id(mut self, reverse_id: impl Into<String>) -> Self {
        self.data.reverse_id = Some(reverse_id.into());
        self
    }

    /// Graft the roots of these namespaces below this node.
    pub fn with_extenders<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data.navigation_extenders = namespaces.into_iter().map(Into::into).collect();
        self
    }
}
