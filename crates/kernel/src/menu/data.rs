//! The shared state modifiers operate on.

use serde::{Deserialize, Serialize};

use super::node::NodeData;
use super::paths::PathIndex;
use super::tree::{Node, NodeId, NodeTree};

/// Node tree plus selection state for one menuconf.
///
/// This is what the cross-request cache stores (tree and path index) and
/// what each `get_nodes` call clones before running DEFAULT modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodesData {
    pub tree: NodeTree,
    /// The node matching the current request path.
    #[serde(default)]
    pub selected: Option<NodeId>,
    /// Root-to-selected chain captured at selection time.
    #[serde(default)]
    pub chain: Option<Vec<NodeId>>,
    /// Path index used to find the selected node.
    #[serde(default)]
    pub paths: PathIndex,
    /// Nodes whose children a menu rebuilt after selection.
    #[serde(default)]
    pub rebuilt_nodes: Vec<NodeId>,
}

impl NodesData {
    pub fn new(tree: NodeTree) -> Self {
        Self {
            tree,
            ..Self::default()
        }
    }

    /// Root nodes after all modifiers ran.
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.tree.roots().iter().map(|id| &self.tree[*id])
    }

    /// The selected node, if it is still part of the tree.
    pub fn selected_node(&self) -> Option<&Node> {
        self.selected
            .filter(|id| self.tree.contains(*id))
            .map(|id| &self.tree[id])
    }

    /// Chain nodes, root first.
    pub fn chain_nodes(&self) -> Vec<&Node> {
        self.chain
            .iter()
            .flatten()
            .filter_map(|id| self.tree.get(*id))
            .collect()
    }

    /// Owned nested copy of the tree for templates.
    pub fn to_items(&self) -> Vec<MenuItem> {
        self.tree
            .roots()
            .iter()
            .map(|id| MenuItem::from_tree(&self.tree, *id))
            .collect()
    }
}

/// Nested, owned menu entry handed to presentation templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: u32,
    pub namespace: String,
    pub title: String,
    pub url: String,
    pub visible: bool,
    pub selected: bool,
    pub ancestor: bool,
    pub descendant: bool,
    pub sibling: bool,
    pub leaf: bool,
    pub level: usize,
    /// Menu-provided metadata and extras, as the source node carried them.
    pub data: NodeData,
    pub children: Vec<MenuItem>,
}

impl MenuItem {
    fn from_tree(tree: &NodeTree, id: NodeId) -> Self {
        let node = &tree[id];
        Self {
            id: node.id,
            namespace: node.namespace.clone(),
            title: node.title.clone(),
            url: node.url.clone(),
            visible: node.visible,
            selected: node.selected,
            ancestor: node.ancestor,
            descendant: node.descendant,
            sibling: node.sibling,
            leaf: node.leaf,
            level: node.level,
            data: node.data.clone(),
            children: node
                .children
                .iter()
                .map(|child| MenuItem::from_tree(tree, *child))
                .collect(),
        }
    }

    /// Total number of entries in this subtree, including itself.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(MenuItem::len).sum::<usize>()
    }

    /// Never true; an item always counts itself.
    pub fn is_empty(&self) -> bool {
        false
    }
}
