//! Arena-backed navigation tree.
//!
//! Nodes live in a flat vector and refer to each other by [`NodeId`]
//! index, so a tree clones in linear time and serializes without
//! duplicating shared parents.
//!
//! A node is part of the tree only while it is reachable from a root
//! through `children` links. Removing a branch unlinks its top node and
//! leaves the rest of the branch in the arena, unreachable.

use std::collections::HashSet;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use super::node::NodeData;

/// Index of a node inside a [`NodeTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// A linked navigation node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Global sequential id assigned after build (1-based).
    pub id: u32,
    /// Source menu namespace.
    pub namespace: String,
    /// Id the source menu assigned, unique within the namespace.
    pub source_id: String,
    pub title: String,
    /// Current url, rewritten by modifiers such as Jump.
    pub url: String,
    /// Url as produced by the menu, used for path indexing.
    pub url_original: String,
    pub visible: bool,
    pub selected: bool,
    pub ancestor: bool,
    pub descendant: bool,
    pub sibling: bool,
    pub leaf: bool,
    pub level: usize,
    pub level_original: usize,
    /// Set once the owning menu rebuilt content below this node.
    pub rebuilt: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    /// Create an unlinked node with all derived flags cleared.
    pub fn new(
        namespace: impl Into<String>,
        source_id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let url = url.into();
        Self {
            id: 0,
            namespace: namespace.into(),
            source_id: source_id.into(),
            title: title.into(),
            url_original: url.clone(),
            url,
            visible: true,
            selected: false,
            ancestor: false,
            descendant: false,
            sibling: false,
            leaf: false,
            level: 0,
            level_original: 0,
            rebuilt: false,
            parent: None,
            children: Vec::new(),
            data: NodeData::default(),
        }
    }

    /// Title used for `<title>` segments.
    pub fn meta_title(&self) -> &str {
        self.data
            .meta_title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.title)
    }
}

/// Arena of nodes plus the ordered root list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl NodeTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the arena without linking it.
    ///
    /// Assigns the node's global id from its arena position.
    pub fn push(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.id = u32::try_from(id.0 + 1).unwrap_or(u32::MAX);
        node.parent = None;
        node.children.clear();
        self.nodes.push(node);
        id
    }

    /// Add a node to the arena and append it to the root list.
    pub fn push_root(&mut self, node: Node) -> NodeId {
        let id = self.push(node);
        self.roots.push(id);
        id
    }

    /// Add a node to the arena as the last child of `parent`.
    pub fn push_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.push(node);
        self.attach(parent, id);
        id
    }

    /// Link `child` as the last child of `parent`.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Unlink a node from its parent (or the root list).
    ///
    /// Its own children stay attached to it, so the whole branch leaves the
    /// tree at once.
    pub fn detach(&mut self, id: NodeId) {
        match self.nodes[id.0].parent.take() {
            Some(parent) => self.nodes[parent.0].children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }
    }

    /// Keep only the children of `id` accepted by `keep`; dropped children
    /// are unlinked.
    pub fn retain_children<F>(&mut self, id: NodeId, mut keep: F)
    where
        F: FnMut(&Node) -> bool,
    {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            if keep(&self.nodes[child.0]) {
                kept.push(child);
            } else {
                self.nodes[child.0].parent = None;
            }
        }
        self.nodes[id.0].children = kept;
    }

    /// Replace the children of `id`; previous children left out are unlinked.
    pub fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        for old in std::mem::take(&mut self.nodes[id.0].children) {
            if !children.contains(&old) {
                self.nodes[old.0].parent = None;
            }
        }
        for child in &children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes[id.0].children = children;
    }

    /// Drop all children of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        self.retain_children(id, |_| false);
    }

    /// Remove every branch whose top node fails `keep`, starting at the roots.
    ///
    /// Returns the number of removed branches.
    pub fn cut_branches<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Node) -> bool,
    {
        let roots = std::mem::take(&mut self.roots);
        let before = roots.len();
        let kept: Vec<NodeId> = roots.into_iter().filter(|id| keep(&self.nodes[id.0])).collect();
        let removed = before - kept.len();
        self.roots = kept.clone();
        removed + self.cut_branches_below(&kept, keep)
    }

    /// Like [`cut_branches`](Self::cut_branches) for the descendants of
    /// `start`; the start nodes themselves stay.
    pub fn cut_branches_below<F>(&mut self, start: &[NodeId], mut keep: F) -> usize
    where
        F: FnMut(&Node) -> bool,
    {
        let mut stack = start.to_vec();
        let mut removed = 0;
        while let Some(id) = stack.pop() {
            let before = self.nodes[id.0].children.len();
            self.retain_children(id, &mut keep);
            let children = &self.nodes[id.0].children;
            removed += before - children.len();
            stack.extend(children.iter().copied());
        }
        removed
    }

    /// Root node ids in order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Replace the root list. Nodes in it get their parent link cleared.
    pub fn set_roots(&mut self, roots: Vec<NodeId>) {
        for id in &roots {
            self.nodes[id.0].parent = None;
        }
        self.roots = roots;
    }

    /// Append a node to the root list, clearing its parent link.
    pub fn add_root(&mut self, id: NodeId) {
        self.nodes[id.0].parent = None;
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
    }

    /// Whether the tree has no reachable nodes.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of nodes in the arena, reachable or not.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes reachable from the roots.
    pub fn count(&self) -> usize {
        self.walk().count()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Whether `id` is reachable from the roots.
    pub fn contains(&self, id: NodeId) -> bool {
        if id.0 >= self.nodes.len() {
            return false;
        }
        let mut current = id;
        let mut steps = 0;
        while let Some(parent) = self.nodes[current.0].parent {
            if !self.nodes[parent.0].children.contains(&current) || steps > self.nodes.len() {
                return false;
            }
            current = parent;
            steps += 1;
        }
        self.roots.contains(&current)
    }

    /// Depth-first, pre-order walk over every reachable node.
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(self, &self.roots)
    }

    /// Depth-first, pre-order walk starting at the given nodes (included).
    pub fn walk_from(&self, start: &[NodeId]) -> Walk<'_> {
        Walk::new(self, start)
    }

    /// All descendants of `id` in pre-order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Walk<'_> {
        Walk::new(self, &self.nodes[id.0].children)
    }

    /// Ancestor chain of `id` from its topmost ancestor down to `id`.
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            if chain.len() > self.nodes.len() {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Whether `ancestor` lies on the parent chain of `id`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> bool {
        let lineage = self.lineage(id);
        lineage[..lineage.len() - 1].contains(&ancestor)
    }

    /// Snapshot of reachable ids in pre-order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.walk().map(|(id, _)| id).collect()
    }

    /// Set of reachable ids.
    pub fn id_set(&self) -> HashSet<NodeId> {
        self.walk().map(|(id, _)| id).collect()
    }
}

impl Index<NodeId> for NodeTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for NodeTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

/// Pre-order iterator over a [`NodeTree`].
pub struct Walk<'a> {
    tree: &'a NodeTree,
    stack: Vec<NodeId>,
}

impl<'a> Walk<'a> {
    fn new(tree: &'a NodeTree, start: &[NodeId]) -> Self {
        Self {
            tree,
            stack: start.iter().rev().copied().collect(),
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.tree.nodes[id.0];
        self.stack.extend(node.children.iter().rev().copied());
        Some((id, node))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn node(title: &str) -> Node {
        Node::new("Main", title, title, format!("/{title}/"))
    }

    /// a -> (b -> d), c
    fn sample() -> (NodeTree, [NodeId; 4]) {
        let mut tree = NodeTree::new();
        let a = tree.push_root(node("a"));
        let b = tree.push_child(a, node("b"));
        let c = tree.push_child(a, node("c"));
        let d = tree.push_child(b, node("d"));
        (tree, [a, b, c, d])
    }

    #[test]
    fn test_walk_is_preorder() {
        let (tree, _) = sample();
        let titles: Vec<_> = tree.walk().map(|(_, n)| n.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_push_assigns_sequential_ids() {
        let (tree, [a, b, c, d]) = sample();
        assert_eq!(tree[a].id, 1);
        assert_eq!(tree[b].id, 2);
        assert_eq!(tree[c].id, 3);
        assert_eq!(tree[d].id, 4);
    }

    #[test]
    fn test_detach_removes_whole_branch() {
        let (mut tree, [a, b, c, d]) = sample();
        tree.detach(b);
        assert!(!tree.contains(b));
        assert!(!tree.contains(d));
        assert!(tree.contains(a));
        assert!(tree.contains(c));
        assert_eq!(tree.count(), 2);
    }

    #[test]
    fn test_cleared_children_are_unreachable() {
        let (mut tree, [a, b, _, d]) = sample();
        tree.clear_children(a);
        assert!(!tree.contains(b));
        assert!(!tree.contains(d));
        assert_eq!(tree.count(), 1);
    }

    #[test]
    fn test_cut_branches_is_branch_atomic() {
        let (mut tree, [a, b, c, d]) = sample();
        let removed = tree.cut_branches(|n| n.title != "b");
        assert_eq!(removed, 1);
        assert!(!tree.contains(b));
        assert!(!tree.contains(d));
        assert!(tree.walk().all(|(_, n)| n.parent != Some(b)));
        assert_eq!(tree.ids(), vec![a, c]);
    }

    #[test]
    fn test_cut_branches_below_keeps_start() {
        let (mut tree, [a, b, _, d]) = sample();
        let removed = tree.cut_branches_below(&[b], |n| n.title != "d" && n.title != "b");
        assert_eq!(removed, 1);
        assert!(tree.contains(a));
        assert!(tree.contains(b));
        assert!(!tree.contains(d));
    }

    #[test]
    fn test_lineage_runs_root_first() {
        let (tree, [a, b, _, d]) = sample();
        assert_eq!(tree.lineage(d), vec![a, b, d]);
        assert!(tree.is_ancestor_of(a, d));
        assert!(!tree.is_ancestor_of(d, a));
    }

    #[test]
    fn test_serde_round_trip_preserves_links() {
        let (tree, _) = sample();
        let json = serde_json::to_string(&tree).unwrap();
        let back: NodeTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
