use std::collections::HashSet;

use anyhow::Result;
use enumset::EnumSet;

use crate::menu::data::NodesData;
use crate::menu::modifier::{ModifyArgs, ModifyEvent, ModifyMeta, Modifier};
use crate::menu::request::MenuRequest;
use crate::menu::tree::NodeId;

/// Keep only nodes of the requested namespace.
///
/// This is a hard filter, not a branch cut: a matching node whose parent
/// belongs to another namespace becomes a new root, appended after the
/// existing roots in tree order. Foreign children are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Namespace;

impl Namespace {
    pub const NAME: &'static str = "Namespace";
}

impl Modifier for Namespace {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn modify_events(&self) -> EnumSet<ModifyEvent> {
        ModifyEvent::Default.into()
    }

    fn modify(
        &self,
        _request: &mut MenuRequest,
        data: &mut NodesData,
        meta: &mut ModifyMeta,
        args: &ModifyArgs,
    ) -> Result<()> {
        let Some(namespace) = args.namespace.as_deref().filter(|ns| !ns.is_empty()) else {
            return Ok(());
        };

        let tree = &mut data.tree;
        let order = tree.ids();
        let matching: HashSet<NodeId> = order
            .iter()
            .copied()
            .filter(|id| tree[*id].namespace == namespace)
            .collect();
        let removed = order.len() - matching.len();

        let mut roots: Vec<NodeId> = tree
            .roots()
            .iter()
            .copied()
            .filter(|id| matching.contains(id))
            .collect();
        for id in &order {
            let orphaned = tree[*id].parent.is_some_and(|parent| !matching.contains(&parent));
            if orphaned && matching.contains(id) {
                roots.push(*id);
            }
        }

        for id in &order {
            tree.retain_children(*id, |child| child.namespace == namespace);
        }
        tree.set_roots(roots);

        if removed > 0 {
            meta.modified_ancestors = true;
            meta.modified_descendants = true;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::menu::tree::{Node, NodeTree};

    fn node(ns: &str, title: &str) -> Node {
        Node::new(ns, title, title, format!("/{title}/"))
    }

    /// n1:a -> [n11:a, n12:b -> [n121:a -> [n1211:a, n1212:b]]]
    #[test]
    fn test_foreign_parent_promotes_node_to_root() {
        let mut tree = NodeTree::new();
        let n1 = tree.push_root(node("a", "n1"));
        let n11 = tree.push_child(n1, node("a", "n11"));
        let n12 = tree.push_child(n1, node("b", "n12"));
        let n121 = tree.push_child(n12, node("a", "n121"));
        let n1211 = tree.push_child(n121, node("a", "n1211"));
        let n1212 = tree.push_child(n121, node("b", "n1212"));

        let mut data = NodesData::new(tree);
        let mut meta = ModifyMeta::new(ModifyEvent::Default);
        Namespace
            .modify(&mut MenuRequest::new("/"), &mut data, &mut meta, &ModifyArgs::namespace("a"))
            .unwrap();

        assert_eq!(data.tree.roots(), &[n1, n121]);
        assert_eq!(data.tree[n1].children, vec![n11]);
        assert_eq!(data.tree[n121].children, vec![n1211]);
        assert!(data.tree[n121].parent.is_none());
        assert!(!data.tree.contains(n12));
        assert!(!data.tree.contains(n1212));
        assert!(meta.modified_ancestors);
        assert!(meta.modified_descendants);
    }

    #[test]
    fn test_no_namespace_is_noop() {
        let mut tree = NodeTree::new();
        tree.push_root(node("a", "x"));
        tree.push_root(node("b", "y"));
        let mut data = NodesData::new(tree);
        let before = data.clone();
        let mut meta = ModifyMeta::new(ModifyEvent::Default);
        Namespace
            .modify(&mut MenuRequest::new("/"), &mut data, &mut meta, &ModifyArgs::default())
            .unwrap();
        assert_eq!(data, before);
        assert!(!meta.modified_ancestors);
    }
}
