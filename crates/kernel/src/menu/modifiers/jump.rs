use anyhow::Result;
use enumset::EnumSet;

use crate::menu::data::NodesData;
use crate::menu::modifier::{ModifyArgs, ModifyEvent, ModifyMeta, Modifier};
use crate::menu::request::MenuRequest;
use crate::menu::tree::{NodeId, NodeTree};

/// Redirect jump nodes to the first real content below them.
///
/// Walking the tree in pre-order, every jump node with children opens (or
/// extends) a chain; the next node that is not such a jump node closes it,
/// and every earlier chain member takes over its url.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jump;

impl Jump {
    pub const NAME: &'static str = "Jump";
}

impl Modifier for Jump {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn modify_events(&self) -> EnumSet<ModifyEvent> {
        ModifyEvent::Once | ModifyEvent::PerRequest
    }

    fn modify(
        &self,
        _request: &mut MenuRequest,
        data: &mut NodesData,
        meta: &mut ModifyMeta,
        _args: &ModifyArgs,
    ) -> Result<()> {
        if meta.event == ModifyEvent::PerRequest && !meta.modified_descendants {
            return Ok(());
        }
        if meta.event == ModifyEvent::Once
            && meta.rebuild_mode
            && !data.rebuilt_nodes.iter().any(|id| data.tree[*id].data.jump)
        {
            return Ok(());
        }

        let tree = &mut data.tree;
        let mut chain: Vec<NodeId> = Vec::new();
        for id in tree.ids() {
            let node = &tree[id];
            if node.data.jump && !node.children.is_empty() {
                chain.push(id);
            } else if !chain.is_empty() {
                chain.push(id);
                clone_url(tree, &chain);
                chain.clear();
            }
        }
        if !chain.is_empty() {
            clone_url(tree, &chain);
        }
        Ok(())
    }
}

fn clone_url(tree: &mut NodeTree, chain: &[NodeId]) {
    let Some((last, rest)) = chain.split_last() else {
        return;
    };
    let url = tree[*last].url.clone();
    for id in rest {
        tree[*id].url.clone_from(&url);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::menu::tree::Node;

    fn node(url: &str, jump: bool) -> Node {
        let mut node = Node::new("Main", url, url, url);
        node.data.jump = jump;
        node
    }

    fn run(data: &mut NodesData) {
        Jump.modify(
            &mut MenuRequest::new("/"),
            data,
            &mut ModifyMeta::new(ModifyEvent::Once),
            &ModifyArgs::default(),
        )
        .unwrap();
    }

    #[test]
    fn test_jump_node_takes_child_url() {
        let mut tree = NodeTree::new();
        let shoes = tree.push_root(node("/products/shoes", true));
        let red = tree.push_child(shoes, node("/products/shoes/red", false));
        let mut data = NodesData::new(tree);
        run(&mut data);
        assert_eq!(data.tree[shoes].url, "/products/shoes/red");
        assert_eq!(data.tree[shoes].url_original, "/products/shoes");
        assert_eq!(data.tree[red].url, "/products/shoes/red");
    }

    #[test]
    fn test_nested_jumps_resolve_to_deepest_target() {
        let mut tree = NodeTree::new();
        let a = tree.push_root(node("/a", true));
        let b = tree.push_child(a, node("/a/b", true));
        let c = tree.push_child(b, node("/a/b/c", false));
        tree.push_child(b, node("/a/b/d", false));
        let mut data = NodesData::new(tree);
        run(&mut data);
        assert_eq!(data.tree[a].url, "/a/b/c");
        assert_eq!(data.tree[b].url, "/a/b/c");
        assert_eq!(data.tree[c].url, "/a/b/c");
    }

    #[test]
    fn test_childless_jump_keeps_url() {
        let mut tree = NodeTree::new();
        let a = tree.push_root(node("/a", true));
        let mut data = NodesData::new(tree);
        run(&mut data);
        assert_eq!(data.tree[a].url, "/a");
    }

    #[test]
    fn test_per_request_needs_modified_descendants() {
        let mut tree = NodeTree::new();
        let a = tree.push_root(node("/a", true));
        tree.push_child(a, node("/a/b", false));
        let mut data = NodesData::new(tree);
        Jump.modify(
            &mut MenuRequest::new("/"),
            &mut data,
            &mut ModifyMeta::new(ModifyEvent::PerRequest),
            &ModifyArgs::default(),
        )
        .unwrap();
        assert_eq!(data.tree[a].url, "/a");
    }
}
