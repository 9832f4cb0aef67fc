use anyhow::Result;
use enumset::EnumSet;

use crate::menu::data::NodesData;
use crate::menu::modifier::{ModifyArgs, ModifyEvent, ModifyMeta, Modifier};
use crate::menu::request::MenuRequest;
use crate::menu::tree::{NodeId, NodeTree};

/// Compute node levels (roots are level 0).
///
/// On ONCE the result is also frozen into `level_original`. DEFAULT passes
/// only recompute after a structural modifier set `modified_ancestors`.
/// Runs should come after any modifier that relinks nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Level;

impl Level {
    pub const NAME: &'static str = "Level";
}

impl Modifier for Level {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn modify_events(&self) -> EnumSet<ModifyEvent> {
        ModifyEvent::Once | ModifyEvent::Default
    }

    fn modify(
        &self,
        _request: &mut MenuRequest,
        data: &mut NodesData,
        meta: &mut ModifyMeta,
        _args: &ModifyArgs,
    ) -> Result<()> {
        if meta.event == ModifyEvent::Default && !meta.modified_ancestors {
            return Ok(());
        }

        let tree = &mut data.tree;

        if meta.event == ModifyEvent::Once && meta.rebuild_mode {
            for id in &data.rebuilt_nodes {
                assign_below(tree, *id, true);
            }
            return Ok(());
        }

        for root in tree.roots().to_vec() {
            tree[root].level = 0;
            assign_below(tree, root, false);
        }

        if meta.event == ModifyEvent::Once {
            for id in tree.ids() {
                tree[id].level_original = tree[id].level;
            }
        }
        Ok(())
    }
}

fn assign_below(tree: &mut NodeTree, top: NodeId, freeze: bool) {
    let descendants: Vec<NodeId> = tree.descendants(top).map(|(id, _)| id).collect();
    for id in descendants {
        let level = tree[id].parent.map_or(0, |parent| tree[parent].level + 1);
        let node = &mut tree[id];
        node.level = level;
        if freeze {
            node.level_original = level;
        }
    }
}
