use anyhow::Result;
use enumset::EnumSet;

use crate::menu::data::NodesData;
use crate::menu::modifier::{ModifyArgs, ModifyEvent, ModifyMeta, Modifier};
use crate::menu::request::MenuRequest;
use crate::menu::tree::NodeId;

/// Mark nodes relative to the selected node.
///
/// ONCE clears `sibling`, `ancestor`, `descendant` and `leaf` (only below
/// rebuilt nodes in rebuild mode). POST_SELECT sets `leaf` on childless
/// nodes and, when a node is selected, marks its ancestors, siblings and
/// descendants.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalMarker;

impl PositionalMarker {
    pub const NAME: &'static str = "PositionalMarker";
}

impl Modifier for PositionalMarker {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn modify_events(&self) -> EnumSet<ModifyEvent> {
        ModifyEvent::Once | ModifyEvent::PostSelect
    }

    fn modify(
        &self,
        _request: &mut MenuRequest,
        data: &mut NodesData,
        meta: &mut ModifyMeta,
        _args: &ModifyArgs,
    ) -> Result<()> {
        let tree = &mut data.tree;

        if meta.event == ModifyEvent::Once {
            let ids: Vec<NodeId> = if meta.rebuild_mode {
                tree.walk_from(&data.rebuilt_nodes).map(|(id, _)| id).collect()
            } else {
                tree.ids()
            };
            for id in ids {
                let node = &mut tree[id];
                node.sibling = false;
                node.leaf = false;
                node.ancestor = false;
                node.descendant = false;
            }
            return Ok(());
        }

        for id in tree.ids() {
            tree[id].leaf = tree[id].children.is_empty();
        }

        let Some(selected) = data.selected.filter(|id| tree.contains(*id)) else {
            return Ok(());
        };

        let siblings = match tree[selected].parent {
            Some(parent) => tree[parent].children.clone(),
            None => tree.roots().to_vec(),
        };
        for id in siblings {
            tree[id].sibling = !tree[id].selected;
        }

        let lineage = tree.lineage(selected);
        for id in &lineage[..lineage.len() - 1] {
            tree[*id].ancestor = true;
        }

        let descendants: Vec<NodeId> = tree.descendants(selected).map(|(id, _)| id).collect();
        for id in descendants {
            tree[id].descendant = true;
        }
        Ok(())
    }
}
