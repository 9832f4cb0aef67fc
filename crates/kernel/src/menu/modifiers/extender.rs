use std::collections::HashSet;

use anyhow::Result;
use enumset::EnumSet;
use tracing::debug;

use crate::menu::data::NodesData;
use crate::menu::modifier::{ModifyArgs, ModifyEvent, ModifyMeta, Modifier};
use crate::menu::request::MenuRequest;
use crate::menu::tree::NodeId;

/// Graft the roots of other namespaces below nodes that declare them in
/// `navigation_extenders`.
///
/// Each extender namespace is grafted at most once per build, below the
/// first node (in pre-order) that asks for it. Grafted roots are walked
/// too, so extenders can nest. A node never receives its own ancestors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationExtender;

impl NavigationExtender {
    pub const NAME: &'static str = "NavigationExtender";
}

impl Modifier for NavigationExtender {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn modify_events(&self) -> EnumSet<ModifyEvent> {
        ModifyEvent::Once.into()
    }

    fn modify(
        &self,
        _request: &mut MenuRequest,
        data: &mut NodesData,
        meta: &mut ModifyMeta,
        _args: &ModifyArgs,
    ) -> Result<()> {
        if meta.rebuild_mode {
            return Ok(());
        }

        let tree = &mut data.tree;
        let roots = tree.roots().to_vec();
        let mut processed: HashSet<String> = HashSet::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }

            let extenders = tree[id].data.navigation_extenders.clone();
            for extender in extenders {
                if !processed.insert(extender.clone()) {
                    continue;
                }
                let lineage = tree.lineage(id);
                for root in &roots {
                    if tree[*root].namespace == extender && !lineage.contains(root) {
                        debug!(
                            extender = %extender,
                            node = tree[id].id,
                            "grafting namespace roots"
                        );
                        tree.attach(id, *root);
                    }
                }
            }

            stack.extend(tree[id].children.iter().rev().copied());
        }

        if !processed.is_empty() {
            let remaining: Vec<NodeId> = roots
                .into_iter()
                .filter(|id| tree[*id].parent.is_none())
                .collect();
            tree.set_roots(remaining);
        }
        Ok(())
    }
}
