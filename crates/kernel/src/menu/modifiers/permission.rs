use anyhow::Result;
use enumset::EnumSet;
use tracing::trace;

use crate::menu::data::NodesData;
use crate::menu::modifier::{ModifyArgs, ModifyEvent, ModifyMeta, Modifier};
use crate::menu::request::MenuRequest;
use crate::menu::tree::Node;

/// Remove branches whose `data.permission` the visitor does not hold.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionVisibility;

impl PermissionVisibility {
    pub const NAME: &'static str = "PermissionVisibility";
}

impl Modifier for PermissionVisibility {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn modify_events(&self) -> EnumSet<ModifyEvent> {
        ModifyEvent::PerRequest.into()
    }

    fn modify(
        &self,
        request: &mut MenuRequest,
        data: &mut NodesData,
        meta: &mut ModifyMeta,
        _args: &ModifyArgs,
    ) -> Result<()> {
        let user = &request.user;
        let keep = |node: &Node| {
            node.data
                .permission
                .as_deref()
                .is_none_or(|permission| user.has_permission(permission))
        };
        let removed = if meta.rebuild_mode {
            data.tree.cut_branches_below(&data.rebuilt_nodes, keep)
        } else {
            data.tree.cut_branches(keep)
        };

        if removed > 0 {
            trace!(removed, "branches without permission removed");
            meta.modified_descendants = true;
        }
        Ok(())
    }
}
