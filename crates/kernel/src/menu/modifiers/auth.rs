use anyhow::Result;
use enumset::EnumSet;
use tracing::trace;

use crate::menu::data::NodesData;
use crate::menu::modifier::{ModifyArgs, ModifyEvent, ModifyMeta, Modifier};
use crate::menu::request::MenuRequest;
use crate::menu::tree::Node;

/// Remove `auth_required` branches for anonymous visitors.
///
/// Removal is branch-atomic: a removed node takes its whole subtree with
/// it. In rebuild mode only content below the rebuilt nodes is checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthVisibility;

impl AuthVisibility {
    pub const NAME: &'static str = "AuthVisibility";
}

impl Modifier for AuthVisibility {
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
        if request.user.authenticated {
            return Ok(());
        }

        let keep = |node: &Node| !node.data.auth_required;
        let removed = if meta.rebuild_mode {
            data.tree.cut_branches_below(&data.rebuilt_nodes, keep)
        } else {
            data.tree.cut_branches(keep)
        };

        if removed > 0 {
            trace!(removed, "auth required branches removed");
            meta.modified_descendants = true;
        }
        Ok(())
    }
}
