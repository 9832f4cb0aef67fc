use anyhow::Result;
use enumset::EnumSet;

use crate::menu::data::NodesData;
use crate::menu::modifier::{ModifyArgs, ModifyEvent, ModifyMeta, Modifier};
use crate::menu::request::MenuRequest;

/// Restrict the tree to the branch whose node carries `reverse_id == root_id`.
///
/// The first match in pre-order becomes the only root. Without a match the
/// tree ends up empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct Root;

impl Root {
    pub const NAME: &'static str = "Root";
}

impl Modifier for Root {
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
        let Some(root_id) = args.root_id.as_deref().filter(|id| !id.is_empty()) else {
            return Ok(());
        };

        let found = data
            .tree
            .walk()
            .find(|(_, node)| node.data.reverse_id.as_deref() == Some(root_id))
            .map(|(id, node)| (id, node.parent.is_some()));

        match found {
            Some((id, had_parent)) => {
                data.tree.detach(id);
                data.tree.set_roots(vec![id]);
                meta.modified_ancestors |= had_parent;
            }
            None => data.tree.set_roots(Vec::new()),
        }
        Ok(())
    }
}
