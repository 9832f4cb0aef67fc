//! The menu source contract.
//!
//! Menus are implemented by callers: a page tree, a category listing, an
//! account section. The engine only asks them for a flat list of nodes.

use std::fmt;

use anyhow::Result;

use super::data::NodesData;
use super::node::NavigationNode;
use super::request::MenuRequest;
use super::tree::NodeId;

/// Default merge weight for menus that do not override it.
pub const DEFAULT_MENU_WEIGHT: i32 = 500;

/// A named source of navigation nodes.
///
/// Implementations must not share ids within one `get_nodes` result. Node
/// order need not be hierarchical (a parent may follow its child), but
/// parent cycles are treated as missing parents and dropped.
pub trait Menu: Send + Sync {
    /// Namespace identifying this menu and the nodes it produces.
    fn namespace(&self) -> &str;

    /// Merge order (lower = placed first).
    fn weight(&self) -> i32 {
        DEFAULT_MENU_WEIGHT
    }

    /// Produce the nodes for this request.
    fn get_nodes(&self, request: &MenuRequest) -> Result<Vec<NavigationNode>>;

    /// Called when a node from this menu was selected for the first time.
    ///
    /// Returning `true` means the menu changed the tree below `node` (and
    /// recorded the attachment point in `data.rebuilt_nodes`), so the
    /// processor reruns the build-time modifiers for the new content and
    /// selects again.
    fn on_selected(
        &self,
        node: NodeId,
        data: &mut NodesData,
        request: &MenuRequest,
    ) -> Result<bool> {
        let _ = (node, data, request);
        Ok(false)
    }
}

impl fmt::Debug for dyn Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu")
            .field("namespace", &self.namespace())
            .field("weight", &self.weight())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct Pages;

    impl Menu for Pages {
        fn namespace(&self) -> &str {
            "Pages"
        }

        fn get_nodes(&self, _request: &MenuRequest) -> Result<Vec<NavigationNode>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_menu_trait_objects_are_debug() {
        let menus: Vec<Arc<dyn Menu>> = vec![Arc::new(Pages)];
        assert_eq!(format!("{menus:?}"), r#"[Menu { namespace: "Pages", weight: 500 }]"#);
    }
}
