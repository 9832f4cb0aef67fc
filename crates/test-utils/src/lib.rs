//! Sentiero test utilities.
//!
//! Helpers for integration testing: static and failing menu sources,
//! request and registry builders, tracing setup and tree assertions.

use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

use sentiero_kernel::menu::{
    MenuItem, MenuRequest, NavigationNode, NodeTree, Registry, UserContext,
};
use sentiero_kernel::Menu;

static TRACING: Once = Once::new();

/// Install a test tracing subscriber once per test binary.
///
/// Honours `RUST_LOG`; defaults to `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        // Another harness may have installed one already.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A menu returning a fixed node list.
///
/// Counts `get_nodes` calls so tests can tell cache hits from builds.
#[derive(Debug)]
pub struct StaticMenu {
    namespace: String,
    weight: i32,
    nodes: Vec<NavigationNode>,
    calls: AtomicUsize,
}

impl StaticMenu {
    pub fn new(namespace: &str, nodes: Vec<NavigationNode>) -> Self {
        Self {
            namespace: namespace.to_string(),
            weight: sentiero_kernel::menu::source::DEFAULT_MENU_WEIGHT,
            nodes,
            calls: AtomicUsize::new(0),
        }
    }

    /// Set the merge weight.
    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// Number of times the menu produced nodes.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Menu for StaticMenu {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn get_nodes(&self, _request: &MenuRequest) -> anyhow::Result<Vec<NavigationNode>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.nodes.clone())
    }
}

/// A menu whose data source is down.
#[derive(Debug)]
pub struct FailingMenu {
    namespace: String,
}

impl FailingMenu {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
        }
    }
}

impl Menu for FailingMenu {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get_nodes(&self, _request: &MenuRequest) -> anyhow::Result<Vec<NavigationNode>> {
        anyhow::bail!("page storage unavailable")
    }
}

/// A small site: home, a blog with a year archive, an about page and a
/// members area that requires login.
pub fn site_nodes() -> Vec<NavigationNode> {
    vec![
        NavigationNode::new("1", "Home", "/"),
        NavigationNode::new("2", "Blog", "/blog/").with_parent("1"),
        NavigationNode::new("3", "2024", "/blog/2024/").with_parent("2"),
        NavigationNode::new("4", "About", "/about/").with_parent("1"),
        NavigationNode::new("5", "Members", "/members/")
            .with_parent("1")
            .auth_required(),
        NavigationNode::new("6", "Directory", "/members/directory/").with_parent("5"),
        NavigationNode::new("7", "Events", "/members/events/").with_parent("5"),
    ]
}

/// Registry with the built-in modifiers and the given menus.
pub fn registry_with(menus: Vec<Arc<dyn Menu>>) -> Registry {
    let mut registry = Registry::with_builtin_modifiers();
    for menu in menus {
        if let Err(err) = registry.register_menu(menu) {
            panic!("fixture menu registration failed: {err}");
        }
    }
    registry
}

/// Request for an anonymous visitor.
pub fn anonymous_request(path: &str) -> MenuRequest {
    MenuRequest::new(path)
}

/// Request for an authenticated visitor with the given permissions.
pub fn member_request(path: &str, permissions: &[&str]) -> MenuRequest {
    MenuRequest::new(path).with_user(UserContext::authenticated(
        permissions.iter().map(|p| p.to_string()).collect(),
    ))
}

/// Assertion helpers for trees and menu items.
pub mod assert {
    use super::{MenuItem, NodeTree};

    /// Titles of a tree in preorder.
    pub fn tree_titles(tree: &NodeTree) -> Vec<String> {
        tree.walk().map(|(_, node)| node.title.clone()).collect()
    }

    /// Titles of nested items in preorder.
    pub fn item_titles(items: &[MenuItem]) -> Vec<String> {
        let mut titles = Vec::new();
        collect(items, &mut titles);
        titles
    }

    fn collect(items: &[MenuItem], titles: &mut Vec<String>) {
        for item in items {
            titles.push(item.title.clone());
            collect(&item.children, titles);
        }
    }

    /// Assert that every parent link in the tree points to a reachable node
    /// that lists the child.
    pub fn links_consistent(tree: &NodeTree) {
        for (id, node) in tree.walk() {
            if let Some(parent) = node.parent {
                assert!(
                    tree.contains(parent),
                    "node '{}' points to a removed parent",
                    node.title
                );
                assert!(
                    tree[parent].children.contains(&id),
                    "parent of '{}' does not list it as a child",
                    node.title
                );
            } else {
                assert!(
                    tree.roots().contains(&id),
                    "parentless node '{}' is not a root",
                    node.title
                );
            }
        }
    }
}
