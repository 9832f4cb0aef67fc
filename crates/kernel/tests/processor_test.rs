//! Processor caching, request memo and rebuild behaviour.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use sentiero_kernel::cache::{CacheStore, MokaCacheStore};
use sentiero_kernel::menu::processor::CacheFilter;
use sentiero_kernel::menu::tree::{Node, NodeId};
use sentiero_kernel::menu::{
    Menu, MenuRequest, MenuSettings, NavigationNode, NodesData, NodesQuery, Processor,
};
use sentiero_kernel::MenuError;
use sentiero_test_utils::{
    StaticMenu, anonymous_request, assert, init_tracing, registry_with, site_nodes,
};

const TWO_CONFS: &str = "
menus:
  default:
    menus: [Main]
  footer:
    menus: [Footer]
    route: \"legal/\"
";

fn footer_nodes() -> Vec<NavigationNode> {
    vec![
        NavigationNode::new("1", "Legal", "/legal/"),
        NavigationNode::new("2", "Terms", "/legal/terms/").with_parent("1"),
    ]
}

#[test]
fn test_built_tree_is_reused_from_cache() {
    init_tracing();
    let main = Arc::new(StaticMenu::new("Main", site_nodes()));
    let registry = registry_with(vec![main.clone()]);
    let processor = Processor::new(Arc::new(registry), &MenuSettings::single(["Main"])).unwrap();

    let first = processor
        .get_nodes(&mut anonymous_request("/blog/"), &NodesQuery::new())
        .unwrap()
        .unwrap();
    let second = processor
        .get_nodes(&mut anonymous_request("/blog/"), &NodesQuery::new())
        .unwrap()
        .unwrap();

    assert_eq!(main.calls(), 1);
    assert_eq!(first, second);
    for (_, node) in second.tree.walk() {
        assert_eq!(node.level, node.level_original);
    }
}

#[test]
fn test_repeated_calls_in_one_request_share_the_memo() {
    let main = Arc::new(StaticMenu::new("Main", site_nodes()));
    let cache = Arc::new(MokaCacheStore::new(100));
    let registry = registry_with(vec![main.clone()]);
    let processor = Processor::new(Arc::new(registry), &MenuSettings::single(["Main"]))
        .unwrap()
        .with_cache(cache.clone());

    let mut request = anonymous_request("/about/");
    processor.get_nodes(&mut request, &NodesQuery::new()).unwrap();
    cache.delete_many(&[processor.cache_key(processor.confs().get("default").unwrap(), &request)]);
    let again = processor.get_nodes(&mut request, &NodesQuery::new()).unwrap().unwrap();

    assert_eq!(main.calls(), 1);
    assert_eq!(again.selected_node().unwrap().title, "About");
    assert_eq!(request.meta.title, vec!["Home", "About"]);
}

#[test]
fn test_cached_tree_round_trips_through_json() {
    let registry = registry_with(vec![Arc::new(StaticMenu::new("Main", site_nodes()))]);
    let processor = Processor::new(Arc::new(registry), &MenuSettings::single(["Main"])).unwrap();
    let data = processor
        .get_nodes(&mut anonymous_request("/blog/2024/"), &NodesQuery::new())
        .unwrap()
        .unwrap();

    let raw = serde_json::to_string(&data).unwrap();
    let restored: NodesData = serde_json::from_str(&raw).unwrap();

    assert_eq!(restored, data);
    assert_eq!(restored.tree.count(), data.tree.count());
    assert::links_consistent(&restored.tree);
}

#[test]
fn test_footer_does_not_disturb_default() {
    let registry = registry_with(vec![
        Arc::new(StaticMenu::new("Main", site_nodes())),
        Arc::new(StaticMenu::new("Footer", footer_nodes())),
    ]);
    let cache = Arc::new(MokaCacheStore::new(100));
    let processor = Processor::new(Arc::new(registry), &MenuSettings::from_yaml(TWO_CONFS).unwrap())
        .unwrap()
        .with_cache(cache.clone());

    let mut request = anonymous_request("/blog/");
    let default = processor.get_nodes(&mut request, &NodesQuery::new()).unwrap().unwrap();
    let conf = processor.confs().get("default").unwrap().clone();
    let cached_before = cache.get(&processor.cache_key(&conf, &request)).unwrap();

    let footer = processor
        .get_nodes(&mut request, &NodesQuery::new().menuconf("footer"))
        .unwrap()
        .unwrap();
    assert_eq!(assert::tree_titles(&footer.tree), vec!["Legal", "Terms"]);
    assert!(footer.selected.is_none());
    assert_eq!(request.meta.selected.as_ref().unwrap().title, "Blog");

    let cached_after = cache.get(&processor.cache_key(&conf, &request)).unwrap();
    assert_eq!(cached_before, cached_after);
    let default_again = processor.get_nodes(&mut request, &NodesQuery::new()).unwrap().unwrap();
    assert_eq!(default, default_again);
}

#[test]
fn test_routing_picks_menuconf_by_path() {
    let registry = registry_with(vec![
        Arc::new(StaticMenu::new("Main", site_nodes())),
        Arc::new(StaticMenu::new("Footer", footer_nodes())),
    ]);
    let settings = MenuSettings::from_yaml(TWO_CONFS).unwrap();
    let processor = Processor::new(Arc::new(registry), &settings).unwrap();

    let mut request = anonymous_request("/legal/terms/");
    let data = processor.get_nodes(&mut request, &NodesQuery::new()).unwrap().unwrap();
    assert_eq!(request.routed_menuconf(), Some("footer"));
    assert_eq!(data.selected_node().unwrap().title, "Terms");
}

#[test]
fn test_unreadable_cache_entry_is_rebuilt() {
    let main = Arc::new(StaticMenu::new("Main", site_nodes()));
    let cache = Arc::new(MokaCacheStore::new(100));
    let registry = registry_with(vec![main.clone()]);
    let processor = Processor::new(Arc::new(registry), &MenuSettings::single(["Main"]))
        .unwrap()
        .with_cache(cache.clone());

    let request = anonymous_request("/");
    let key = processor.cache_key(processor.confs().get("default").unwrap(), &request);
    cache.set(&key, "not json".to_string(), Duration::from_secs(60));

    let data = processor
        .get_nodes(&mut anonymous_request("/"), &NodesQuery::new())
        .unwrap()
        .unwrap();
    assert_eq!(data.tree.count(), 4);
    assert_eq!(main.calls(), 1);
}

#[test]
fn test_clear_cache_forces_rebuild() {
    let main = Arc::new(StaticMenu::new("Main", site_nodes()));
    let registry = registry_with(vec![main.clone()]);
    let processor = Processor::new(Arc::new(registry), &MenuSettings::single(["Main"])).unwrap();

    processor.get_nodes(&mut anonymous_request("/"), &NodesQuery::new()).unwrap();
    processor
        .get_nodes(&mut anonymous_request("/").with_site("2"), &NodesQuery::new())
        .unwrap();
    assert_eq!(main.calls(), 2);

    assert_eq!(processor.clear_cache(&CacheFilter::all().site("2")), 1);
    processor.get_nodes(&mut anonymous_request("/"), &NodesQuery::new()).unwrap();
    assert_eq!(main.calls(), 2);
    processor
        .get_nodes(&mut anonymous_request("/").with_site("2"), &NodesQuery::new())
        .unwrap();
    assert_eq!(main.calls(), 3);
}

/// Adds one child page below the selected node the first time it is
/// selected; with `endless` every added child asks for another.
struct Archive {
    endless: bool,
}

impl Menu for Archive {
    fn namespace(&self) -> &str {
        "Archive"
    }

    fn get_nodes(&self, _request: &MenuRequest) -> anyhow::Result<Vec<NavigationNode>> {
        Ok(vec![NavigationNode::new("1", "Archive", "/archive/")])
    }

    fn on_selected(
        &self,
        node: NodeId,
        data: &mut NodesData,
        _request: &MenuRequest,
    ) -> anyhow::Result<bool> {
        let parent = &data.tree[node];
        if !self.endless && parent.url != "/archive/" {
            return Ok(false);
        }
        let url = format!("{}page/", parent.url);
        let mut child = Node::new("Archive", url.clone(), "Page", url);
        child.visible = true;
        data.tree.push_child(node, child);
        data.rebuilt_nodes.push(node);
        Ok(true)
    }
}

#[test]
fn test_selected_node_may_rebuild_its_branch() {
    let registry = registry_with(vec![Arc::new(Archive { endless: false })]);
    let processor = Processor::new(Arc::new(registry), &MenuSettings::single(["Archive"])).unwrap();

    let mut request = anonymous_request("/archive/page/");
    let data = processor.get_nodes(&mut request, &NodesQuery::new()).unwrap().unwrap();

    let selected = data.selected_node().unwrap();
    assert_eq!(selected.url, "/archive/page/");
    assert_eq!(selected.level, 1);
    assert_eq!(selected.level_original, 1);
    let archive = data.roots().next().unwrap();
    assert!(archive.rebuilt && archive.ancestor && !archive.selected);

    let fresh = processor
        .get_nodes(&mut anonymous_request("/"), &NodesQuery::new())
        .unwrap()
        .unwrap();
    assert_eq!(fresh.tree.count(), 1);
}

#[test]
fn test_endless_rebuild_is_an_error() {
    let registry = registry_with(vec![Arc::new(Archive { endless: true })]);
    let processor = Processor::new(Arc::new(registry), &MenuSettings::single(["Archive"]))
        .unwrap()
        .with_rebuild_limit(3);

    let deep = "/archive/page/page/page/page/page/page/";
    let err = processor
        .get_nodes(&mut anonymous_request(deep), &NodesQuery::new())
        .unwrap_err();
    assert!(matches!(err, MenuError::RebuildLoop { limit: 3, .. }));
}
