//! Path index and selected node search.
//!
//! Every node claims all prefixes of its url path (`a`, `a/b`, `a/b/c` for
//! `/a/b/c/`). When two nodes claim the same prefix a [`PathPolicy`]
//! decides which one keeps it. Selection then looks up the request path from
//! most to least specific, so lookup cost depends on path depth, not on
//! tree size.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

use super::data::NodesData;
use super::tree::{Node, NodeId, NodeTree};

/// Base used to resolve relative node urls; its host marks a url as local.
const LOCAL_BASE: &str = "http://menu.invalid/";
const LOCAL_HOST: &str = "menu.invalid";

/// One node's claim on an indexed path.
#[derive(Debug, Clone, Copy)]
pub struct PathClaim<'a> {
    pub node: &'a Node,
    /// The node's full path (slashes trimmed).
    pub path: &'a str,
}

impl PathClaim<'_> {
    fn depth(&self) -> usize {
        if self.path.is_empty() { 0 } else { self.path.split('/').count() }
    }
}

/// Decides which node owns a path when several claim it.
pub trait PathPolicy: Send + Sync {
    /// Whether a node whose url points at `host` takes part in selection.
    ///
    /// Urls on foreign hosts cannot match a local request path, so the
    /// default excludes them.
    fn check_node_url_with_domain(&self, host: &str, node: &Node) -> bool {
        let _ = (host, node);
        false
    }

    /// Return `true` if `candidate` should replace `current` as owner of `key`.
    fn compare_paths(&self, key: &str, candidate: PathClaim<'_>, current: PathClaim<'_>) -> bool;
}

/// Default policy.
///
/// A node whose own path equals the key beats nodes claiming it as a
/// prefix. Otherwise the higher `data.weight` wins (default 500), then the
/// shorter path. Ties keep the current owner.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightPathPolicy;

impl PathPolicy for WeightPathPolicy {
    fn compare_paths(&self, key: &str, candidate: PathClaim<'_>, current: PathClaim<'_>) -> bool {
        let candidate_exact = candidate.path == key;
        let current_exact = current.path == key;
        if candidate_exact != current_exact {
            return candidate_exact;
        }

        let (wnew, wold) = (candidate.node.data.path_weight(), current.node.data.path_weight());
        if wnew != wold {
            return wnew > wold;
        }

        candidate.depth() < current.depth()
    }
}

/// Length-first policy: the shorter path wins, then the higher weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestPathPolicy;

impl PathPolicy for ShortestPathPolicy {
    fn compare_paths(&self, _key: &str, candidate: PathClaim<'_>, current: PathClaim<'_>) -> bool {
        let (dnew, dold) = (candidate.depth(), current.depth());
        if dnew != dold {
            return dnew < dold;
        }
        candidate.node.data.path_weight() > current.node.data.path_weight()
    }
}

/// Path prefix to node mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathIndex {
    paths: BTreeMap<String, NodeId>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<NodeId> {
        self.paths.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.paths.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Offer `id` as owner of `key`; the policy decides against an existing owner.
    fn claim(&mut self, key: String, id: NodeId, tree: &NodeTree, policy: &dyn PathPolicy) {
        let Some(current) = self.paths.get(&key).copied() else {
            self.paths.insert(key, id);
            return;
        };
        if current == id {
            return;
        }

        let (Some(new_path), Some(old_path)) = (
            node_path(&tree[id], policy),
            node_path(&tree[current], policy),
        ) else {
            return;
        };
        let candidate = PathClaim {
            node: &tree[id],
            path: &new_path,
        };
        let existing = PathClaim {
            node: &tree[current],
            path: &old_path,
        };
        if policy.compare_paths(&key, candidate, existing) {
            self.paths.insert(key, id);
        }
    }

    /// Fold another index into this one, letting the policy settle conflicts.
    pub fn merge(&mut self, other: PathIndex, tree: &NodeTree, policy: &dyn PathPolicy) {
        for (key, id) in other.paths {
            self.claim(key, id, tree, policy);
        }
    }
}

/// Decoded, slash-trimmed path of a node's original url.
///
/// `None` for urls that can never match a local path: foreign hosts the
/// policy rejects and non-hierarchical urls such as `mailto:`.
pub fn node_path(node: &Node, policy: &dyn PathPolicy) -> Option<String> {
    let url = match Url::parse(&node.url_original) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(LOCAL_BASE).ok()?.join(&node.url_original).ok()?
        }
        Err(_) => return None,
    };

    if url.cannot_be_a_base() {
        return None;
    }
    match url.host_str() {
        Some(host) if host != LOCAL_HOST && !policy.check_node_url_with_domain(host, node) => {
            return None;
        }
        _ => {}
    }

    Some(clean_path(url.path()))
}

/// Decode a request path and strip query and surrounding slashes.
pub fn request_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    clean_path(path)
}

fn clean_path(path: &str) -> String {
    let decoded = urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string());
    decoded.trim_matches('/').to_string()
}

/// Every prefix of `path`, shortest first; the empty path has itself only.
fn prefixes(path: &str) -> Vec<String> {
    if path.is_empty() {
        return vec![String::new()];
    }
    let segments: Vec<&str> = path.split('/').collect();
    (1..=segments.len()).map(|i| segments[..i].join("/")).collect()
}

/// Index all nodes reachable from the roots.
pub fn build_paths(tree: &NodeTree, policy: &dyn PathPolicy) -> PathIndex {
    build_paths_from(tree, tree.roots(), policy)
}

/// Index the nodes of the given branches (start nodes included).
pub fn build_paths_from(tree: &NodeTree, start: &[NodeId], policy: &dyn PathPolicy) -> PathIndex {
    let mut index = PathIndex::new();
    for (id, node) in tree.walk_from(start) {
        let Some(path) = node_path(node, policy) else {
            trace!(node = node.id, url = %node.url_original, "url excluded from path index");
            continue;
        };
        for key in prefixes(&path) {
            index.claim(key, id, tree, policy);
        }
    }
    index
}

/// Find the node owning the most specific prefix of `path`.
///
/// Probes the full path, then each shorter prefix down to the empty path.
/// Owners that are no longer part of the tree (removed by per-request
/// modifiers) are skipped. On success the node is marked selected and its
/// root-first ancestor chain is returned with it.
pub fn search_selected(data: &mut NodesData, path: &str) -> Option<(NodeId, Vec<NodeId>)> {
    let path = request_path(path);
    let segments: Vec<&str> = if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    };

    for len in (0..=segments.len()).rev() {
        let key = segments[..len].join("/");
        let Some(id) = data.paths.get(&key) else {
            continue;
        };
        if !data.tree.contains(id) {
            continue;
        }
        let chain = data.tree.lineage(id);
        data.tree[id].selected = true;
        return Some((id, chain));
    }
    None
}
