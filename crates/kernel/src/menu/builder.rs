//! Tree builder: merge the output of several menus into one arena tree.
//!
//! Menus are processed in ascending weight order. Within a namespace a
//! node id is accepted once; duplicates, nodes whose parent cannot be
//! found in the same menu call, nodes caught in parent cycles and every
//! descendant of such nodes are dropped. Only accepted nodes claim their
//! id: when the first node with an id is dropped, a later one may take it.
//! Accepted nodes keep the order the menu produced them in, both among
//! roots and among siblings.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::node::NavigationNode;
use super::registry::Registry;
use super::request::MenuRequest;
use super::tree::{Node, NodeId, NodeTree};
use crate::error::{MenuError, MenuResult};

/// Why a raw node did not make it into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dropped {
    Duplicate,
    Orphan,
}

/// Ids accepted and ignored so far, per namespace.
#[derive(Debug, Default)]
struct Seen {
    accepted: HashMap<String, HashSet<String>>,
    ignored: HashMap<String, HashSet<String>>,
}

impl Seen {
    fn is_accepted(&self, namespace: &str, id: &str) -> bool {
        self.accepted.get(namespace).is_some_and(|ids| ids.contains(id))
    }

    fn is_ignored(&self, namespace: &str, id: &str) -> bool {
        self.ignored.get(namespace).is_some_and(|ids| ids.contains(id))
    }
}

/// Build the merged tree for the given menu namespaces.
///
/// An empty namespace list yields an empty tree. A menu failing to
/// produce nodes aborts the build.
pub fn build_nodes(
    registry: &Registry,
    request: &MenuRequest,
    menus: &[String],
) -> MenuResult<NodeTree> {
    let mut tree = NodeTree::new();
    let mut seen = Seen::default();

    for menu in registry.menus_by_weight(menus)? {
        let namespace = menu.namespace().to_string();
        let raw = menu
            .get_nodes(request)
            .map_err(|err| MenuError::menu_source(&namespace, err))?;
        let count = raw.len();
        let added = merge_menu(&mut tree, &mut seen, &namespace, raw);
        debug!(namespace = %namespace, nodes = count, accepted = added, "merged menu nodes");
    }

    Ok(tree)
}

/// Link one menu's nodes into `tree`; returns the number accepted.
fn merge_menu(
    tree: &mut NodeTree,
    seen: &mut Seen,
    menu_namespace: &str,
    raw: Vec<NavigationNode>,
) -> usize {
    let namespaces: Vec<String> = raw
        .iter()
        .map(|n| n.namespace.clone().unwrap_or_else(|| menu_namespace.to_string()))
        .collect();

    // A first occurrence that is dropped does not claim its id, so the
    // next node with the same id gets its chance.
    let mut excluded = vec![false; raw.len()];
    let (parent_of, status) = loop {
        let (parent_of, status) = classify(&raw, &namespaces, seen, &excluded);
        let mut last: HashMap<(&str, &str), usize> = HashMap::new();
        for (i, node) in raw.iter().enumerate() {
            if !excluded[i] {
                last.insert((namespaces[i].as_str(), node.id.as_str()), i);
            }
        }
        let mut changed = false;
        for (i, result) in status.iter().enumerate() {
            let key = (namespaces[i].as_str(), raw[i].id.as_str());
            let retried = last.get(&key).is_some_and(|&j| j > i);
            if !excluded[i] && retried && *result == Err(Dropped::Orphan) {
                excluded[i] = true;
                changed = true;
            }
        }
        if !changed {
            break (parent_of, status);
        }
    };

    let kept: HashSet<(&str, &str)> = status
        .iter()
        .enumerate()
        .filter(|(_, result)| result.is_ok())
        .map(|(i, _)| (namespaces[i].as_str(), raw[i].id.as_str()))
        .collect();

    let mut arena: Vec<Option<NodeId>> = vec![None; raw.len()];
    let mut accepted = 0;
    for (i, node) in raw.iter().enumerate() {
        match status[i] {
            Ok(()) => {
                arena[i] = Some(tree.push(into_node(node, &namespaces[i])));
                accepted += 1;
            }
            Err(reason) => {
                debug!(
                    namespace = %namespaces[i],
                    id = %node.id,
                    parent = ?node.parent,
                    reason = ?reason,
                    "dropped menu node"
                );
                let key = (namespaces[i].as_str(), node.id.as_str());
                if reason == Dropped::Orphan && !kept.contains(&key) {
                    seen.ignored
                        .entry(namespaces[i].clone())
                        .or_default()
                        .insert(node.id.clone());
                }
            }
        }
    }

    for (i, id) in arena.iter().enumerate() {
        let Some(id) = *id else {
            continue;
        };
        match parent_of[i] {
            Some(Ok(parent)) => {
                if let Some(parent) = arena[parent] {
                    tree.attach(parent, id);
                }
            }
            _ => tree.add_root(id),
        }
        seen.accepted
            .entry(namespaces[i].clone())
            .or_default()
            .insert(raw[i].id.clone());
    }

    accepted
}

/// Resolve parents and acceptance with the `excluded` nodes treated as
/// absent orphans.
fn classify(
    raw: &[NavigationNode],
    namespaces: &[String],
    seen: &Seen,
    excluded: &[bool],
) -> (Vec<Option<Result<usize, ()>>>, Vec<Result<(), Dropped>>) {
    // First occurrence of each (namespace, id) within this call.
    let mut first: HashMap<(&str, &str), usize> = HashMap::new();
    let mut duplicate = vec![false; raw.len()];
    for (i, node) in raw.iter().enumerate() {
        if excluded[i] {
            continue;
        }
        let key = (namespaces[i].as_str(), node.id.as_str());
        if first.contains_key(&key) || seen.is_accepted(key.0, key.1) {
            duplicate[i] = true;
        } else {
            first.insert(key, i);
        }
    }

    let parent_of: Vec<Option<Result<usize, ()>>> = raw
        .iter()
        .enumerate()
        .map(|(i, node)| {
            node.parent.as_deref().map(|parent| {
                if seen.is_ignored(&namespaces[i], parent) {
                    return Err(());
                }
                first.get(&(namespaces[i].as_str(), parent)).copied().ok_or(())
            })
        })
        .collect();

    let mut status = resolve_status(&duplicate, &parent_of);
    for (i, result) in status.iter_mut().enumerate() {
        if excluded[i] {
            *result = Err(Dropped::Orphan);
        }
    }
    (parent_of, status)
}

/// Decide for every raw node whether it joins the tree.
///
/// A node is accepted when it is not a duplicate and every ancestor up to
/// a parentless node resolves within the same call. Cycles never reach a
/// parentless node and are rejected.
fn resolve_status(
    duplicate: &[bool],
    parent_of: &[Option<Result<usize, ()>>],
) -> Vec<Result<(), Dropped>> {
    let mut status: Vec<Option<Result<(), Dropped>>> = vec![None; duplicate.len()];

    for start in 0..duplicate.len() {
        let mut path = Vec::new();
        let mut on_path = HashSet::new();
        let mut current = start;

        let result = loop {
            if let Some(known) = status[current] {
                break known.map_err(|_| Dropped::Orphan);
            }
            if !on_path.insert(current) {
                break Err(Dropped::Orphan);
            }
            path.push(current);
            if duplicate[current] {
                break Err(Dropped::Duplicate);
            }
            match parent_of[current] {
                None => break Ok(()),
                Some(Ok(parent)) => current = parent,
                Some(Err(())) => break Err(Dropped::Orphan),
            }
        };

        // Only the node that failed keeps its specific reason; the nodes
        // below it are orphans.
        for (depth, id) in path.iter().rev().enumerate() {
            let own = match result {
                Err(Dropped::Duplicate) if depth > 0 => Err(Dropped::Orphan),
                other => other,
            };
            status[*id] = Some(own);
        }
    }

    status
        .into_iter()
        .map(|s| s.unwrap_or(Err(Dropped::Orphan)))
        .collect()
}

fn into_node(raw: &NavigationNode, namespace: &str) -> Node {
    let mut node = Node::new(namespace, raw.id.clone(), raw.title.clone(), raw.url.clone());
    node.visible = raw.visible;
    node.data = raw.data.clone();
    node
}
