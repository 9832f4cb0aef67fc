//! Level-range cutting.
//!
//! Given `from_level..to_level`, nodes at `from_level` become the new
//! roots and anything deeper than `to_level` is cut. Inactive branches
//! (not on the selected trail) are cut earlier, `extra_inactive` levels
//! below their new root; the active branch gets `extra_active` levels,
//! adjusted by [`ExtraActiveMode`]. Invisible nodes are dropped unless
//! `show_invisible` is set.

use std::collections::HashSet;

use anyhow::Result;
use enumset::EnumSet;

use crate::menu::data::NodesData;
use crate::menu::modifier::{
    CutLevelsArgs, ExtraActiveMode, ModifyArgs, ModifyEvent, ModifyMeta, Modifier,
};
use crate::menu::request::MenuRequest;
use crate::menu::tree::{NodeId, NodeTree};

/// Cut the tree to a level range around the selected node.
#[derive(Debug, Clone, Copy, Default)]
pub struct CutLevels;

impl CutLevels {
    pub const NAME: &'static str = "CutLevels";
}

/// Resolved numeric parameters.
#[derive(Debug, Clone, Copy)]
struct Levels {
    from: usize,
    to: usize,
    extra_inactive: usize,
    extra_active: usize,
}

impl Modifier for CutLevels {
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
        let Some(cut) = &args.cut_levels else {
            return Ok(());
        };
        if data.tree.is_empty() {
            return Ok(());
        }

        let chain = data.chain.clone().unwrap_or_default();
        let trail = if chain.is_empty() {
            Vec::new()
        } else {
            get_trail(&data.tree, &chain)
        };
        let levels = resolve_levels(cut, &chain, &trail);
        let only_active_branch = !cut.show_inactive_branch && levels.from > 0;
        let show_invisible = cut.show_invisible;

        let tree = &mut data.tree;
        let mut roots = Vec::new();
        for root in tree.roots().to_vec() {
            let items = if trail.first() == Some(&root) {
                cut_before_and_after_active(
                    tree,
                    trail.clone(),
                    levels,
                    cut.extra_active_mode,
                    only_active_branch,
                    show_invisible,
                )
            } else if tree[root].descendant {
                cut_before_and_after(
                    tree,
                    root,
                    levels.from,
                    levels.to,
                    levels.extra_active,
                    false,
                    show_invisible,
                )
            } else {
                cut_before_and_after(
                    tree,
                    root,
                    levels.from,
                    levels.to,
                    levels.extra_inactive,
                    only_active_branch,
                    show_invisible,
                )
            };
            roots.extend(items);
        }
        tree.set_roots(roots);

        meta.modified_ancestors |= levels.from > 0;
        meta.modified_descendants = true;
        Ok(())
    }
}

/// Deepest chain node still in the tree, with its current ancestors.
fn get_trail(tree: &NodeTree, chain: &[NodeId]) -> Vec<NodeId> {
    for id in chain.iter().rev() {
        let trail = tree.lineage(*id);
        if trail.first().is_some_and(|top| tree.roots().contains(top)) {
            return trail;
        }
    }
    Vec::new()
}

fn resolve_levels(cut: &CutLevelsArgs, chain: &[NodeId], trail: &[NodeId]) -> Levels {
    let (so, s) = if chain.is_empty() {
        (0, 0)
    } else {
        (len_level(chain.len()), len_level(trail.len()))
    };
    Levels {
        from: cut.from_level.resolve(s, so),
        to: cut.to_level.resolve(s, so),
        extra_inactive: cut.extra_inactive.resolve(s, so),
        extra_active: cut.extra_active.resolve(s, so),
    }
}

fn len_level(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX) - 1
}

/// Drop children beyond `to_level`, counting `node` as `current_level`.
fn cut_after(
    tree: &mut NodeTree,
    node: NodeId,
    current_level: usize,
    to_level: usize,
    show_invisible: bool,
) {
    if tree[node].children.is_empty() {
        return;
    }
    if to_level <= current_level {
        tree.clear_children(node);
        return;
    }
    if !show_invisible {
        tree.retain_children(node, |child| child.visible);
    }
    for child in tree[node].children.clone() {
        cut_after(tree, child, current_level + 1, to_level, show_invisible);
    }
}

/// Promote the nodes `levels` below `node`, detaching them from their parents.
fn descend(
    tree: &mut NodeTree,
    top: NodeId,
    from_level: usize,
    mut admit: impl FnMut(NodeId) -> bool,
) -> Vec<NodeId> {
    let mut level = 0;
    let mut line = vec![top];
    while level < from_level {
        let mut next = Vec::new();
        for id in line {
            let children: Vec<NodeId> = tree[id]
                .children
                .iter()
                .copied()
                .filter(|c| admit(*c))
                .collect();
            for child in &children {
                tree[*child].parent = None;
            }
            next.extend(children);
        }
        line = next;
        level += 1;
    }
    line
}

/// Cut an inactive root to `from_level..min(to_level, extra_level)`.
fn cut_before_and_after(
    tree: &mut NodeTree,
    node: NodeId,
    from_level: usize,
    to_level: usize,
    extra_level: usize,
    only_active_branch: bool,
    show_invisible: bool,
) -> Vec<NodeId> {
    if only_active_branch || from_level > to_level {
        return Vec::new();
    }

    let mut line = descend(tree, node, from_level, |_| true);
    if !show_invisible {
        line.retain(|id| tree[*id].visible);
    }
    for id in &line {
        cut_after(tree, *id, from_level, to_level.min(extra_level), show_invisible);
    }
    line
}

/// Cut inactive children along the trail, from `node` down to the
/// last-but-one trail element.
fn cut_after_active(
    tree: &mut NodeTree,
    node: NodeId,
    trail: &[NodeId],
    to_level: usize,
    show_invisible: bool,
) {
    let Some(mut index) = trail.iter().position(|id| *id == node) else {
        return;
    };
    while index + 1 < trail.len() {
        let current = trail[index];
        index += 1;
        if !show_invisible {
            tree.retain_children(current, |child| child.visible);
        }
        for child in tree[current].children.clone() {
            if !trail.contains(&child) {
                cut_after(tree, child, index, to_level, show_invisible);
            }
        }
    }
}

/// Cut the active root's branch.
fn cut_before_and_after_active(
    tree: &mut NodeTree,
    mut trail: Vec<NodeId>,
    levels: Levels,
    mode: ExtraActiveMode,
    only_active_branch: bool,
    show_invisible: bool,
) -> Vec<NodeId> {
    let Levels {
        from: from_level,
        to: to_level,
        ..
    } = levels;
    if from_level > to_level {
        return Vec::new();
    }

    let extra_inactive = levels.extra_inactive.min(to_level);
    let extra_active = match mode {
        ExtraActiveMode::KeepChain => levels.extra_active.max(trail.len() - 1),
        _ => levels.extra_active,
    }
    .min(to_level);
    let strict = mode != ExtraActiveMode::IgnoreChain
        || to_level <= extra_active
        || extra_inactive <= extra_active;

    if !show_invisible {
        if let Some(index) = trail.iter().position(|id| !tree[*id].visible) {
            tree.detach(trail[index]);
            trail.truncate(index);
            if trail.is_empty() {
                return Vec::new();
            }
        }
    }

    let active_branch: HashSet<NodeId> = if extra_active < trail.len() - 1 {
        let cut_point = trail[extra_active];
        if strict {
            tree.clear_children(cut_point);
        } else {
            let kept: Vec<NodeId> = tree[cut_point]
                .children
                .iter()
                .copied()
                .filter(|c| !trail.contains(c) && (show_invisible || tree[*c].visible))
                .collect();
            tree.set_children(cut_point, kept.clone());
            for child in kept {
                cut_after(tree, child, extra_active + 1, extra_inactive, show_invisible);
            }
        }
        trail.truncate(extra_active + 1);
        trail.iter().copied().collect()
    } else {
        let last = trail[trail.len() - 1];
        cut_after(tree, last, trail.len() - 1, extra_active, show_invisible);
        let mut branch: HashSet<NodeId> = trail.iter().copied().collect();
        if from_level >= trail.len() {
            branch.extend(tree.descendants(last).map(|(id, _)| id));
        }
        branch
    };

    let mut line = descend(tree, trail[0], from_level, |id| {
        !only_active_branch || active_branch.contains(&id)
    });
    if !show_invisible {
        line.retain(|id| tree[*id].visible);
    }

    let inactive_to = to_level.min(extra_inactive);
    for id in &line {
        if !active_branch.contains(id) {
            cut_after(tree, *id, from_level, inactive_to, show_invisible);
        } else if trail.contains(id) {
            cut_after_active(tree, *id, &trail, inactive_to, show_invisible);
        }
    }
    line
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::menu::modifier::LevelParam;
    use crate::menu::tree::Node;

    /// Three levels below each of two roots:
    ///
    /// ```text
    /// a            b
    /// ├─ a1        └─ b1
    /// │  └─ a11       └─ b11
    /// │     └─ a111
    /// └─ a2
    ///    └─ a21
    /// ```
    struct Fixture {
        data: NodesData,
        ids: std::collections::HashMap<&'static str, NodeId>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut tree = NodeTree::new();
            let mut ids = std::collections::HashMap::new();
            let mut add = |tree: &mut NodeTree, parent: Option<NodeId>, name: &'static str| {
                let node = Node::new("Main", name, name, format!("/{name}/"));
                let id = match parent {
                    Some(p) => tree.push_child(p, node),
                    None => tree.push_root(node),
                };
                ids.insert(name, id);
                id
            };
            let a = add(&mut tree, None, "a");
            let a1 = add(&mut tree, Some(a), "a1");
            let a11 = add(&mut tree, Some(a1), "a11");
            add(&mut tree, Some(a11), "a111");
            let a2 = add(&mut tree, Some(a), "a2");
            add(&mut tree, Some(a2), "a21");
            let b = add(&mut tree, None, "b");
            let b1 = add(&mut tree, Some(b), "b1");
            add(&mut tree, Some(b1), "b11");

            let mut data = NodesData::new(tree);
            for id in data.tree.ids() {
                let level = data.tree.lineage(id).len() - 1;
                data.tree[id].level = level;
                data.tree[id].level_original = level;
            }
            Self { data, ids }
        }

        fn select(mut self, name: &str) -> Self {
            let id = self.ids[name];
            self.data.tree[id].selected = true;
            self.data.selected = Some(id);
            self.data.chain = Some(self.data.tree.lineage(id));
            for d in self.data.tree.descendants(id).map(|(d, _)| d).collect::<Vec<_>>() {
                self.data.tree[d].descendant = true;
            }
            self
        }

        fn cut(mut self, args: CutLevelsArgs) -> (Vec<String>, ModifyMeta) {
            let mut meta = ModifyMeta::new(ModifyEvent::Default);
            CutLevels
                .modify(
                    &mut MenuRequest::new("/"),
                    &mut self.data,
                    &mut meta,
                    &ModifyArgs::cut(args),
                )
                .unwrap();
            let names = self
                .data
                .tree
                .walk()
                .map(|(_, n)| n.title.clone())
                .collect();
            (names, meta)
        }
    }

    #[test]
    fn test_to_level_truncates_every_branch() {
        let (names, meta) =
            Fixture::new().cut(CutLevelsArgs::levels(0usize, 1usize, 100usize, 100usize));
        assert_eq!(names, vec!["a", "a1", "a2", "b", "b1"]);
        assert!(!meta.modified_ancestors);
        assert!(meta.modified_descendants);
    }

    #[test]
    fn test_inactive_branches_use_extra_inactive() {
        let (names, _) = Fixture::new()
            .select("a1")
            .cut(CutLevelsArgs::levels(0usize, 100usize, 1usize, 100usize));
        assert_eq!(names, vec!["a", "a1", "a11", "a111", "a2", "b", "b1"]);
    }

    #[test]
    fn test_from_level_promotes_active_branch_only() {
        let (names, meta) = Fixture::new()
            .select("a11")
            .cut(CutLevelsArgs::levels(1usize, 100usize, 100usize, 100usize));
        assert_eq!(names, vec!["a1", "a11", "a111"]);
        assert!(meta.modified_ancestors);
    }

    #[test]
    fn test_show_inactive_branch_keeps_all_from_level_nodes() {
        let (names, _) = Fixture::new().select("a11").cut(
            CutLevelsArgs::levels(1usize, 100usize, 0usize, 100usize).show_inactive_branch(true),
        );
        assert_eq!(names, vec!["a1", "a11", "a111", "a2", "b1"]);
    }

    #[test]
    fn test_from_above_to_yields_empty_tree() {
        let (names, _) =
            Fixture::new().cut(CutLevelsArgs::levels(3usize, 1usize, 100usize, 100usize));
        assert!(names.is_empty());
    }

    #[test]
    fn test_strict_mode_truncates_chain() {
        let (names, _) = Fixture::new().select("a111").cut(
            CutLevelsArgs::levels(0usize, 100usize, 0usize, 1usize)
                .with_mode(ExtraActiveMode::Strict),
        );
        assert_eq!(names, vec!["a", "a1", "a2", "b"]);
    }

    #[test]
    fn test_keep_chain_mode_shows_whole_chain() {
        let (names, _) = Fixture::new().select("a111").cut(
            CutLevelsArgs::levels(0usize, 100usize, 0usize, 1usize)
                .with_mode(ExtraActiveMode::KeepChain),
        );
        assert_eq!(names, vec!["a", "a1", "a11", "a111", "a2", "b"]);
    }

    #[test]
    fn test_ignore_chain_mode_keeps_inactive_children_of_cut_point() {
        let (names, _) = Fixture::new().select("a11").cut(
            CutLevelsArgs::levels(0usize, 100usize, 3usize, 0usize)
                .with_mode(ExtraActiveMode::IgnoreChain),
        );
        assert_eq!(names, vec!["a", "a2", "a21", "b", "b1", "b11"]);
    }

    #[test]
    fn test_invisible_nodes_are_dropped_unless_requested() {
        let mut fixture = Fixture::new();
        let a2 = fixture.ids["a2"];
        fixture.data.tree[a2].visible = false;
        let (names, _) = fixture.cut(CutLevelsArgs::levels(0usize, 100usize, 100usize, 100usize));
        assert!(!names.contains(&"a2".to_string()));
        assert!(!names.contains(&"a21".to_string()));

        let mut fixture = Fixture::new();
        fixture.data.tree[a2].visible = false;
        let (names, _) = fixture.cut(
            CutLevelsArgs::levels(0usize, 100usize, 100usize, 100usize).show_invisible(true),
        );
        assert!(names.contains(&"a21".to_string()));
    }

    #[test]
    fn test_invisible_node_on_trail_ends_the_trail() {
        let mut fixture = Fixture::new().select("a111");
        let a11 = fixture.ids["a11"];
        fixture.data.tree[a11].visible = false;
        let (names, _) = fixture.cut(CutLevelsArgs::default());
        assert_eq!(names, vec!["a", "a1", "a2", "b"]);
    }

    #[test]
    fn test_expressions_follow_selected_level() {
        let (names, _) = Fixture::new().select("a1").cut(CutLevelsArgs {
            from_level: LevelParam::from("{s}"),
            to_level: LevelParam::from("{s}+1"),
            ..CutLevelsArgs::levels(0usize, 0usize, 100usize, 100usize)
        });
        assert_eq!(names, vec!["a1", "a11"]);
    }

    #[test]
    fn test_level_bound_holds_for_results() {
        let (names, _) = Fixture::new()
            .select("b")
            .cut(CutLevelsArgs::levels(0usize, 2usize, 100usize, 100usize));
        assert!(!names.contains(&"a111".to_string()));
        assert!(names.contains(&"a11".to_string()));
        assert!(names.contains(&"b11".to_string()));
    }
}
