use anyhow::Result;
use enumset::EnumSet;

use crate::menu::data::NodesData;
use crate::menu::metadata::{ChainItem, MetaAction};
use crate::menu::modifier::{ModifyArgs, ModifyEvent, ModifyMeta, Modifier};
use crate::menu::request::MenuRequest;
use crate::menu::tree::Node;

/// Feed the selected chain into the request's metadata accumulator.
///
/// Chain entries, title segments, keywords and description are prepended,
/// so values from a later, more specific call come before the ones
/// recorded earlier. Nodes with `visible_in_chain = false` are skipped.
/// The selected node's meta tags are merged in front of the request's.
/// A call without a selection leaves the recorded selected node alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaDataProcessor;

impl MetaDataProcessor {
    pub const NAME: &'static str = "MetaDataProcessor";
}

impl Modifier for MetaDataProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn modify_events(&self) -> EnumSet<ModifyEvent> {
        ModifyEvent::PostSelect.into()
    }

    fn modify(
        &self,
        request: &mut MenuRequest,
        data: &mut NodesData,
        _meta: &mut ModifyMeta,
        _args: &ModifyArgs,
    ) -> Result<()> {
        let selected = data.selected.and_then(|id| data.tree.get(id)).cloned();
        let chain: Vec<&Node> = data
            .chain_nodes()
            .into_iter()
            .filter(|node| node.data.visible_in_chain)
            .collect();

        let meta = &mut request.meta;

        if let Some(last) = chain.last() {
            meta.push_chain(chain.iter().map(|n| ChainItem::from_node(n)), MetaAction::AddLeft);
            meta.push_title(chain.iter().map(|n| n.meta_title().to_string()), MetaAction::AddLeft);
            meta.keywords
                .insert(0, last.data.meta_keywords.clone().unwrap_or_default());
            meta.description
                .insert(0, last.data.meta_description.clone().unwrap_or_default());
        }

        if let Some(selected) = selected {
            let selected_is_last = chain.last().is_some_and(|last| last.id == selected.id);
            if !selected_is_last {
                meta.title.push(selected.meta_title().to_string());
            }
            if let Some(tags) = &selected.data.metatags {
                meta.metatags = meta.metatags.radd(tags);
            }
            meta.selected = Some(selected);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::menu::metatags::{MetaTag, MetaTags, MetaTagsAction};
    use crate::menu::tree::{NodeId, NodeTree};

    fn sample() -> (NodesData, [NodeId; 3]) {
        let mut tree = NodeTree::new();
        let mut home = Node::new("Main", "1", "Home", "/");
        home.data.visible_in_chain = false;
        let home = tree.push_root(home);
        let mut blog = Node::new("Main", "2", "Blog", "/blog/");
        blog.data.meta_keywords = Some("blog".to_string());
        let blog = tree.push_child(home, blog);
        let mut post = Node::new("Main", "3", "Post", "/blog/post/");
        post.data.meta_title = Some("A post".to_string());
        post.data.meta_keywords = Some("post, rust".to_string());
        post.data.metatags = Some(MetaTags::from_tags(
            [MetaTag::new("robots", ["noindex"])],
            MetaTagsAction::Add,
        ));
        let post = tree.push_child(blog, post);
        (NodesData::new(tree), [home, blog, post])
    }

    fn run(request: &mut MenuRequest, data: &mut NodesData) {
        MetaDataProcessor
            .modify(
                request,
                data,
                &mut ModifyMeta::new(ModifyEvent::PostSelect),
                &ModifyArgs::default(),
            )
            .unwrap();
    }

    #[test]
    fn test_chain_and_titles_are_prepended() {
        let (mut data, [home, blog, post]) = sample();
        data.selected = Some(post);
        data.chain = Some(vec![home, blog, post]);

        let mut request = MenuRequest::new("/blog/post/");
        request.meta.push_title(["Existing".to_string()], MetaAction::Add);
        run(&mut request, &mut data);

        let meta = &request.meta;
        assert_eq!(meta.selected.as_ref().unwrap().title, "Post");
        let chain: Vec<_> = meta.chain.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(chain, vec!["Blog", "Post"]);
        assert_eq!(meta.title, vec!["Blog", "A post", "Existing"]);
        assert_eq!(meta.keywords(), Some("post, rust"));
        assert_eq!(meta.metatags.get("robots").unwrap().values, vec!["noindex"]);
    }

    #[test]
    fn test_hidden_selected_still_adds_title() {
        let (mut data, [home, _, _]) = sample();
        data.selected = Some(home);
        data.chain = Some(vec![home]);

        let mut request = MenuRequest::new("/");
        run(&mut request, &mut data);

        assert!(request.meta.chain.is_empty());
        assert_eq!(request.meta.title, vec!["Home"]);
    }

    #[test]
    fn test_no_selection_records_nothing() {
        let (mut data, _) = sample();
        let mut request = MenuRequest::new("/nowhere/");
        run(&mut request, &mut data);
        assert!(request.meta.selected.is_none());
        assert!(request.meta.title.is_empty());
    }

    #[test]
    fn test_unselected_call_keeps_earlier_selection() {
        let (mut data, [home, blog, post]) = sample();
        data.selected = Some(post);
        data.chain = Some(vec![home, blog, post]);
        let mut request = MenuRequest::new("/blog/post/");
        run(&mut request, &mut data);

        let (mut footer, _) = sample();
        run(&mut request, &mut footer);

        assert_eq!(request.meta.selected.as_ref().unwrap().title, "Post");
        assert_eq!(request.meta.title, vec!["Blog", "A post"]);
    }
}
