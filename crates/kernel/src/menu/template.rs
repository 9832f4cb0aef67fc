//! Operations the presentation layer calls while rendering a page.
//!
//! These wrap [`Processor::get_nodes`] and the request's [`MetaData`]
//! accumulator. Every operation accepts a missing request (an error page
//! rendered outside normal request handling) and then returns an empty
//! result instead of failing.
//!
//! [`MetaData`]: super::metadata::MetaData

use serde::Serialize;
use serde_json::Value;

use super::data::MenuItem;
use super::metadata::{ChainItem, MetaAction};
use super::metatags::MetaTags;
use super::modifier::{CutLevelsArgs, ExtraActiveMode, LevelParam, ModifyArgs};
use super::processor::{NodesQuery, Processor};
use super::request::MenuRequest;
use super::tree::Node;
use crate::error::MenuResult;

/// Template used by [`show_menu`] when none is given.
pub const DEFAULT_MENU_TEMPLATE: &str = "menus/menu.html";

/// Delimiter line between entries of a chain block.
pub const DEFAULT_CHAIN_DELIMITER: &str = "---";

/// Arguments of [`show_menu`].
#[derive(Debug, Clone)]
pub struct ShowMenu {
    pub from_level: LevelParam,
    pub to_level: LevelParam,
    /// Levels shown below the root of inactive branches.
    pub extra_inactive: LevelParam,
    /// Levels shown below the selected node.
    pub extra_active: LevelParam,
    pub extra_active_mode: ExtraActiveMode,
    pub show_invisible: bool,
    /// Keep inactive branches when `from_level` is above 0.
    pub show_inactive_branch: bool,
    pub template: Option<String>,
    /// Menuconf name; routed when absent.
    pub menuconf: Option<String>,
    /// Modifier group; `default` when absent.
    pub modifiers: Option<String>,
    pub namespace: Option<String>,
    pub root_id: Option<String>,
}

impl Default for ShowMenu {
    fn default() -> Self {
        let cut = CutLevelsArgs::default();
        Self {
            from_level: cut.from_level,
            to_level: cut.to_level,
            extra_inactive: cut.extra_inactive,
            extra_active: cut.extra_active,
            extra_active_mode: cut.extra_active_mode,
            show_invisible: cut.show_invisible,
            show_inactive_branch: cut.show_inactive_branch,
            template: None,
            menuconf: None,
            modifiers: None,
            namespace: None,
            root_id: None,
        }
    }
}

impl ShowMenu {
    pub fn levels(
        from_level: impl Into<LevelParam>,
        to_level: impl Into<LevelParam>,
        extra_inactive: impl Into<LevelParam>,
        extra_active: impl Into<LevelParam>,
    ) -> Self {
        Self {
            from_level: from_level.into(),
            to_level: to_level.into(),
            extra_inactive: extra_inactive.into(),
            extra_active: extra_active.into(),
            ..Self::default()
        }
    }

    pub fn menuconf(mut self, name: impl Into<String>) -> Self {
        self.menuconf = Some(name.into());
        self
    }

    pub fn modifiers(mut self, group: impl Into<String>) -> Self {
        self.modifiers = Some(group.into());
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn root_id(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = Some(root_id.into());
        self
    }

    fn query(&self) -> NodesQuery {
        let cut_levels = CutLevelsArgs {
            from_level: self.from_level.clone(),
            to_level: self.to_level.clone(),
            extra_inactive: self.extra_inactive.clone(),
            extra_active: self.extra_active.clone(),
            extra_active_mode: self.extra_active_mode,
            show_invisible: self.show_invisible,
            show_inactive_branch: self.show_inactive_branch,
        };
        NodesQuery {
            menuconf: self.menuconf.clone(),
            modifiers: self.modifiers.clone(),
            init_only: false,
            args: ModifyArgs {
                namespace: self.namespace.clone(),
                root_id: self.root_id.clone(),
                cut_levels: Some(cut_levels),
                ..ModifyArgs::default()
            },
        }
    }
}

/// What a menu template renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MenuContext {
    /// Template to render; `None` means render nothing.
    pub template: Option<String>,
    pub children: Vec<MenuItem>,
    pub selected: Option<Node>,
    pub menuconf: Option<String>,
}

/// Nodes of a menuconf, narrowed by level and scope arguments.
pub fn show_menu(
    processor: &Processor,
    request: Option<&mut MenuRequest>,
    options: &ShowMenu,
) -> MenuResult<MenuContext> {
    let Some(request) = request else {
        return Ok(MenuContext::default());
    };

    let conf = processor.menuconf(request, options.menuconf.as_deref())?;
    let mut query = options.query();
    query.menuconf = Some(conf.name.clone());

    let Some(data) = processor.get_nodes(request, &query)? else {
        return Ok(MenuContext::default());
    };

    Ok(MenuContext {
        template: Some(
            options
                .template
                .clone()
                .unwrap_or_else(|| DEFAULT_MENU_TEMPLATE.to_string()),
        ),
        children: data.to_items(),
        selected: data.selected_node().cloned(),
        menuconf: Some(conf.name.clone()),
    })
}

/// Prepare the routed menuconf so metadata is available before any menu
/// is rendered.
pub fn load_menu(processor: &Processor, request: Option<&mut MenuRequest>) -> MenuResult<()> {
    if let Some(request) = request {
        processor.get_nodes(request, &NodesQuery::new().init_only())?;
    }
    Ok(())
}

/// Title segments for the `<title>` tag.
///
/// A `title` meta tag replaces the accumulated titles and is consumed.
/// Consecutive repeated segments are collapsed.
pub fn show_meta_title(request: Option<&mut MenuRequest>, main_title: &str) -> Vec<String> {
    let Some(request) = request else {
        return Vec::new();
    };

    let mut title: Vec<String> = Vec::new();
    if !main_title.is_empty() {
        title.push(main_title.to_string());
    }
    match request.meta.metatags.take("title") {
        Some(tag) => title.push(tag.values.join(" ")),
        None => title.extend(request.meta.title.iter().cloned()),
    }
    title.dedup();
    title
}

/// Breadcrumb entries, starting at `start_level`.
pub fn show_meta_chain(
    request: Option<&MenuRequest>,
    main_title: &str,
    main_url: &str,
    start_level: usize,
) -> Vec<ChainItem> {
    let Some(request) = request else {
        return Vec::new();
    };

    let mut chain = Vec::new();
    if !main_title.is_empty() {
        chain.push(ChainItem::new(main_title, main_url));
    }
    chain.extend(request.meta.chain.iter().cloned());
    chain.dedup_by(|b, a| a.title == b.title && a.url == b.url);
    if start_level > chain.len() {
        return Vec::new();
    }
    chain.split_off(start_level)
}

/// Page header for the selected node, with `%s` in `pattern` replaced.
///
/// Uses the node's `header` extra, then its `title` extra, then its meta
/// title.
/// Empty when nothing is selected or the node sets `show_meta_selected`
/// to false.
pub fn show_meta_selected(request: Option<&MenuRequest>, pattern: &str) -> String {
    let Some(selected) = request.and_then(|r| r.meta.selected.as_ref()) else {
        return String::new();
    };
    if selected.data.extra_bool("show_meta_selected") == Some(false) {
        return String::new();
    }
    let value = selected
        .data
        .extra_str("header")
        .or_else(|| selected.data.extra_str("title"))
        .unwrap_or_else(|| selected.meta_title());
    if pattern.contains("%s") {
        pattern.replacen("%s", value, 1)
    } else {
        value.to_string()
    }
}

/// Keywords for the page, nearest node first.
///
/// With `as_default`, `main_keywords` is used only when no node declared
/// any; otherwise it is put in front of them.
pub fn show_meta_keywords(
    request: Option<&MenuRequest>,
    main_keywords: &str,
    as_default: bool,
) -> String {
    join_meta(request.map(|r| r.meta.keywords.as_slice()), main_keywords, as_default)
}

/// Description for the page; see [`show_meta_keywords`].
pub fn show_meta_description(
    request: Option<&MenuRequest>,
    main_description: &str,
    as_default: bool,
) -> String {
    join_meta(request.map(|r| r.meta.description.as_slice()), main_description, as_default)
}

fn join_meta(values: Option<&[String]>, main: &str, as_default: bool) -> String {
    let values: Vec<&str> = values
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .collect();
    let parts: Vec<&str> = match (as_default, values.is_empty()) {
        (true, false) => values,
        _ => std::iter::once(main).chain(values).filter(|p| !p.is_empty()).collect(),
    };
    parts.join(" ")
}

/// Add a title segment; empty values are ignored.
///
/// `action` is a [`MetaAction`] or its template spelling, `"add"` or
/// `"addleft"`.
pub fn set_meta_title(
    request: Option<&mut MenuRequest>,
    value: &str,
    action: impl Into<MetaAction>,
) {
    if let Some(request) = request {
        request.meta.push_title([value.to_string()], action.into());
    }
}

/// Add breadcrumb entries.
pub fn set_meta_chain(
    request: Option<&mut MenuRequest>,
    items: Vec<ChainItem>,
    action: impl Into<MetaAction>,
) {
    if let Some(request) = request {
        request.meta.push_chain(items, action.into());
    }
}

/// Merge `tags` into the request's meta tags using `tags`' own action.
pub fn set_meta_tags(request: Option<&mut MenuRequest>, tags: &MetaTags) {
    if let Some(request) = request {
        request.meta.metatags.extend(tags);
    }
}

/// The request's meta tags, with the page's own `context` tags merged on
/// top when given.
pub fn show_meta_tags(request: Option<&MenuRequest>, context: Option<&MetaTags>) -> MetaTags {
    let Some(request) = request else {
        return MetaTags::new();
    };
    match context {
        Some(context) => request.meta.metatags.add(context),
        None => request.meta.metatags.clone(),
    }
}

/// Title segments from a block: one per non-empty line.
pub fn parse_title_block(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Breadcrumb entries from a block.
///
/// Entries are separated by a line equal to `delimiter` and consist of a
/// title line, a url line and an optional line of `key=value` attributes
/// that end up in the entry's extra data. Groups of another size are
/// skipped.
///
/// ```text
/// Shop
/// /shop/
/// ---
/// Shoes
/// /shop/shoes/
/// class=current rel="nofollow"
/// ```
pub fn parse_chain_block(text: &str, delimiter: Option<&str>) -> Vec<ChainItem> {
    let delimiter = delimiter.unwrap_or(DEFAULT_CHAIN_DELIMITER);
    let mut groups: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line == delimiter {
            groups.push(Vec::new());
        } else if let Some(group) = groups.last_mut() {
            group.push(line);
        }
    }

    groups
        .into_iter()
        .filter(|group| (2..=3).contains(&group.len()))
        .map(|group| {
            let mut item = ChainItem::new(group[0], group[1]);
            if let Some(attrs) = group.get(2) {
                for (key, value) in parse_attrs(attrs) {
                    item.data.extra.insert(key, Value::String(value));
                }
            }
            item
        })
        .collect()
}

fn parse_attrs(line: &str) -> Vec<(String, String)> {
    line.split_whitespace()
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.trim_matches(['"', '\'']).to_string()))
        .collect()
}
