//! Menu processor: routing, caching and the modifier lifecycle.
//!
//! For each menuconf a request uses, the processor:
//!
//! 1. reuses the tree already stabilised for this request, if any;
//! 2. otherwise loads the built tree from the cache store, or builds it,
//!    runs the ONCE modifiers and the post-build handler and stores it;
//! 3. runs the PER_REQUEST modifiers;
//! 4. for the routed menuconf, selects the node matching the request path,
//!    letting its menu rebuild content below it (bounded number of passes);
//! 5. runs the POST_SELECT modifiers and memoises the result on the request.
//!
//! Every [`get_nodes`](Processor::get_nodes) call then runs the DEFAULT
//! modifiers of the requested group on a private copy.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use super::builder::build_nodes;
use super::data::NodesData;
use super::modifier::{ModifyArgs, ModifyEvent, ModifyMeta, Modifier};
use super::paths::{PathPolicy, WeightPathPolicy, build_paths, build_paths_from, search_selected};
use super::registry::Registry;
use super::request::MenuRequest;
use super::router::{RegexRouter, Router};
use super::settings::{DEFAULT_GROUP, MenuConf, MenuConfs, MenuSettings};
use super::tree::NodeId;
use crate::cache::{CacheStore, MokaCacheStore};
use crate::config::Config;
use crate::error::{MenuError, MenuResult};

/// Default number of build passes allowed per request and menuconf.
pub const DEFAULT_REBUILD_LIMIT: usize = 10;

/// Hook run after the ONCE modifiers, before the tree is cached.
pub trait PostBuildHandler: Send + Sync {
    /// Update `data` after a build or a rebuild pass.
    ///
    /// Everything stored in `data` must survive serialization.
    fn handle(
        &self,
        conf: &MenuConf,
        data: &mut NodesData,
        meta: &ModifyMeta,
        policy: &dyn PathPolicy,
    );
}

/// Default post-build handler: maintains the path index.
///
/// A fresh build indexes the whole tree. A rebuild pass indexes the
/// content below the rebuilt nodes and merges it into the existing index.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathIndexBuilder;

impl PostBuildHandler for PathIndexBuilder {
    fn handle(
        &self,
        conf: &MenuConf,
        data: &mut NodesData,
        meta: &ModifyMeta,
        policy: &dyn PathPolicy,
    ) {
        if meta.rebuild_mode {
            let added = build_paths_from(&data.tree, &data.rebuilt_nodes, policy);
            trace!(menuconf = %conf.name, paths = added.len(), "merging rebuilt paths");
            data.paths.merge(added, &data.tree, policy);
        } else {
            data.paths = build_paths(&data.tree, policy);
            trace!(menuconf = %conf.name, paths = data.paths.len(), "built path index");
        }
    }
}

/// Parameters of one [`Processor::get_nodes`] call.
#[derive(Debug, Clone, Default)]
pub struct NodesQuery {
    /// Menuconf name; the routed one when absent.
    pub menuconf: Option<String>,
    /// Modifier group for the DEFAULT pass; `default` when absent.
    pub modifiers: Option<String>,
    /// Only prepare the per-request tree, return nothing.
    pub init_only: bool,
    pub args: ModifyArgs,
}

impl NodesQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn menuconf(mut self, name: impl Into<String>) -> Self {
        self.menuconf = Some(name.into());
        self
    }

    pub fn modifiers(mut self, group: impl Into<String>) -> Self {
        self.modifiers = Some(group.into());
        self
    }

    pub fn init_only(mut self) -> Self {
        self.init_only = true;
        self
    }

    pub fn args(mut self, args: ModifyArgs) -> Self {
        self.args = args;
        self
    }
}

/// Selects cache keys to delete in [`Processor::clear_cache`].
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct CacheFilter {
    pub menuconf: Option<String>,
    pub language: Option<String>,
    pub site_id: Option<String>,
}

impl CacheFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn menuconf(mut self, name: impl Into<String>) -> Self {
        self.menuconf = Some(name.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn site(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    fn matches(&self, key: &CacheKeyParts) -> bool {
        let field = |want: &Option<String>, have: &str| want.as_deref().is_none_or(|w| w == have);
        field(&self.menuconf, &key.menuconf)
            && field(&self.language, &key.language)
            && field(&self.site_id, &key.site_id)
    }
}

#[derive(Debug, Clone)]
struct CacheKeyParts {
    menuconf: String,
    language: String,
    site_id: String,
}

/// Resolves menuconfs and produces node trees for requests.
pub struct Processor {
    registry: Arc<Registry>,
    confs: MenuConfs,
    cache: Arc<dyn CacheStore>,
    router: Arc<dyn Router>,
    path_policy: Arc<dyn PathPolicy>,
    post_build: Arc<dyn PostBuildHandler>,
    rebuild_limit: usize,
    issued_keys: DashMap<String, CacheKeyParts>,
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("registry", &self.registry)
            .field("confs", &self.confs)
            .field("rebuild_limit", &self.rebuild_limit)
            .field("issued_keys", &self.issued_keys.len())
            .finish()
    }
}

impl Processor {
    /// Validate `settings` against `registry` and create a processor with
    /// an in-process cache, regex routing and weight-based path policy.
    pub fn new(registry: Arc<Registry>, settings: &MenuSettings) -> MenuResult<Self> {
        let confs = MenuConfs::prepare(settings, &registry)?;
        let router = Arc::new(RegexRouter::new(&confs));
        Ok(Self {
            registry,
            confs,
            cache: Arc::new(MokaCacheStore::default()),
            router,
            path_policy: Arc::new(WeightPathPolicy),
            post_build: Arc::new(PathIndexBuilder),
            rebuild_limit: DEFAULT_REBUILD_LIMIT,
            issued_keys: DashMap::new(),
        })
    }

    /// Create a processor from environment configuration.
    ///
    /// Settings come from `config.settings_path`; an unset path is a
    /// settings error.
    pub fn from_config(registry: Arc<Registry>, config: &Config) -> MenuResult<Self> {
        let path = config
            .settings_path
            .as_ref()
            .ok_or_else(|| MenuError::Settings("MENUS_SETTINGS is not set".to_string()))?;
        let settings = MenuSettings::from_file(path)?;
        Ok(Self::new(registry, &settings)?
            .with_cache(Arc::new(MokaCacheStore::new(config.cache_capacity)))
            .with_rebuild_limit(config.rebuild_limit))
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = router;
        self
    }

    pub fn with_path_policy(mut self, policy: Arc<dyn PathPolicy>) -> Self {
        self.path_policy = policy;
        self
    }

    pub fn with_post_build(mut self, handler: Arc<dyn PostBuildHandler>) -> Self {
        self.post_build = handler;
        self
    }

    /// Set the maximum number of build passes; at least one is always allowed.
    pub fn with_rebuild_limit(mut self, limit: usize) -> Self {
        self.rebuild_limit = limit.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn confs(&self) -> &MenuConfs {
        &self.confs
    }

    /// Resolve a menuconf by name, or the routed one.
    ///
    /// Routing runs once per request; its result is kept on the request.
    pub fn menuconf(
        &self,
        request: &mut MenuRequest,
        name: Option<&str>,
    ) -> MenuResult<Arc<MenuConf>> {
        let routed = match &request.menus.routed {
            Some(routed) => routed.clone(),
            None => {
                let routed = self.router.route(request);
                debug!(path = %request.path, menuconf = %routed, "routed request");
                request.menus.routed = Some(routed.clone());
                routed
            }
        };
        let name = name.unwrap_or(&routed);
        self.confs
            .get(name)
            .cloned()
            .ok_or_else(|| MenuError::UnknownMenuConf(name.to_string()))
    }

    /// Nodes of a menuconf for this request.
    ///
    /// Returns `None` for `init_only` queries. Otherwise the result is a
    /// private copy the caller may keep or change.
    pub fn get_nodes(
        &self,
        request: &mut MenuRequest,
        query: &NodesQuery,
    ) -> MenuResult<Option<NodesData>> {
        let conf = self.menuconf(request, query.menuconf.as_deref())?;

        let group = if query.init_only {
            None
        } else {
            let group_name = query.modifiers.as_deref().unwrap_or(DEFAULT_GROUP);
            let group = conf.group(group_name).ok_or_else(|| MenuError::UnknownModifierGroup {
                menuconf: conf.name.clone(),
                group: group_name.to_string(),
            })?;
            Some((group_name, group))
        };

        let stable = match request.menus.menus.get(&conf.name) {
            Some(data) => group.is_some().then(|| data.clone()),
            None => {
                let data = self.prepare(request, &conf)?;
                let copy = group.is_some().then(|| data.clone());
                request.menus.menus.insert(conf.name.clone(), data);
                copy
            }
        };

        let (Some((group_name, group)), Some(mut data)) = (group, stable) else {
            return Ok(None);
        };

        let mut meta = ModifyMeta::new(ModifyEvent::Default);
        self.apply(&conf, group, request, &mut data, &mut meta, &query.args)?;
        trace!(
            menuconf = %conf.name,
            group = %group_name,
            nodes = data.tree.count(),
            "nodes ready"
        );
        Ok(Some(data))
    }

    /// Build or load the tree and stabilise it for this request.
    fn prepare(&self, request: &mut MenuRequest, conf: &MenuConf) -> MenuResult<NodesData> {
        let key = self.cache_key(conf, request);
        let routed = request.menus.routed.as_deref() == Some(conf.name.as_str());
        let group = conf.default_group();
        let empty = ModifyArgs::default();

        let mut pending: Option<NodesData> = None;
        let mut rebuild_mode = false;
        let mut passes = 0;

        let mut data = loop {
            if passes == self.rebuild_limit {
                warn!(menuconf = %conf.name, limit = self.rebuild_limit, "rebuild limit reached");
                return Err(MenuError::RebuildLoop {
                    menuconf: conf.name.clone(),
                    limit: self.rebuild_limit,
                });
            }
            passes += 1;

            let (mut data, fresh) = match pending.take() {
                Some(data) => (data, false),
                None => match self.load(&key) {
                    Some(data) => (data, false),
                    None => {
                        debug!(menuconf = %conf.name, key = %key, "building menu tree");
                        let tree = build_nodes(&self.registry, request, &conf.menus)?;
                        (NodesData::new(tree), true)
                    }
                },
            };

            if fresh || rebuild_mode {
                let mut meta = ModifyMeta::new(ModifyEvent::Once).rebuilding(rebuild_mode);
                self.apply(conf, group, request, &mut data, &mut meta, &empty)?;
                self.post_build
                    .handle(conf, &mut data, &meta, self.path_policy.as_ref());
            }
            if fresh && !rebuild_mode {
                self.store(conf, request, &key, &data)?;
            }

            let mut meta = ModifyMeta::new(ModifyEvent::PerRequest).rebuilding(rebuild_mode);
            self.apply(conf, group, request, &mut data, &mut meta, &empty)?;

            if !routed {
                break data;
            }

            let Some((selected, chain)) = search_selected(&mut data, &request.path) else {
                trace!(menuconf = %conf.name, path = %request.path, "no node selected");
                break data;
            };

            if !data.tree[selected].rebuilt && self.on_selected(selected, &mut data, request)? {
                debug!(
                    menuconf = %conf.name,
                    node = data.tree[selected].id,
                    pass = passes,
                    "selected node rebuilt its menu"
                );
                let node = &mut data.tree[selected];
                node.selected = false;
                node.rebuilt = true;
                rebuild_mode = true;
                pending = Some(data);
                continue;
            }

            data.selected = Some(selected);
            data.chain = Some(chain);
            break data;
        };

        let mut meta = ModifyMeta::new(ModifyEvent::PostSelect);
        self.apply(conf, group, request, &mut data, &mut meta, &empty)?;
        Ok(data)
    }

    /// Ask the menu owning the selected node whether it rebuilt content.
    fn on_selected(
        &self,
        node: NodeId,
        data: &mut NodesData,
        request: &MenuRequest,
    ) -> MenuResult<bool> {
        let namespace = data.tree[node].namespace.clone();
        let Some(menu) = self.registry.menu(&namespace) else {
            return Ok(false);
        };
        menu.on_selected(node, data, request)
            .map_err(|err| MenuError::menu_source(&namespace, err))
    }

    /// Run the modifiers of `group` that take part in `meta.event`.
    fn apply(
        &self,
        conf: &MenuConf,
        group: &[Arc<dyn Modifier>],
        request: &mut MenuRequest,
        data: &mut NodesData,
        meta: &mut ModifyMeta,
        args: &ModifyArgs,
    ) -> MenuResult<()> {
        for modifier in group {
            if !modifier.modify_events().contains(meta.event) {
                continue;
            }
            trace!(
                menuconf = %conf.name,
                modifier = modifier.name(),
                event = ?meta.event,
                "applying modifier"
            );
            modifier
                .modify(request, data, meta, args)
                .map_err(|err| MenuError::modifier(modifier.name(), err))?;
        }
        Ok(())
    }

    /// Cache key for a menuconf in the request's language and site.
    pub fn cache_key(&self, conf: &MenuConf, request: &MenuRequest) -> String {
        let extra: String = request
            .cache_extra
            .iter()
            .map(|part| format!("_{part}"))
            .collect();
        format!(
            "nodes_{}_{}_{}{}_cache",
            conf.name, request.language, request.site_id, extra
        )
    }

    fn load(&self, key: &str) -> Option<NodesData> {
        let raw = self.cache.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(data) => {
                debug!(key = %key, "menu tree loaded from cache");
                Some(data)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "discarding unreadable cached menu tree");
                None
            }
        }
    }

    fn store(
        &self,
        conf: &MenuConf,
        request: &MenuRequest,
        key: &str,
        data: &NodesData,
    ) -> MenuResult<()> {
        let raw = serde_json::to_string(data)?;
        self.cache.set(key, raw, conf.cache_timeout);
        self.issued_keys.insert(
            key.to_string(),
            CacheKeyParts {
                menuconf: conf.name.clone(),
                language: request.language.clone(),
                site_id: request.site_id.clone(),
            },
        );
        Ok(())
    }

    /// Delete cached trees matching `filter`; returns how many keys went.
    ///
    /// Only keys written by this processor are known.
    pub fn clear_cache(&self, filter: &CacheFilter) -> usize {
        let keys: Vec<String> = self
            .issued_keys
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();
        self.cache.delete_many(&keys);
        for key in &keys {
            self.issued_keys.remove(key);
        }
        debug!(keys = keys.len(), filter = ?filter, "cleared menu cache");
        keys.len()
    }
}
