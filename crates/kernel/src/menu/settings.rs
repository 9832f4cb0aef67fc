//! Menu configuration ("menuconf") settings and startup validation.
//!
//! Settings are plain data loaded from YAML or JSON:
//!
//! ```yaml
//! menus:
//!   default:
//!     menus: [Main, Footer]
//!     modifiers: [NavigationExtender, Level, CutLevels]
//!   account:
//!     menus: [Account]
//!     modifiers:
//!       default: [AuthVisibility, Level]
//!       sidebar: [Level, CutLevels]
//!     cache_timeout: 60
//!     route: "account/"
//! routes:
//!   - pattern: "shop/"
//!     menuconf: default
//! ```
//!
//! [`MenuConfs::prepare`] resolves every name against the [`Registry`] once
//! and reports all problems together.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::modifier::Modifier;
use super::modifiers::DEFAULT_SCHEME;
use super::registry::Registry;
use crate::error::{MenuError, MenuResult};

/// Name of the menuconf used when routing finds nothing better.
pub const DEFAULT_MENUCONF: &str = "default";

/// Name of the modifier group used when a call names none.
pub const DEFAULT_GROUP: &str = "default";

/// Cache lifetime of built trees when a menuconf sets none.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(600);

/// Raw settings as read from a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuSettings {
    /// Menuconfs by name.
    #[serde(default)]
    pub menus: BTreeMap<String, RawMenuConf>,
    /// Route table checked before the per-menuconf routes.
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

/// One menuconf entry before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMenuConf {
    /// Menu namespaces to merge.
    #[serde(default)]
    pub menus: Vec<String>,
    #[serde(default)]
    pub modifiers: Option<ModifierSpec>,
    /// Seconds a built tree stays in the cache.
    #[serde(default)]
    pub cache_timeout: Option<u64>,
    /// Regex matched against the start of the request path.
    #[serde(default)]
    pub route: Option<String>,
}

/// Modifiers of a menuconf: one list or named groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModifierSpec {
    List(Vec<String>),
    Groups(BTreeMap<String, Vec<String>>),
}

/// Entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub pattern: String,
    pub menuconf: String,
}

impl MenuSettings {
    /// Parse YAML settings.
    pub fn from_yaml(text: &str) -> MenuResult<Self> {
        serde_yml::from_str(text)
            .map_err(|err| MenuError::Settings(format!("invalid YAML menu settings: {err}")))
    }

    /// Parse JSON settings.
    pub fn from_json(text: &str) -> MenuResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| MenuError::Settings(format!("invalid JSON menu settings: {err}")))
    }

    /// Load settings from a file; `.json` files are JSON, anything else YAML.
    pub fn from_file(path: impl AsRef<Path>) -> MenuResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            MenuError::Settings(format!("failed to read {}: {err}", path.display()))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_yaml(&text)
        }
    }

    /// Settings with a single `default` menuconf over the given menus.
    pub fn single<I, S>(menus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let conf = RawMenuConf {
            menus: menus.into_iter().map(Into::into).collect(),
            ..RawMenuConf::default()
        };
        Self {
            menus: BTreeMap::from([(DEFAULT_MENUCONF.to_string(), conf)]),
            routes: Vec::new(),
        }
    }
}

/// A validated menuconf with modifiers resolved to instances.
pub struct MenuConf {
    pub name: String,
    pub menus: Vec<String>,
    modifiers: BTreeMap<String, Vec<Arc<dyn Modifier>>>,
    pub cache_timeout: Duration,
    pub route: Option<Regex>,
}

impl fmt::Debug for MenuConf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: BTreeMap<&str, Vec<&str>> = self
            .modifiers
            .iter()
            .map(|(group, mods)| (group.as_str(), mods.iter().map(|m| m.name()).collect()))
            .collect();
        f.debug_struct("MenuConf")
            .field("name", &self.name)
            .field("menus", &self.menus)
            .field("modifiers", &groups)
            .field("cache_timeout", &self.cache_timeout)
            .field("route", &self.route.as_ref().map(Regex::as_str))
            .finish()
    }
}

impl MenuConf {
    /// Modifiers of a named group, in configured order.
    pub fn group(&self, name: &str) -> Option<&[Arc<dyn Modifier>]> {
        self.modifiers.get(name).map(Vec::as_slice)
    }

    /// The `default` modifier group.
    pub fn default_group(&self) -> &[Arc<dyn Modifier>] {
        self.group(DEFAULT_GROUP).unwrap_or_default()
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.modifiers.keys().map(String::as_str)
    }
}

/// All validated menuconfs plus the route table.
#[derive(Debug, Default)]
pub struct MenuConfs {
    confs: BTreeMap<String, Arc<MenuConf>>,
    routes: Vec<(Regex, String)>,
}

impl MenuConfs {
    /// Validate settings against the registry.
    ///
    /// Every menuconf must list at least one menu, without repeats, and
    /// only registered ones. Modifier groups may only name registered
    /// modifiers, once each. A plain list becomes the `default` group; a
    /// menuconf without modifiers, or a mapping without `default`, gets the
    /// default scheme restricted to registered modifiers.
    pub fn prepare(settings: &MenuSettings, registry: &Registry) -> MenuResult<Self> {
        let mut errors = Vec::new();

        if !settings.menus.contains_key(DEFAULT_MENUCONF) {
            errors.push(format!(
                "menu settings must contain a \"{DEFAULT_MENUCONF}\" menuconf"
            ));
        }

        let scheme: Vec<String> = DEFAULT_SCHEME
            .iter()
            .filter(|name| registry.has_modifier(name))
            .map(|name| (*name).to_string())
            .collect();

        let mut confs = BTreeMap::new();
        for (name, raw) in &settings.menus {
            match prepare_conf(name, raw, registry, &scheme) {
                Ok(conf) => {
                    debug!(menuconf = %name, menus = ?conf.menus, "prepared menuconf");
                    confs.insert(name.clone(), Arc::new(conf));
                }
                Err(mut conf_errors) => errors.append(&mut conf_errors),
            }
        }

        let mut routes = Vec::new();
        for entry in &settings.routes {
            if !settings.menus.contains_key(&entry.menuconf) {
                errors.push(format!(
                    "route \"{}\" points to unknown menuconf \"{}\"",
                    entry.pattern, entry.menuconf
                ));
                continue;
            }
            match compile_route(&entry.pattern) {
                Ok(regex) => routes.push((regex, entry.menuconf.clone())),
                Err(err) => errors.push(format!("route \"{}\" is invalid: {err}", entry.pattern)),
            }
        }

        if !errors.is_empty() {
            return Err(MenuError::ImproperlyConfigured(errors));
        }

        info!(menuconfs = confs.len(), routes = routes.len(), "menu settings validated");
        Ok(Self { confs, routes })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<MenuConf>> {
        self.confs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.confs.contains_key(name)
    }

    /// Menuconf names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.confs.keys().map(String::as_str)
    }

    /// Menuconfs in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<MenuConf>> {
        self.confs.values()
    }

    /// Route table entries, in declaration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Regex, &str)> {
        self.routes.iter().map(|(regex, name)| (regex, name.as_str()))
    }
}

fn prepare_conf(
    name: &str,
    raw: &RawMenuConf,
    registry: &Registry,
    scheme: &[String],
) -> Result<MenuConf, Vec<String>> {
    let mut errors = Vec::new();

    if raw.menus.is_empty()
        || !is_unique(&raw.menus)
        || raw.menus.iter().any(|menu| !registry.has_menu(menu))
    {
        errors.push(format!("menuconf \"{name}\" menus value {:?} is invalid", raw.menus));
    }

    let mut groups: BTreeMap<String, Vec<String>> = match &raw.modifiers {
        Some(ModifierSpec::List(list)) => {
            BTreeMap::from([(DEFAULT_GROUP.to_string(), list.clone())])
        }
        Some(ModifierSpec::Groups(groups)) => groups.clone(),
        None => BTreeMap::new(),
    };
    groups
        .entry(DEFAULT_GROUP.to_string())
        .or_insert_with(|| scheme.to_vec());

    let mut modifiers = BTreeMap::new();
    for (group, names) in &groups {
        if !is_unique(names) || names.iter().any(|m| !registry.has_modifier(m)) {
            errors.push(format!(
                "menuconf \"{name}\" modifiers \"{group}\" value {names:?} is invalid"
            ));
            continue;
        }
        let resolved: Vec<Arc<dyn Modifier>> = names
            .iter()
            .filter_map(|m| registry.modifier(m).cloned())
            .collect();
        modifiers.insert(group.clone(), resolved);
    }

    let route = match raw.route.as_deref() {
        Some(pattern) => match compile_route(pattern) {
            Ok(regex) => Some(regex),
            Err(err) => {
                errors.push(format!("menuconf \"{name}\" route \"{pattern}\" is invalid: {err}"));
                None
            }
        },
        None => None,
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(MenuConf {
        name: name.to_string(),
        menus: raw.menus.clone(),
        modifiers,
        cache_timeout: raw
            .cache_timeout
            .map_or(DEFAULT_CACHE_TIMEOUT, Duration::from_secs),
        route,
    })
}

/// Routes match at the start of the path, like a prefix.
fn compile_route(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

fn is_unique(values: &[String]) -> bool {
    let mut seen = HashSet::new();
    values.iter().all(|v| seen.insert(v.as_str()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::menu::node::NavigationNode;
    use crate::menu::request::MenuRequest;
    use crate::menu::source::Menu;

    struct Empty(&'static str);

    impl Menu for Empty {
        fn namespace(&self) -> &str {
            self.0
        }

        fn get_nodes(&self, _request: &MenuRequest) -> anyhow::Result<Vec<NavigationNode>> {
            Ok(Vec::new())
        }
    }

    fn registry() -> Registry {
        Registry::with_builtin_modifiers()
            .with_menu(Arc::new(Empty("Main")))
            .unwrap()
            .with_menu(Arc::new(Empty("Footer")))
            .unwrap()
    }

    fn errors(result: MenuResult<MenuConfs>) -> Vec<String> {
        match result.unwrap_err() {
            MenuError::ImproperlyConfigured(errors) => errors,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_yaml_modifier_forms() {
        let settings = MenuSettings::from_yaml(
            r#"
menus:
  default:
    menus: [Main]
    modifiers: [Level, CutLevels]
  footer:
    menus: [Footer]
    modifiers:
      compact: [CutLevels]
    cache_timeout: 30
    route: "legal/"
  plain:
    menus: [Main, Footer]
"#,
        )
        .unwrap();
        let confs = MenuConfs::prepare(&settings, &registry()).unwrap();

        let default = confs.get("default").unwrap();
        let names: Vec<_> = default.default_group().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["Level", "CutLevels"]);

        let footer = confs.get("footer").unwrap();
        assert_eq!(footer.cache_timeout, Duration::from_secs(30));
        assert_eq!(footer.group("compact").unwrap().len(), 1);
        assert_eq!(footer.default_group().len(), DEFAULT_SCHEME.len());
        assert!(footer.route.as_ref().unwrap().is_match("legal/terms"));
        assert!(!footer.route.as_ref().unwrap().is_match("about/legal/"));

        let plain = confs.get("plain").unwrap();
        assert_eq!(plain.cache_timeout, DEFAULT_CACHE_TIMEOUT);
        let names: Vec<_> = plain.default_group().iter().map(|m| m.name()).collect();
        assert_eq!(names, DEFAULT_SCHEME.to_vec());
    }

    #[test]
    fn test_json_settings() {
        let settings = MenuSettings::from_json(
            r#"{"menus": {"default": {"menus": ["Main"], "modifiers": []}},
                "routes": [{"pattern": "shop/", "menuconf": "default"}]}"#,
        )
        .unwrap();
        let confs = MenuConfs::prepare(&settings, &registry()).unwrap();
        assert!(confs.get("default").unwrap().default_group().is_empty());
        assert_eq!(confs.routes().count(), 1);
    }

    #[test]
    fn test_default_menuconf_is_required() {
        let mut settings = MenuSettings::single(["Main"]);
        let conf = settings.menus.remove(DEFAULT_MENUCONF).unwrap();
        settings.menus.insert("other".to_string(), conf);
        let errors = errors(MenuConfs::prepare(&settings, &registry()));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("\"default\""));
    }

    #[test]
    fn test_all_problems_reported_together() {
        let settings = MenuSettings::from_yaml(
            r#"
menus:
  default:
    menus: [Main, Main]
  broken:
    menus: [Nope]
    modifiers:
      default: [Level, Level]
      side: [Unknown]
    route: "("
  empty:
    menus: []
routes:
  - pattern: "x/"
    menuconf: missing
"#,
        )
        .unwrap();
        let errors = errors(MenuConfs::prepare(&settings, &registry()));
        assert_eq!(errors.len(), 7, "{errors:#?}");
        assert!(errors.iter().any(|e| e.contains("\"default\" menus")));
        assert!(errors.iter().any(|e| e.contains("\"broken\" modifiers \"side\"")));
        assert!(errors.iter().any(|e| e.contains("\"empty\" menus")));
        assert!(errors.iter().any(|e| e.contains("unknown menuconf \"missing\"")));
    }

    #[test]
    fn test_unregistered_default_scheme_entries_are_skipped() {
        let registry = Registry::new()
            .with_menu(Arc::new(Empty("Main")))
            .unwrap()
            .with_modifier(Arc::new(crate::menu::modifiers::Level))
            .unwrap();
        let confs = MenuConfs::prepare(&MenuSettings::single(["Main"]), &registry).unwrap();
        let names: Vec<_> = confs
            .get("default")
            .unwrap()
            .default_group()
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(names, vec!["Level"]);
    }

    #[test]
    fn test_unreadable_file_is_a_settings_error() {
        let err = MenuSettings::from_file("/nonexistent/menus.yaml").unwrap_err();
        assert!(matches!(err, MenuError::Settings(_)));
    }
}
