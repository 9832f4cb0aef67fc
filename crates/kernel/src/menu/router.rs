//! Request to menuconf routing.

use regex::Regex;

use super::paths::request_path;
use super::request::MenuRequest;
use super::settings::{DEFAULT_MENUCONF, MenuConfs};

/// Chooses the menuconf a request renders with by default.
pub trait Router: Send + Sync {
    /// Name of the menuconf for this request.
    fn route(&self, request: &MenuRequest) -> String;
}

/// Regex routing over the request path.
///
/// The route table is checked first, then each menuconf's own `route` in
/// name order. Patterns match at the start of the path either as given or
/// with its leading slash removed, so both `blog/` and `/blog/` match
/// `/blog/2024/`. Without a match the `default` menuconf is used.
#[derive(Debug, Clone, Default)]
pub struct RegexRouter {
    routes: Vec<(Regex, String)>,
}

impl RegexRouter {
    pub fn new(confs: &MenuConfs) -> Self {
        let table = confs
            .routes()
            .map(|(regex, name)| (regex.clone(), name.to_string()));
        let own = confs
            .iter()
            .filter_map(|conf| conf.route.clone().map(|regex| (regex, conf.name.clone())));
        Self {
            routes: table.chain(own).collect(),
        }
    }
}

impl Router for RegexRouter {
    fn route(&self, request: &MenuRequest) -> String {
        let raw = request.path.as_str();
        let path = raw.trim_start_matches('/');
        let normalized = request_path(raw);
        self.routes
            .iter()
            .find(|(regex, _)| {
                regex.is_match(path) || regex.is_match(raw) || regex.is_match(&normalized)
            })
            .map_or_else(|| DEFAULT_MENUCONF.to_string(), |(_, name)| name.clone())
    }
}
