//! Menu and modifier registry.
//!
//! The registry is built once at startup, either explicitly or through
//! [`LazyRegistry`] on first use, and then shared read-only by every
//! request through an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use super::modifier::Modifier;
use super::modifiers;
use super::source::Menu;
use crate::config::Config;
use crate::error::{MenuError, MenuResult};

/// Registered menus (by namespace) and modifiers (by name).
#[derive(Default)]
pub struct Registry {
    menus: HashMap<String, Arc<dyn Menu>>,
    modifiers: HashMap<String, Arc<dyn Modifier>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("menus", &self.menu_names())
            .field("modifiers", &self.modifier_names())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in modifier.
    pub fn with_builtin_modifiers() -> Self {
        let mut registry = Self::new();
        for modifier in modifiers::builtin() {
            registry.modifiers.insert(modifier.name().to_string(), modifier);
        }
        registry
    }

    /// Register a menu under its namespace.
    pub fn register_menu(&mut self, menu: Arc<dyn Menu>) -> MenuResult<()> {
        let namespace = menu.namespace().to_string();
        if self.menus.contains_key(&namespace) {
            return Err(MenuError::NamespaceAlreadyRegistered(namespace));
        }
        debug!(namespace = %namespace, weight = menu.weight(), "registered menu");
        self.menus.insert(namespace, menu);
        Ok(())
    }

    /// Register a modifier under its name.
    pub fn register_modifier(&mut self, modifier: Arc<dyn Modifier>) -> MenuResult<()> {
        let name = modifier.name().to_string();
        if self.modifiers.contains_key(&name) {
            return Err(MenuError::ModifierAlreadyRegistered(name));
        }
        debug!(modifier = %name, "registered modifier");
        self.modifiers.insert(name, modifier);
        Ok(())
    }

    /// Builder form of [`register_menu`](Self::register_menu).
    pub fn with_menu(mut self, menu: Arc<dyn Menu>) -> MenuResult<Self> {
        self.register_menu(menu)?;
        Ok(self)
    }

    /// Builder form of [`register_modifier`](Self::register_modifier).
    pub fn with_modifier(mut self, modifier: Arc<dyn Modifier>) -> MenuResult<Self> {
        self.register_modifier(modifier)?;
        Ok(self)
    }

    pub fn menu(&self, namespace: &str) -> Option<&Arc<dyn Menu>> {
        self.menus.get(namespace)
    }

    pub fn modifier(&self, name: &str) -> Option<&Arc<dyn Modifier>> {
        self.modifiers.get(name)
    }

    pub fn has_menu(&self, namespace: &str) -> bool {
        self.menus.contains_key(namespace)
    }

    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.contains_key(name)
    }

    /// Registered menu namespaces, sorted.
    pub fn menu_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.menus.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered modifier names, sorted.
    pub fn modifier_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modifiers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve namespaces to menus, ordered by ascending weight.
    ///
    /// The sort is stable, so menus of equal weight keep the given order.
    pub fn menus_by_weight(&self, namespaces: &[String]) -> MenuResult<Vec<Arc<dyn Menu>>> {
        let mut menus = namespaces
            .iter()
            .map(|ns| {
                self.menus
                    .get(ns)
                    .cloned()
                    .ok_or_else(|| MenuError::UnknownMenu(ns.clone()))
            })
            .collect::<MenuResult<Vec<_>>>()?;
        menus.sort_by_key(|menu| menu.weight());
        Ok(menus)
    }
}

enum Discovery {
    Pending,
    Running,
    Ready(Arc<Registry>),
}

/// One-time registry discovery shared by concurrent first requests.
///
/// The first caller runs discovery; the others wait for it up to the
/// configured timeout. A failed discovery leaves the registry undiscovered
/// so a later call can try again.
pub struct LazyRegistry {
    state: Mutex<Discovery>,
    ready: Condvar,
    timeout: Duration,
}

impl LazyRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Mutex::new(Discovery::Pending),
            ready: Condvar::new(),
            timeout,
        }
    }

    /// Waiters give up after `config.discovery_timeout`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.discovery_timeout)
    }

    /// The registry, if discovery already completed.
    pub fn get(&self) -> Option<Arc<Registry>> {
        match &*self.state.lock() {
            Discovery::Ready(registry) => Some(Arc::clone(registry)),
            _ => None,
        }
    }

    /// Return the registry, running `discover` if nobody has yet.
    pub fn get_or_discover<F>(&self, discover: F) -> MenuResult<Arc<Registry>>
    where
        F: FnOnce() -> anyhow::Result<Registry>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut state = self.state.lock();

        loop {
            if let Discovery::Ready(registry) = &*state {
                return Ok(Arc::clone(registry));
            }
            if matches!(*state, Discovery::Pending) {
                break;
            }
            let timed_out = self.ready.wait_until(&mut state, deadline).timed_out();
            if timed_out && matches!(*state, Discovery::Running) {
                warn!(timeout_secs = self.timeout.as_secs(), "menu discovery wait timed out");
                return Err(MenuError::DiscoveryTimeout {
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        }

        *state = Discovery::Running;
        drop(state);

        info!("discovering menus");
        let result = discover();

        let mut state = self.state.lock();
        let outcome = match result {
            Ok(registry) => {
                let registry = Arc::new(registry);
                info!(
                    menus = registry.menus.len(),
                    modifiers = registry.modifiers.len(),
                    "menu discovery complete"
                );
                *state = Discovery::Ready(Arc::clone(&registry));
                Ok(registry)
            }
            Err(err) => {
                warn!(error = %err, "menu discovery failed");
                *state = Discovery::Pending;
                Err(MenuError::DiscoveryFailed(format!("{err:#}")))
            }
        };
        self.ready.notify_all();
        outcome
    }
}

impl fmt::Debug for LazyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRegistry")
            .field("ready", &self.get().is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}
