//! Menu settings validation and loading.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;

use sentiero_kernel::menu::{MenuSettings, NodesQuery, Processor};
use sentiero_kernel::{Config, MenuError};
use sentiero_test_utils::{StaticMenu, anonymous_request, registry_with, site_nodes};

fn temp_settings(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("sentiero-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_invalid_settings_refuse_to_start() {
    let registry = registry_with(vec![Arc::new(StaticMenu::new("Main", site_nodes()))]);
    let settings = MenuSettings::from_yaml(
        "
menus:
  sidebar:
    menus: [Main, Main, Missing]
    modifiers: [Level, Sparkle]
",
    )
    .unwrap();

    let err = Processor::new(Arc::new(registry), &settings).unwrap_err();
    assert!(err.is_configuration());
    let MenuError::ImproperlyConfigured(problems) = err else {
        panic!("expected a configuration error");
    };
    assert_eq!(problems.len(), 3);
    assert!(problems.iter().any(|p| p.contains("must contain")));
    assert!(problems.iter().any(|p| p.contains("Missing")));
    assert!(problems.iter().any(|p| p.contains("Sparkle")));
}

#[test]
fn test_settings_from_yaml_file() {
    let path = temp_settings(
        "menus.yaml",
        "
menus:
  default:
    menus: [Main]
    cache_timeout: 30
",
    );
    let settings = MenuSettings::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let registry = registry_with(vec![Arc::new(StaticMenu::new("Main", site_nodes()))]);
    let processor = Processor::new(Arc::new(registry), &settings).unwrap();
    let conf = processor.confs().get("default").unwrap();
    assert_eq!(conf.cache_timeout.as_secs(), 30);
    assert_eq!(conf.group_names().collect::<Vec<_>>(), vec!["default"]);
}

#[test]
fn test_processor_from_config() {
    let path = temp_settings("menus.json", r#"{"menus": {"default": {"menus": ["Main"]}}}"#);
    let config = Config {
        settings_path: Some(path.clone()),
        rebuild_limit: 2,
        ..Config::default()
    };

    let main = Arc::new(StaticMenu::new("Main", site_nodes()));
    let registry = Arc::new(registry_with(vec![main.clone()]));
    let processor = Processor::from_config(registry, &config).unwrap();
    std::fs::remove_file(&path).unwrap();

    let data = processor
        .get_nodes(&mut anonymous_request("/about/"), &NodesQuery::new())
        .unwrap()
        .unwrap();
    assert_eq!(data.selected_node().unwrap().title, "About");
    assert_eq!(main.calls(), 1);
}

#[test]
fn test_missing_settings_path_is_reported() {
    let registry = registry_with(Vec::new());
    let err = Processor::from_config(Arc::new(registry), &Config::default()).unwrap_err();
    assert!(matches!(err, MenuError::Settings(_)));
}
