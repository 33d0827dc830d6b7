use std::{fs, path::PathBuf};

use tempfile::TempDir;
use wodarc_config::WodarcConfigLoader;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
fn test_config_load_from_file() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
target:
  username: cfgn_ej
  output: data/wods.json
crawl:
  min_delay_secs: 5.0
  max_delay_secs: 10.0
  max_posts: 50
  headless: true
proxy: "http://proxy.internal:8080"
"#;
    let p = write_yaml(&tmp, "wodarc.yaml", file_yaml);

    let config = WodarcConfigLoader::new()
        .with_file(p)
        .load()
        .expect("load crawler config");

    assert_eq!(config.target.username, "cfgn_ej");
    assert_eq!(config.crawl.min_delay_secs, 5.0);
    assert_eq!(config.crawl.max_posts, Some(50));
    assert_eq!(config.proxy.as_deref(), Some("http://proxy.internal:8080"));
    // The promotional defaults survive a file that does not mention them.
    assert_eq!(config.boilerplate.len(), 2);
}

#[test]
fn test_missing_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = WodarcConfigLoader::new()
        .with_file(tmp.path().join("nope.yaml"))
        .load();
    assert!(result.is_err());
}
