//! Change tracking across reloads of a nested configuration.

use hotswap_control::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct FakeConfig {
    one: String,
    two: FakeConfigTwo,
    three: Vec<FakeConfigThree>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct FakeConfigTwo {
    twenty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct FakeConfigThree {
    thirty: String,
    thirtyone: FakeConfigThirtyone,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct FakeConfigThirtyone {
    threehundredandten: String,
}

impl Configuration for FakeConfig {}

fn generate() -> FakeConfig {
    FakeConfig {
        one: "one".to_string(),
        two: FakeConfigTwo {
            twenty: "twenty".to_string(),
        },
        three: vec![FakeConfigThree {
            thirty: "thirty".to_string(),
            thirtyone: FakeConfigThirtyone {
                threehundredandten: "threehundredandten".to_string(),
            },
        }],
    }
}

/// (query, expected after first load, expected after changing Three.0.Thirty)
const CASES: &[(&str, bool, bool)] = &[
    ("*", true, false),
    ("One", true, false),
    ("Two", true, false),
    ("Two.*", true, false),
    ("Two.Twenty", true, false),
    ("Three", true, false),
    ("Three.*", true, true),
    ("Three.0.Thirty", true, true),
    ("Three.0.Thirtyone", true, false),
    ("Three.0.Thirtyone.Threehundredandten", true, false),
];

#[test]
fn test_is_changed_after_nested_sequence_change() {
    let source = MemorySource::new("fake", generate());
    let control = Control::new(source.clone()).unwrap();

    for (item, first, _) in CASES {
        assert_eq!(control.is_changed(item), *first, "first load: IsChanged({item:?})");
    }

    source.update(|config| config.three[0].thirty = "30".to_string());
    control.reload().unwrap();

    for (item, _, second) in CASES {
        assert_eq!(control.is_changed(item), *second, "second load: IsChanged({item:?})");
    }

    assert_eq!(
        control.changes().iter().collect::<Vec<_>>(),
        vec!["Three.0.Thirty"]
    );
    assert_eq!(control.snapshot().three[0].thirty, "30");
    assert_eq!(control.previous().unwrap().three[0].thirty, "thirty");
}

#[test]
fn test_identical_reload_reports_nothing() {
    let source = MemorySource::new("fake", generate());
    let control = Control::new(source.clone()).unwrap();

    source.set(generate());
    control.reload().unwrap();

    assert!(control.changes().is_empty());
    for (item, _, _) in CASES {
        assert!(!control.is_changed(item), "IsChanged({item:?})");
    }
}

#[test]
fn test_multiple_changes_keep_field_order() {
    let source = MemorySource::new("fake", generate());
    let control = Control::new(source.clone()).unwrap();

    source.update(|config| {
        config.one = "uno".to_string();
        config.three.push(FakeConfigThree {
            thirty: "thirty-two".to_string(),
            thirtyone: FakeConfigThirtyone {
                threehundredandten: "x".to_string(),
            },
        });
    });
    control.reload().unwrap();

    assert_eq!(
        control.changes().iter().collect::<Vec<_>>(),
        vec![
            "One",
            "Three.1.Thirty",
            "Three.1.Thirtyone.Threehundredandten"
        ]
    );
    assert!(control.is_changed("Three.1.*"));
    assert!(!control.is_changed("Three.0.*"));
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ServiceConfig {
    name: String,
    limits: Limits,
    upstreams: Vec<Upstream>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Limits {
    max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Upstream {
    host: String,
    port: u16,
}

impl Configuration for ServiceConfig {}

#[test]
fn test_file_backed_reload() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(
        &config_path,
        r#"
name: edge
limits:
  max_connections: 10
upstreams:
  - host: a.internal
    port: 8080
"#,
    )
    .unwrap();

    let control = Control::<ServiceConfig>::builder()
        .with_file(&config_path)
        .build()
        .unwrap();
    assert_eq!(control.snapshot().limits.max_connections, 10);
    assert!(control.is_changed("*"));

    fs::write(
        &config_path,
        r#"
name: edge
limits:
  max_connections: 20
upstreams:
  - host: a.internal
    port: 8080
"#,
    )
    .unwrap();
    control.reload().unwrap();

    assert!(control.is_changed("limits.max_connections"));
    assert!(control.is_changed("limits.*"));
    assert!(!control.is_changed("upstreams.*"));
    assert!(!control.is_changed("name"));
}

#[test]
fn test_reload_of_deleted_file_keeps_state() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{"name": "edge", "limits": {"max_connections": 10}, "upstreams": [{"host": "a.internal", "port": 8080}]}"#,
    )
    .unwrap();

    let control = Control::<ServiceConfig>::builder()
        .with_file(&config_path)
        .build()
        .unwrap();

    fs::remove_file(&config_path).unwrap();
    let result = control.reload();

    assert!(matches!(result, Err(ConfigError::LoadError(_))));
    assert_eq!(control.snapshot().name, "edge");
    assert!(control.is_changed("*"));
    assert!(control.previous().is_none());
}

#[test]
fn test_pascal_case_file_reload() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    let document = |thirty: &str| {
        format!(
            "One: one\nTwo:\n  Twenty: twenty\nThree:\n  - Thirty: \"{thirty}\"\n    Thirtyone:\n      Threehundredandten: threehundredandten\n"
        )
    };
    fs::write(&config_path, document("thirty")).unwrap();

    let control = Control::<FakeConfig>::builder()
        .with_file(&config_path)
        .build()
        .unwrap();
    assert_eq!(*control.snapshot(), generate());

    fs::write(&config_path, document("30")).unwrap();
    control.reload().unwrap();

    for (item, _, second) in CASES {
        assert_eq!(control.is_changed(item), *second, "IsChanged({item:?})");
    }
}
