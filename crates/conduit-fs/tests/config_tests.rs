use conduit_fs::{ConfigStore, Error, NormalizedPath};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct SourceSettings {
    name: String,
    batch: i32,
}

#[rstest]
#[case("settings.toml", "name = \"crm\"\nbatch = 42\n")]
#[case("settings.json", r#"{"name": "crm", "batch": 42}"#)]
#[case("settings.yaml", "name: crm\nbatch: 42\n")]
#[case("settings.yml", "name: crm\nbatch: 42\n")]
fn load_detects_format_from_extension(#[case] file: &str, #[case] content: &str) {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join(file);
    fs::write(&file_path, content).unwrap();

    let loaded: SourceSettings = ConfigStore::new()
        .load(&NormalizedPath::new(&file_path))
        .unwrap();

    assert_eq!(
        loaded,
        SourceSettings {
            name: "crm".into(),
            batch: 42
        }
    );
}

#[rstest]
#[case("roundtrip.toml")]
#[case("roundtrip.json")]
#[case("roundtrip.yaml")]
fn save_then_load_preserves_value(#[case] file: &str) {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join(file));
    let store = ConfigStore::new();

    let original = SourceSettings {
        name: "roundtrip".into(),
        batch: 7,
    };
    store.save(&path, &original).unwrap();
    let loaded: SourceSettings = store.load(&path).unwrap();

    assert_eq!(original, loaded);
}

#[test]
fn load_if_exists_returns_none_for_missing_file() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("absent.json"));

    let loaded: Option<SourceSettings> = ConfigStore::new().load_if_exists(&path).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn unsupported_extension_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("settings.xyz");
    fs::write(&file_path, "data").unwrap();

    let result: conduit_fs::Result<SourceSettings> =
        ConfigStore::new().load(&NormalizedPath::new(&file_path));

    assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
}

#[test]
fn parse_error_names_the_format() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("broken.json");
    fs::write(&file_path, "{not json").unwrap();

    let result: conduit_fs::Result<SourceSettings> =
        ConfigStore::new().load(&NormalizedPath::new(&file_path));

    match result {
        Err(Error::ConfigParse { format, .. }) => assert_eq!(format, "JSON"),
        other => panic!("expected parse error, got {:?}", other),
    }
}
