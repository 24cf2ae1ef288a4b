//! Scenario tests
//!
//! Each module walks one production scenario through the public crates,
//! using real files for sources, targets and the record store.

use conduit_core::{
    AdapterRegistry, AdminService, ContractStore, LogLevel, RunTrace, Store, SyncEngine,
    SynchronizationAction,
};
use conduit_test_utils::{TestWorkspace, fixtures};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;

/// A data directory with a file-backed store and the shipped adapters.
struct Scenario {
    ws: TestWorkspace,
    store: Arc<Store>,
    admin: AdminService,
    action: SynchronizationAction,
}

impl Scenario {
    fn new() -> Self {
        let ws = TestWorkspace::new();
        let store = Arc::new(Store::open(ws.data_dir().as_path()).unwrap());
        let admin = AdminService::new(store.clone(), store.clone(), store.clone());
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            store.clone(),
            AdapterRegistry::with_defaults(),
        ));
        let action = SynchronizationAction::new(store.clone(), store.clone(), engine);
        Self {
            ws,
            store,
            admin,
            action,
        }
    }

    fn write_people(&self, people: &[Value]) -> PathBuf {
        self.ws
            .write_source("people.json", &Value::Array(people.to_vec()))
    }

    fn create(&self, delete_old_targets: bool) -> i64 {
        let source = self.ws.root().join("sources").join("people.json");
        self.admin
            .create_synchronization(fixtures::json_file_definition(
                "people",
                &source,
                &self.ws.target_dir("people"),
                delete_old_targets,
            ))
            .unwrap()
            .id
    }

    fn run(&self, id: i64) -> RunTrace {
        self.action.run(&json!({ "synchronizationId": id }))
    }

    fn origin_ids(&self, id: i64) -> Vec<String> {
        let mut ids: Vec<String> = self
            .store
            .find_by_synchronization(id)
            .unwrap()
            .into_iter()
            .map(|c| c.origin_id)
            .collect();
        ids.sort();
        ids
    }
}

fn abc() -> Vec<Value> {
    fixtures::people_abc()
        .into_iter()
        .map(|(_, person)| person)
        .collect()
}

// =============================================================================
// Mapping semantics
// =============================================================================

mod s1_mapping {
    use super::*;
    use conduit_mapping::{MappingDefinition, map};
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_interpolate_as_empty() {
        let mapping = MappingDefinition::from_value(json!({"full": "{{first}}{{last}}"})).unwrap();
        assert_eq!(map(&mapping, &json!({})).unwrap(), json!({"full": ""}));
    }

    #[test]
    fn single_token_keeps_type_and_interpolation_stringifies() {
        let mapping = MappingDefinition::from_value(json!({
            "age": "{{age}}",
            "label": "Age: {{age}}"
        }))
        .unwrap();
        assert_eq!(
            map(&mapping, &json!({"age": 30})).unwrap(),
            json!({"age": 30, "label": "Age: 30"})
        );
    }

    #[test]
    fn full_form_with_pass_through_cast_and_unset() {
        let mapping = MappingDefinition::from_value(json!({
            "rules": {"name": "{{name | upper}}", "age": "{{age}}"},
            "passThrough": true,
            "cast": {"age": "string"},
            "unset": ["email"]
        }))
        .unwrap();

        let input = fixtures::john_doe();
        let output = map(&mapping, &input).unwrap();

        assert_eq!(output, json!({"id": 1, "name": "JOHN DOE", "age": "30"}));
        assert_eq!(input, fixtures::john_doe());
    }
}

// =============================================================================
// Idempotent re-runs
// =============================================================================

mod s2_idempotence {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn second_run_writes_nothing() {
        let s = Scenario::new();
        s.write_people(&abc());
        let id = s.create(false);

        assert_eq!(s.run(id).message(), "Synchronized 3 successfully");
        let before = s.store.find_by_synchronization(id).unwrap();

        let trace = s.run(id);
        assert_eq!(trace.level(), LogLevel::Info);
        assert_eq!(trace.message(), "Synchronized 0 successfully");
        assert_eq!(s.store.find_by_synchronization(id).unwrap(), before);
        assert_eq!(s.ws.target_objects("people").len(), 3);
    }

    #[test]
    fn edited_source_object_updates_its_target_in_place() {
        let s = Scenario::new();
        s.write_people(&abc());
        let id = s.create(false);
        s.run(id);

        let mut people = abc();
        people[0]["age"] = json!(37);
        s.write_people(&people);

        assert_eq!(s.run(id).message(), "Synchronized 1 successfully");
        let targets = s.ws.target_objects("people");
        assert_eq!(targets.len(), 3);
        assert!(targets.contains(&json!({"fullName": "Ada", "userAge": 37})));
    }
}

// =============================================================================
// Stale target deletion
// =============================================================================

mod s3_stale_targets {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn removed_origin_is_deleted_from_target_and_contracts() {
        let s = Scenario::new();
        s.write_people(&abc());
        let id = s.create(true);
        s.run(id);

        let people: Vec<Value> = abc().into_iter().filter(|p| p["id"] != "B").collect();
        s.write_people(&people);
        let trace = s.run(id);

        assert_eq!(trace.level(), LogLevel::Info);
        assert!(trace.stack_trace().contains(
            &"Deleted 1 targets that don't exist in their source anymore".to_string()
        ));
        assert_eq!(s.origin_ids(id), vec!["A", "C"]);

        let mut names: Vec<String> = s
            .ws
            .target_objects("people")
            .iter()
            .map(|t| t["fullName"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Ada", "Cy"]);
    }

    #[test]
    fn targets_survive_without_delete_flag() {
        let s = Scenario::new();
        s.write_people(&abc());
        let id = s.create(false);
        s.run(id);

        s.write_people(&[]);
        s.run(id);

        assert_eq!(s.origin_ids(id), vec!["A", "B", "C"]);
        assert_eq!(s.ws.target_objects("people").len(), 3);
    }
}

// =============================================================================
// Administrative lifecycle
// =============================================================================

mod s4_admin {
    use super::*;
    use conduit_core::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn update_bumps_patch_and_keeps_uuid() {
        let s = Scenario::new();
        let id = s.create(false);
        let created = s.admin.update_synchronization(id, json!({})).unwrap();
        let updated = s
            .admin
            .update_synchronization(id, json!({"name": "people v2", "id": 999}))
            .unwrap();

        assert_eq!(created.version.to_string(), "0.0.2");
        assert_eq!(updated.version.to_string(), "0.0.3");
        assert_eq!(updated.uuid, created.uuid);
        assert_eq!(updated.id, id);
    }

    #[test]
    fn delete_is_refused_while_contracts_exist() {
        let s = Scenario::new();
        s.write_people(&abc());
        let id = s.create(false);
        s.run(id);

        assert!(matches!(
            s.admin.delete_synchronization(id),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let s = Scenario::new();
        let err = s
            .admin
            .create_synchronization(json!({"name": "x", "cron": "* * * * *"}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}

// =============================================================================
// Failure paths
// =============================================================================

mod s5_failures {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_source_file_is_run_fatal() {
        let s = Scenario::new();
        let id = s.create(true);

        let trace = s.run(id);
        assert_eq!(trace.level(), LogLevel::Error);
        assert!(trace.message().starts_with("Failed to synchronize: Source unavailable"));
        assert!(s.origin_ids(id).is_empty());
    }

    #[test]
    fn item_without_id_aborts_the_run() {
        let s = Scenario::new();
        s.write_people(&[json!({"name": "Nobody"})]);
        let id = s.create(false);

        let trace = s.run(id);
        assert_eq!(trace.level(), LogLevel::Error);
        assert!(trace.message().contains("has no usable 'id'"));
    }

    #[test]
    fn unknown_adapter_type_is_reported() {
        let s = Scenario::new();
        let definition = s
            .admin
            .create_synchronization(json!({
                "name": "ftp",
                "sourceConfig": {"type": "ftp"},
                "targetConfig": {"type": "json_directory", "path": "/tmp/unused"},
                "mapping": fixtures::person_mapping()
            }))
            .unwrap();

        let trace = s.run(definition.id);
        assert_eq!(trace.level(), LogLevel::Error);
        assert!(trace.message().contains("Unknown source type 'ftp'"));
    }

    #[test]
    fn required_field_failure_marks_only_that_contract() {
        let s = Scenario::new();
        s.write_people(&[
            json!({"id": "A", "name": "Ada", "age": 36}),
            json!({"id": "B", "age": 41}),
        ]);
        let source = s.ws.root().join("sources").join("people.json");
        let mut input =
            fixtures::json_file_definition("people", &source, &s.ws.target_dir("people"), false);
        input["mapping"] = json!({
            "rules": fixtures::person_mapping(),
            "required": ["fullName"]
        });
        let id = s.admin.create_synchronization(input).unwrap().id;

        let trace = s.run(id);
        assert_eq!(trace.level(), LogLevel::Info);
        assert_eq!(trace.message(), "Synchronized 1 successfully");
        assert!(
            trace
                .stack_trace()
                .iter()
                .any(|step| step.starts_with("Failed to synchronize object B:"))
        );
    }
}
