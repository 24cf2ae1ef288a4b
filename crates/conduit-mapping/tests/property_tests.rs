//! Property tests for mapping purity and type preservation

use conduit_mapping::{MappingDefinition, map};
use proptest::prelude::*;
use serde_json::{Value, json};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

proptest! {
    #[test]
    fn single_token_preserves_value(value in scalar()) {
        let mapping = MappingDefinition::from_rules(json!({"out": "{{field}}"})).unwrap();
        let output = map(&mapping, &json!({"field": value.clone()})).unwrap();
        prop_assert_eq!(&output["out"], &value);
    }

    #[test]
    fn mapping_is_deterministic_and_pure(
        name in "[a-z]{1,8}",
        count in any::<i32>(),
    ) {
        let mapping = MappingDefinition::from_rules(json!({
            "label": "{{name | upper}}:{{count}}",
            "count": "{{count}}"
        })).unwrap();
        let input = json!({"name": name, "count": count});
        let snapshot = input.clone();

        let first = map(&mapping, &input).unwrap();
        let second = map(&mapping, &input).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&input, &snapshot);
        prop_assert_eq!(
            first["label"].as_str().unwrap(),
            format!("{}:{}", name.to_uppercase(), count)
        );
    }

    #[test]
    fn literal_text_without_braces_is_copied(text in "[^{}]{0,32}") {
        let mapping = MappingDefinition::from_rules(json!({"t": text.clone()})).unwrap();
        let output = map(&mapping, &json!({})).unwrap();
        prop_assert_eq!(output["t"].as_str().unwrap(), text.as_str());
    }
}
