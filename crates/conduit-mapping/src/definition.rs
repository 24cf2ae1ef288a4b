//! Mapping definitions as stored and exchanged over the API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::cast::CastType;
use crate::error::{MappingError, Result};

/// Declarative description of how one object is transformed into another
///
/// `rules` keeps insertion order, and outputs are produced in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MappingDefinition {
    /// Output key → expression
    #[serde(default)]
    pub rules: Map<String, Value>,

    /// Start from a copy of the input instead of an empty object
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pass_through: bool,

    /// Output keys removed after the rules run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unset: Vec<String>,

    /// Output key → type coercion
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cast: BTreeMap<String, CastType>,

    /// Output keys whose expressions must not resolve from absent data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Schema the output is validated against, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Top-level keys of the full definition form
const FULL_FORM_FIELDS: [&str; 6] = ["rules", "passThrough", "unset", "cast", "required", "schema"];

impl MappingDefinition {
    /// Build a definition holding only rules.
    pub fn from_rules(rules: Value) -> Result<Self> {
        match rules {
            Value::Object(rules) => Ok(Self {
                rules,
                ..Self::default()
            }),
            other => Err(MappingError::InvalidDefinition(format!(
                "rules must be a JSON object, got {}",
                kind(&other)
            ))),
        }
    }

    /// Accept either the full definition form or a bare rules object.
    ///
    /// `rules` is reserved: an object carrying it is the full form, and must
    /// hold a rules object next to full-form fields only. An output named
    /// `rules` therefore needs the full form.
    pub fn from_value(value: Value) -> Result<Self> {
        let Some(rules) = value.get("rules") else {
            return Self::from_rules(value);
        };

        let stray: Vec<&str> = value
            .as_object()
            .into_iter()
            .flat_map(|fields| fields.keys())
            .map(String::as_str)
            .filter(|key| !FULL_FORM_FIELDS.contains(key))
            .collect();
        if !rules.is_object() || !stray.is_empty() {
            return Err(MappingError::InvalidDefinition(format!(
                "`rules` is reserved for the full form and must be an object beside {}; \
                 found {} `rules`{}",
                FULL_FORM_FIELDS[1..].join(", "),
                kind(rules),
                if stray.is_empty() {
                    String::new()
                } else {
                    format!(" with {}", stray.join(", "))
                }
            )));
        }

        serde_json::from_value(value).map_err(|e| MappingError::InvalidDefinition(e.to_string()))
    }

    /// Add or replace a rule, keeping its position if it already exists.
    pub fn with_rule(mut self, key: impl Into<String>, expression: impl Into<Value>) -> Self {
        self.rules.insert(key.into(), expression.into());
        self
    }

    pub fn with_cast(mut self, key: impl Into<String>, target: CastType) -> Self {
        self.cast.insert(key.into(), target);
        self
    }
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_value_bare_rules() {
        let def = MappingDefinition::from_value(json!({"a": "{{x}}", "b": "{{y}}"})).unwrap();
        let keys: Vec<&String> = def.rules.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(!def.pass_through);
    }

    #[test]
    fn test_from_value_full_form() {
        let def = MappingDefinition::from_value(json!({
            "rules": {"n": "{{count}}"},
            "passThrough": true,
            "cast": {"n": "int"},
            "required": ["n"]
        }))
        .unwrap();
        assert!(def.pass_through);
        assert_eq!(def.cast.get("n"), Some(&CastType::Int));
        assert_eq!(def.required, vec!["n".to_string()]);
    }

    #[test]
    fn test_full_form_rejects_unknown_keys() {
        let err = MappingDefinition::from_value(json!({"rules": {}, "bogus": 1})).unwrap_err();
        assert!(matches!(err, MappingError::InvalidDefinition(_)));
    }

    #[test]
    fn test_rules_beside_outputs_is_ambiguous() {
        let err = MappingDefinition::from_value(json!({
            "rules": {"a": "{{x}}"},
            "name": "{{name}}"
        }))
        .unwrap_err();
        assert!(matches!(err, MappingError::InvalidDefinition(_)));
        assert!(err.to_string().contains("with name"));
    }

    #[test]
    fn test_non_object_rules_is_rejected() {
        let err = MappingDefinition::from_value(json!({"rules": "{{x}}"})).unwrap_err();
        assert!(err.to_string().contains("found string `rules`"));
    }

    #[test]
    fn test_output_named_rules_uses_full_form() {
        let def = MappingDefinition::from_value(json!({
            "rules": {"rules": {"a": "{{x}}"}, "name": "{{name}}"}
        }))
        .unwrap();
        let keys: Vec<&String> = def.rules.keys().collect();
        assert_eq!(keys, vec!["rules", "name"]);
    }

    #[test]
    fn test_from_rules_rejects_non_object() {
        let err = MappingDefinition::from_rules(json!(["a"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid mapping definition: rules must be a JSON object, got array"
        );
    }

    #[test]
    fn test_serialization_omits_defaults() {
        let def = MappingDefinition::default().with_rule("a", "{{b}}");
        assert_eq!(
            serde_json::to_value(&def).unwrap(),
            json!({"rules": {"a": "{{b}}"}})
        );
    }
}
