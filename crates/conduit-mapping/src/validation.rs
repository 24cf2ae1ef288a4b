//! Output validation hook
//!
//! Mapped objects can be checked against a named schema before they are
//! handed to a target. The default validator accepts everything; deployments
//! that carry real schemas plug in their own implementation.

use serde::Serialize;
use serde_json::Value;

/// Validates a mapped object against a schema reference
pub trait SchemaValidator: Send + Sync {
    /// Return one message per violation; empty means valid.
    fn validate(&self, schema: &str, object: &Value) -> Vec<String>;
}

/// Validator that reports every object as valid
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllValidator;

impl SchemaValidator for AcceptAllValidator {
    fn validate(&self, _schema: &str, _object: &Value) -> Vec<String> {
        Vec::new()
    }
}

/// Outcome of validating a mapped object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub validation_errors: Vec<String>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            validation_errors: Vec::new(),
        }
    }

    /// Validate `object` when a schema is given; no schema is always valid.
    pub fn check(validator: &dyn SchemaValidator, schema: Option<&str>, object: &Value) -> Self {
        let Some(schema) = schema else {
            return Self::valid();
        };
        let errors = validator.validate(schema, object);
        Self {
            is_valid: errors.is_empty(),
            validation_errors: errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct RequiresName;

    impl SchemaValidator for RequiresName {
        fn validate(&self, _schema: &str, object: &Value) -> Vec<String> {
            if object.get("name").is_some() {
                Vec::new()
            } else {
                vec!["name is required".to_string()]
            }
        }
    }

    #[test]
    fn test_no_schema_is_valid() {
        let report = ValidationReport::check(&RequiresName, None, &json!({}));
        assert_eq!(report, ValidationReport::valid());
    }

    #[test]
    fn test_custom_validator_reports_errors() {
        let report = ValidationReport::check(&RequiresName, Some("person"), &json!({}));
        assert!(!report.is_valid);
        assert_eq!(report.validation_errors, vec!["name is required"]);
    }

    #[test]
    fn test_accept_all() {
        let report = ValidationReport::check(&AcceptAllValidator, Some("any"), &json!(1));
        assert!(report.is_valid);
    }
}
