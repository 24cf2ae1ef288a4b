//! Declarative mapping engine for Conduit
//!
//! A mapping is an ordered set of `outputKey → expression` rules. String
//! expressions are templates whose `{{path}}` tokens are resolved against the
//! input object by dot-path traversal:
//!
//! - a template that is exactly one token keeps the resolved value's type
//! - anything else is string-interpolated
//! - missing paths resolve to nothing (an empty string when interpolated)
//!
//! Objects and arrays in rule position are mapped recursively, other scalars
//! are copied as literals.
//!
//! # Example
//!
//! ```
//! use conduit_mapping::{MappingDefinition, map};
//! use serde_json::json;
//!
//! let mapping = MappingDefinition::from_rules(json!({
//!     "fullName": "{{name}}",
//!     "userAge": "{{age}}",
//!     "label": "Age: {{age}}"
//! })).unwrap();
//!
//! let output = map(&mapping, &json!({"name": "John Doe", "age": 30})).unwrap();
//! assert_eq!(output, json!({"fullName": "John Doe", "userAge": 30, "label": "Age: 30"}));
//! ```
//!
//! Applying a mapping never mutates its input and always produces the same
//! output for the same input, which is what keeps synchronization runs
//! idempotent.

pub mod cast;
pub mod definition;
pub mod engine;
pub mod error;
pub mod path;
pub mod template;
pub mod validation;

pub use cast::CastType;
pub use definition::MappingDefinition;
pub use engine::{CompiledMapping, map};
pub use error::{MappingError, Result};
pub use path::{JsonPath, get_json_path};
pub use template::{Filter, Template};
pub use validation::{AcceptAllValidator, SchemaValidator, ValidationReport};
