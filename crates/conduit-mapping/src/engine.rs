//! Compiling and applying mappings

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::cast::CastType;
use crate::definition::{MappingDefinition, kind};
use crate::error::{MappingError, Result};
use crate::template::{Rendered, Template};

/// A compiled rule expression
#[derive(Debug, Clone, PartialEq)]
enum Expression {
    Template(Template),
    Object(Vec<(String, Expression)>),
    Array(Vec<Expression>),
    Literal(Value),
}

impl Expression {
    fn compile(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(source) => Template::parse(source)
                .map(Self::Template)
                .map_err(|message| MappingError::Parse {
                    key: key.to_string(),
                    message,
                }),
            Value::Object(map) => map
                .iter()
                .map(|(child, value)| {
                    Ok((child.clone(), Self::compile(&format!("{key}.{child}"), value)?))
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Object),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(idx, value)| Self::compile(&format!("{key}[{idx}]"), value))
                .collect::<Result<Vec<_>>>()
                .map(Self::Array),
            literal => Ok(Self::Literal(literal.clone())),
        }
    }

    fn evaluate(&self, input: &Value) -> Rendered {
        match self {
            Self::Template(template) => template.render(input),
            Self::Literal(value) => Rendered {
                value: value.clone(),
                missing: false,
            },
            Self::Object(fields) => {
                let mut missing = false;
                let mut out = Map::new();
                for (key, expression) in fields {
                    let rendered = expression.evaluate(input);
                    missing |= rendered.missing;
                    out.insert(key.clone(), rendered.value);
                }
                Rendered {
                    value: Value::Object(out),
                    missing,
                }
            }
            Self::Array(items) => {
                let mut missing = false;
                let values = items
                    .iter()
                    .map(|expression| {
                        let rendered = expression.evaluate(input);
                        missing |= rendered.missing;
                        rendered.value
                    })
                    .collect();
                Rendered {
                    value: Value::Array(values),
                    missing,
                }
            }
        }
    }
}

/// A mapping whose expressions have been parsed once for repeated use
///
/// Synchronization runs compile the mapping a single time and apply it to
/// every source object.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMapping {
    rules: Vec<(String, Expression)>,
    pass_through: bool,
    unset: Vec<String>,
    cast: Vec<(String, CastType)>,
    required: HashSet<String>,
    schema: Option<String>,
}

impl CompiledMapping {
    /// Parse every expression in `definition`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Parse`] for malformed templates and
    /// [`MappingError::InvalidDefinition`] when a required key has no rule.
    pub fn compile(definition: &MappingDefinition) -> Result<Self> {
        let rules = definition
            .rules
            .iter()
            .map(|(key, value)| Ok((key.clone(), Expression::compile(key, value)?)))
            .collect::<Result<Vec<_>>>()?;

        for key in &definition.required {
            if !definition.rules.contains_key(key) {
                return Err(MappingError::InvalidDefinition(format!(
                    "required key '{key}' has no rule"
                )));
            }
        }

        tracing::trace!(rules = rules.len(), "Compiled mapping");

        Ok(Self {
            rules,
            pass_through: definition.pass_through,
            unset: definition.unset.clone(),
            cast: definition
                .cast
                .iter()
                .map(|(key, target)| (key.clone(), *target))
                .collect(),
            required: definition.required.iter().cloned().collect(),
            schema: definition.schema.clone(),
        })
    }

    /// Schema reference the output should be validated against
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Apply to one input object, producing a new object.
    ///
    /// Rules run in definition order, then casts, then `unset` removals.
    pub fn apply(&self, input: &Value) -> Result<Value> {
        let Value::Object(source) = input else {
            return Err(MappingError::InvalidInput { found: kind(input) });
        };

        let mut output = if self.pass_through {
            source.clone()
        } else {
            Map::new()
        };

        for (key, expression) in &self.rules {
            let rendered = expression.evaluate(input);
            if rendered.missing && self.required.contains(key) {
                return Err(MappingError::MissingRequired { key: key.clone() });
            }
            output.insert(key.clone(), rendered.value);
        }

        for (key, target) in &self.cast {
            if let Some(slot) = output.get_mut(key) {
                *slot = target.apply(key, slot.take())?;
            }
        }

        for key in &self.unset {
            output.shift_remove(key);
        }

        Ok(Value::Object(output))
    }
}

/// Compile and apply `definition` to `input` in one step.
pub fn map(definition: &MappingDefinition, input: &Value) -> Result<Value> {
    CompiledMapping::compile(definition)?.apply(input)
}
