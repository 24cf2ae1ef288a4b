//! Output type coercions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MappingError, Result};
use crate::template::stringify;

/// Target type for a `cast` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastType {
    String,
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "number")]
    Float,
    #[serde(alias = "boolean")]
    Bool,
    Json,
}

impl std::fmt::Display for CastType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

impl CastType {
    /// Coerce `value`, naming `key` in the error when it cannot be converted.
    ///
    /// Null stays null for every target except `string`, which yields `""`.
    pub fn apply(self, key: &str, value: Value) -> Result<Value> {
        let fail = |message: String| MappingError::Cast {
            key: key.to_string(),
            target: self,
            message,
        };

        match (self, value) {
            (Self::String, value) => Ok(Value::String(stringify(&value))),
            (_, Value::Null) => Ok(Value::Null),

            (Self::Int, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Ok(i.into())
                } else if let Some(f) = n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                {
                    Ok((f as i64).into())
                } else {
                    Err(fail(format!("{n} is not an integer")))
                }
            }
            (Self::Int, Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(Value::Null);
                }
                trimmed
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| fail(format!("'{s}' is not an integer")))
            }
            (Self::Int, Value::Bool(b)) => Ok(Value::from(i64::from(b))),

            (Self::Float, Value::Number(n)) => n
                .as_f64()
                .map(Value::from)
                .ok_or_else(|| fail(format!("{n} is not a float"))),
            (Self::Float, Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(Value::Null);
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(Value::from)
                    .ok_or_else(|| fail(format!("'{s}' is not a float")))
            }
            (Self::Float, Value::Bool(b)) => Ok(Value::from(if b { 1.0 } else { 0.0 })),

            (Self::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (Self::Bool, Value::Number(n)) => Ok(Value::Bool(n.as_f64() != Some(0.0))),
            (Self::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" | "" => Ok(Value::Bool(false)),
                _ => Err(fail(format!("'{s}' is not a boolean"))),
            },

            (Self::Json, Value::String(s)) => {
                if s.trim().is_empty() {
                    return Ok(Value::Null);
                }
                serde_json::from_str(&s).map_err(|e| fail(e.to_string()))
            }
            (Self::Json, other) => Ok(other),

            (_, other) => Err(fail(format!("unsupported value {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(CastType::Int, json!("42"), json!(42))]
    #[case(CastType::Int, json!(" 7 "), json!(7))]
    #[case(CastType::Int, json!(3.0), json!(3))]
    #[case(CastType::Int, json!(true), json!(1))]
    #[case(CastType::Int, json!(""), Value::Null)]
    #[case(CastType::Float, json!("2.5"), json!(2.5))]
    #[case(CastType::Float, json!(2), json!(2.0))]
    #[case(CastType::Bool, json!("yes"), json!(true))]
    #[case(CastType::Bool, json!("0"), json!(false))]
    #[case(CastType::Bool, json!(0), json!(false))]
    #[case(CastType::String, json!(12), json!("12"))]
    #[case(CastType::String, Value::Null, json!(""))]
    #[case(CastType::Json, json!("{\"a\":[1]}"), json!({"a": [1]}))]
    #[case(CastType::Json, json!([1]), json!([1]))]
    #[case(CastType::Int, Value::Null, Value::Null)]
    fn test_cast_success(#[case] target: CastType, #[case] input: Value, #[case] expected: Value) {
        assert_eq!(target.apply("field", input).unwrap(), expected);
    }

    #[rstest]
    #[case(CastType::Int, json!("abc"))]
    #[case(CastType::Int, json!(1.5))]
    #[case(CastType::Float, json!("NaN"))]
    #[case(CastType::Bool, json!("maybe"))]
    #[case(CastType::Json, json!("{broken"))]
    #[case(CastType::Int, json!({"a": 1}))]
    fn test_cast_failure(#[case] target: CastType, #[case] input: Value) {
        let err = target.apply("field", input).unwrap_err();
        assert!(matches!(err, MappingError::Cast { ref key, .. } if key == "field"));
    }

    #[test]
    fn test_cast_type_serde_aliases() {
        let parsed: CastType = serde_json::from_value(json!("integer")).unwrap();
        assert_eq!(parsed, CastType::Int);
        assert_eq!(serde_json::to_value(CastType::Bool).unwrap(), json!("bool"));
    }
}
