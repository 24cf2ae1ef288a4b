//! Dot-path lookups into JSON values

use serde_json::Value;

/// A parsed dot-separated path such as `address.city` or `items.0.sku`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    raw: String,
    segments: Vec<String>,
}

impl JsonPath {
    /// Parse a path, rejecting empty segments and template metacharacters.
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("empty path".to_string());
        }

        let mut segments = Vec::new();
        for segment in raw.split('.') {
            if segment.is_empty() {
                return Err(format!("empty segment in path '{raw}'"));
            }
            if let Some(bad) = segment
                .chars()
                .find(|c| c.is_whitespace() || matches!(c, '{' | '}' | '|' | '(' | ')' | '"' | '\''))
            {
                return Err(format!("invalid character '{bad}' in path '{raw}'"));
            }
            segments.push(segment.to_string());
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The path as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Resolve this path against a value.
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        resolve_segments(value, self.segments.iter().map(String::as_str))
    }
}

impl std::fmt::Display for JsonPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Get a value from a JSON object using a dot-separated path
///
/// Numeric segments index into arrays.
///
/// # Returns
///
/// The value at the path, or None if not found.
pub fn get_json_path<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
    resolve_segments(json, path.split('.'))
}

fn resolve_segments<'a, 'p>(
    json: &'a Value,
    segments: impl Iterator<Item = &'p str>,
) -> Option<&'a Value> {
    let mut current = json;

    for part in segments {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                current = arr.get(index)?;
            }
            _ => return None,
        }
    }

    Some(current)
}
