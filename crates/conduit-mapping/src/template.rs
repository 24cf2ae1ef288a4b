//! `{{path | filter}}` templates
//!
//! Tokens are delimited by `{{` and `}}`; whitespace inside the braces is
//! ignored. A token is a dot-path optionally followed by filters applied left
//! to right:
//!
//! | filter           | effect                                               |
//! |------------------|------------------------------------------------------|
//! | `upper`, `lower` | change case of the stringified value                 |
//! | `trim`           | strip surrounding whitespace                         |
//! | `json`           | render the value as compact JSON text                |
//! | `default("x")`   | use `x` when the value is absent, null or empty      |

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::path::JsonPath;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("token pattern is valid"));

/// A filter applied to a resolved token value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Upper,
    Lower,
    Trim,
    Json,
    Default(String),
}

impl Filter {
    fn parse(source: &str) -> std::result::Result<Self, String> {
        let (name, argument) = match source.find('(') {
            Some(open) => {
                if !source.ends_with(')') || source.len() < open + 2 {
                    return Err(format!("malformed filter '{source}'"));
                }
                let inner = source[open + 1..source.len() - 1].trim();
                (source[..open].trim(), Some(parse_string_literal(inner)?))
            }
            None => (source, None),
        };

        match (name, argument) {
            ("", _) => Err("empty filter".to_string()),
            ("upper", None) => Ok(Self::Upper),
            ("lower", None) => Ok(Self::Lower),
            ("trim", None) => Ok(Self::Trim),
            ("json", None) => Ok(Self::Json),
            ("default", Some(fallback)) => Ok(Self::Default(fallback)),
            ("default", None) => Err("filter 'default' requires an argument".to_string()),
            ("upper" | "lower" | "trim" | "json", Some(_)) => {
                Err(format!("filter '{name}' takes no argument"))
            }
            (other, _) => Err(format!("unknown filter '{other}'")),
        }
    }

    fn apply(&self, value: Option<Value>) -> Option<Value> {
        match self {
            Self::Default(fallback) => match value {
                None | Some(Value::Null) => Some(Value::String(fallback.clone())),
                Some(Value::String(s)) if s.is_empty() => Some(Value::String(fallback.clone())),
                other => other,
            },
            Self::Json => value.map(|v| Value::String(v.to_string())),
            Self::Upper => value.map(|v| Value::String(stringify(&v).to_uppercase())),
            Self::Lower => value.map(|v| Value::String(stringify(&v).to_lowercase())),
            Self::Trim => value.map(|v| Value::String(stringify(&v).trim().to_string())),
        }
    }
}

fn parse_string_literal(source: &str) -> std::result::Result<String, String> {
    let mut chars = source.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) if open == close && matches!(open, '"' | '\'') => {
            Ok(source[1..source.len() - 1].to_string())
        }
        _ => Err(format!(
            "filter argument must be a quoted string, got '{source}'"
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    path: JsonPath,
    filters: Vec<Filter>,
}

impl Token {
    fn parse(inner: &str) -> std::result::Result<Self, String> {
        let parts = split_pipes(inner)?;
        let (path, filters) = parts
            .split_first()
            .ok_or_else(|| "empty token".to_string())?;

        Ok(Self {
            path: JsonPath::parse(path)?,
            filters: filters
                .iter()
                .map(|f| Filter::parse(f.trim()))
                .collect::<std::result::Result<_, _>>()?,
        })
    }

    fn evaluate(&self, input: &Value) -> Option<Value> {
        self.filters
            .iter()
            .fold(self.path.resolve(input).cloned(), |value, filter| {
                filter.apply(value)
            })
    }
}

/// Split on `|` outside quoted filter arguments.
fn split_pipes(inner: &str) -> std::result::Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;

    for (idx, ch) in inner.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '|') => {
                parts.push(&inner[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err("unterminated string literal".to_string());
    }
    parts.push(&inner[start..]);
    Ok(parts)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(Token),
}

/// The result of rendering a template
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub value: Value,
    /// At least one token resolved to nothing
    pub missing: bool,
}

/// A parsed string expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template, reporting malformed tokens as a message.
    pub fn parse(source: &str) -> std::result::Result<Self, String> {
        let mut segments = Vec::new();
        let mut last = 0;

        for captures in TOKEN.captures_iter(source) {
            let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            push_literal(&mut segments, &source[last..whole.start()])?;
            segments.push(Segment::Token(Token::parse(inner.as_str())?));
            last = whole.end();
        }
        push_literal(&mut segments, &source[last..])?;

        Ok(Self { segments })
    }

    /// True when the template is exactly one token with nothing around it
    pub fn is_single_token(&self) -> bool {
        matches!(self.segments.as_slice(), [Segment::Token(_)])
    }

    /// Paths referenced by this template, in order of appearance
    pub fn paths(&self) -> impl Iterator<Item = &JsonPath> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Token(token) => Some(&token.path),
            Segment::Literal(_) => None,
        })
    }

    /// Render against an input object.
    pub fn render(&self, input: &Value) -> Rendered {
        if let [Segment::Token(token)] = self.segments.as_slice() {
            return match token.evaluate(input) {
                Some(value) => Rendered {
                    value,
                    missing: false,
                },
                None => Rendered {
                    value: Value::String(String::new()),
                    missing: true,
                },
            };
        }

        let mut out = String::new();
        let mut missing = false;
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(token) => match token.evaluate(input) {
                    Some(value) => out.push_str(&stringify(&value)),
                    None => missing = true,
                },
            }
        }

        Rendered {
            value: Value::String(out),
            missing,
        }
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) -> std::result::Result<(), String> {
    if text.contains("{{") {
        return Err("unterminated '{{' in template".to_string());
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

/// Text form of a value inside an interpolated string
///
/// Strings are inserted raw, null as nothing, everything else as compact JSON.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
