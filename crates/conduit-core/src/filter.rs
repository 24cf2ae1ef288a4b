//! Generic record filtering
//!
//! Filters are built from query parameters: plain keys are equality
//! predicates on the serialized record, the values `IS NULL` and
//! `IS NOT NULL` test for absence, `_search` is a case-insensitive substring
//! match over all top-level string fields, and `_limit`/`_offset` page the
//! result. Other `_`-prefixed parameters are ignored.

use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

/// A condition on one record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq(String),
    IsNull,
    IsNotNull,
}

impl Predicate {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "IS NULL" => Self::IsNull,
            "IS NOT NULL" => Self::IsNotNull,
            _ => Self::Eq(value.to_string()),
        }
    }

    fn matches(&self, field: Option<&Value>) -> bool {
        let field = field.filter(|value| !value.is_null());
        match self {
            Self::IsNull => field.is_none(),
            Self::IsNotNull => field.is_some(),
            Self::Eq(expected) => match field {
                Some(Value::String(actual)) => actual == expected,
                Some(other) => other.to_string() == *expected,
                None => false,
            },
        }
    }
}

/// Conjunction of field predicates plus optional search and paging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<(String, Predicate)>,
    search: Option<String>,
    limit: Option<usize>,
    offset: usize,
}

impl Filter {
    /// A filter that matches everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates.push((field.into(), Predicate::Eq(value.into())));
        self
    }

    pub fn is_null(mut self, field: impl Into<String>) -> Self {
        self.predicates.push((field.into(), Predicate::IsNull));
        self
    }

    pub fn is_not_null(mut self, field: impl Into<String>) -> Self {
        self.predicates.push((field.into(), Predicate::IsNotNull));
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into().to_lowercase());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Build a filter from request query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `_limit` or `_offset` is not a
    /// non-negative integer.
    pub fn from_params<I, K, V>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::default();
        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "_search" if !value.trim().is_empty() => filter = filter.search(value.trim()),
                "_limit" => filter.limit = Some(parse_count(key, value)?),
                "_offset" => filter.offset = parse_count(key, value)?,
                _ if key.starts_with('_') => {}
                _ => filter.predicates.push((key.to_string(), Predicate::parse(value))),
            }
        }
        Ok(filter)
    }

    /// Test one serialized record.
    pub fn matches(&self, record: &Value) -> bool {
        let predicates_hold = self
            .predicates
            .iter()
            .all(|(field, predicate)| predicate.matches(record.get(field)));

        predicates_hold
            && self.search.as_deref().is_none_or(|term| {
                record.as_object().is_some_and(|fields| {
                    fields.values().any(|value| {
                        value
                            .as_str()
                            .is_some_and(|text| text.to_lowercase().contains(term))
                    })
                })
            })
    }

    /// Keep matching records, then apply offset and limit.
    pub fn apply<T: Serialize>(&self, records: impl IntoIterator<Item = T>) -> Result<Vec<T>> {
        let mut matched = Vec::new();
        for record in records {
            if self.matches(&serde_json::to_value(&record)?) {
                matched.push(record);
            }
        }

        Ok(matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect())
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{key} must be a non-negative integer, got '{value}'")))
}
