//! Query-string assembly for API calls.
//!
//! Every vendor method is a GET (or multipart POST) whose arguments travel in
//! the query string. [`Query`] keeps them as ordered key/value pairs:
//!
//! - optional arguments that are `None` are dropped, never sent empty;
//! - list arguments become repeated keys (`msgId=1&msgId=2`);
//! - structured arguments are JSON-encoded into a single value.

use serde::Serialize;

use crate::error::ApiResult;

/// Ordered query parameters for one API call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required parameter.
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds a parameter only when a value is present.
    pub fn opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Adds one `key=value` pair per item.
    pub fn list<I>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        for value in values {
            self.params.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Adds a boolean as the literal `true` / `false`.
    pub fn flag(self, key: &str, value: bool) -> Self {
        self.param(key, if value { "true" } else { "false" })
    }

    /// Adds a JSON-encoded parameter.
    pub fn json<T: Serialize + ?Sized>(self, key: &str, value: &T) -> ApiResult<Self> {
        let encoded = serde_json::to_string(value)?;
        Ok(self.param(key, encoded))
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value recorded for `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
