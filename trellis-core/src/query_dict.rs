//! Ordered, multi-valued parameter store.
//!
//! Query strings and form bodies may repeat a key (`?tag=a&tag=b`), so each
//! name maps to the list of values in the order they were submitted.

use crate::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    entries: Vec<(String, Vec<String>)>,
}

impl QueryDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` string
    pub fn parse(encoded: &str) -> Result<Self, Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(encoded)
            .map_err(|e| Error::BadRequest(format!("Failed to parse parameters: {}", e)))?;
        Ok(pairs.into_iter().collect())
    }

    /// Parse url-encoded bytes, as found in a form body
    pub fn parse_bytes(encoded: &[u8]) -> Result<Self, Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(encoded)
            .map_err(|e| Error::BadRequest(format!("Failed to parse form data: {}", e)))?;
        Ok(pairs.into_iter().collect())
    }

    /// Append a value, keeping any values already stored under `key`
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into()),
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    /// Replace all values stored under `key`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.remove(&key);
        self.entries.push((key, vec![value.into()]));
    }

    /// Last value submitted for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.getlist(key)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// All values submitted for `key`, in submission order
    pub fn getlist(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Remove `key` and return its values
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Merge `other` into self; keys in `other` replace existing ones
    pub fn merge(&mut self, other: &QueryDict) {
        for (key, values) in &other.entries {
            self.remove(key);
            self.entries.push((key.clone(), values.clone()));
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode back into a url-encoded string
    pub fn urlencode(&self) -> String {
        let pairs: Vec<(&str, &str)> = self
            .entries
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
            .collect();
        serde_urlencoded::to_string(pairs).unwrap_or_default()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = QueryDict::new();
        for (k, v) in iter {
            dict.append(k, v);
        }
        dict
    }
}
