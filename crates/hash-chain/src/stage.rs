//! Stage records: one step of the supply chain as shown to consumers

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{ChainError, Result};

/// Ordered key/value fields of a stage.
///
/// Serialized as a JSON object whose keys keep insertion order. The order is
/// part of the hashed encoding, so it is never sorted or deduplicated
/// silently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageFields(Vec<(String, String)>);

impl StageFields {
    pub fn new<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut out = StageFields::default();
        for (key, value) in fields {
            out.push(key, value)?;
        }
        Ok(out)
    }

    fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if self.get(&key).is_some() {
            return Err(ChainError::DuplicateField(key));
        }
        self.0.push((key, value.into()));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the value of an existing field, keeping its position
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => {
                entry.1 = value.into();
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for StageFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct StageFieldsVisitor;

impl<'de> Visitor<'de> for StageFieldsVisitor {
    type Value = StageFields;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of string fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<StageFields, A::Error> {
        let mut fields = StageFields::default();
        while let Some((key, value)) = access.next_entry::<String, String>()? {
            fields.push(key, value).map_err(serde::de::Error::custom)?;
        }
        Ok(fields)
    }
}

impl<'de> Deserialize<'de> for StageFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(StageFieldsVisitor)
    }
}

/// One supply-chain stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Position in the chain
    pub index: u64,

    /// ISO 8601 / RFC 3339 instant, kept verbatim because it is hashed as text
    pub timestamp: String,

    pub icon: String,

    pub title: String,

    pub data: StageFields,
}

impl StageRecord {
    pub fn new(
        index: u64,
        timestamp: impl Into<String>,
        icon: impl Into<String>,
        title: impl Into<String>,
        data: StageFields,
    ) -> Result<Self> {
        let timestamp = timestamp.into();
        if chrono::DateTime::parse_from_rfc3339(&timestamp).is_err() {
            return Err(ChainError::InvalidTimestamp {
                index,
                value: timestamp,
            });
        }

        Ok(Self {
            index,
            timestamp,
            icon: icon.into(),
            title: title.into(),
            data,
        })
    }
}
