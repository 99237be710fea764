//! The HMIS record model.
//!
//! A [`Record`] holds one optional value per schema field. The field set is
//! closed: unknown names are rejected with [`HazfillError::Schema`]. Values
//! are stored trimmed, and blank values are stored as absent.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{HazfillError, Result};
use crate::schema::{FIELD_COUNT, FIELDS, field_index};

/// Fallback identifier when a record names no chemical at all.
const UNNAMED_CHEMICAL: &str = "chemical";

/// One row of the HMIS chemical gas table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Option<String>>")]
pub struct Record {
    values: Vec<Option<String>>,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            values: vec![None; FIELD_COUNT],
        }
    }
}

impl Record {
    /// An all-empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(field, value)` pairs.
    ///
    /// Fields not mentioned stay empty. Any name outside the schema fails.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut record = Self::new();
        for (field, value) in pairs {
            let value: Option<&str> = value.as_ref().map(|v| v.as_ref());
            record.set(field.as_ref(), value)?;
        }
        Ok(record)
    }

    /// Current value of `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        field_index(field).and_then(|i| self.values[i].as_deref())
    }

    /// Set or clear `field`. The value is trimmed; blank means absent.
    pub fn set(&mut self, field: &str, value: Option<&str>) -> Result<()> {
        let idx = field_index(field)
            .ok_or_else(|| HazfillError::schema(format!("unknown field `{field}`")))?;
        self.values[idx] = normalize(value);
        Ok(())
    }

    /// True iff `field` has no value. Unknown fields are reported empty.
    pub fn is_empty(&self, field: &str) -> bool {
        self.get(field).is_none()
    }

    /// Names of empty fields, in declaration order.
    pub fn empty_field_names(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| name)
            .collect()
    }

    /// Names of filled fields, in declaration order.
    pub fn filled_field_names(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|(_, v)| v.is_some())
            .map(|(name, _)| name)
            .collect()
    }

    /// The name used to query for this record.
    pub fn identifying_name(&self) -> &str {
        self.get("chemical_name")
            .or_else(|| self.get("sub_system_filter_formula"))
            .unwrap_or(UNNAMED_CHEMICAL)
    }

    /// Iterate `(field, value)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> + '_ {
        FIELDS
            .iter()
            .zip(&self.values)
            .map(|(f, v)| (f.name, v.as_deref()))
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl TryFrom<BTreeMap<String, Option<String>>> for Record {
    type Error = HazfillError;

    fn try_from(map: BTreeMap<String, Option<String>>) -> Result<Self> {
        Self::from_pairs(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FIELD_COUNT))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}
