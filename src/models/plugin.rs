//! Plugin identifier and detail record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::range::is_fetchable;

/// Field holding the plugin identifier in every record.
pub const KEY_FIELD: &str = "script_id";

/// Numeric identifier of a single NASL plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(u32);

impl PluginId {
    /// Wrap a raw identifier. Zero is not a valid plugin.
    pub fn new(raw: u32) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// The raw numeric value.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Whether the detail API serves this plugin.
    pub fn is_fetchable(self) -> bool {
        is_fetchable(self.0)
    }

    /// Read an identifier from a JSON number or numeric string.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).and_then(Self::new),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl FromStr for PluginId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| AppError::shape(KEY_FIELD, format!("'{s}' is not a plugin id")))
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full metadata for one plugin, as returned by the detail API.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginRecord {
    id: PluginId,
    fields: Map<String, Value>,
}

impl PluginRecord {
    /// Build a record from the `_source` object of a detail response.
    pub fn from_source(source: Value) -> Result<Self> {
        let Value::Object(fields) = source else {
            return Err(AppError::shape("_source", "expected a JSON object"));
        };
        Self::from_fields(fields)
    }

    /// Build a record from a field map, which must carry `script_id`.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        let id = fields
            .get(KEY_FIELD)
            .ok_or_else(|| AppError::shape("_source", format!("missing '{KEY_FIELD}'")))
            .and_then(|value| {
                PluginId::from_value(value).ok_or_else(|| {
                    AppError::shape("_source", format!("invalid '{KEY_FIELD}': {value}"))
                })
            })?;
        Ok(Self { id, fields })
    }

    pub fn id(&self) -> PluginId {
        self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}
