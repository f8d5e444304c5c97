//! Group- and version-aware JSON serialization for API responses.
//!
//! A response view declares its fields as [`FieldDef`]s: the serialization
//! groups a field belongs to and, optionally, the schema versions it exists
//! in. An [`ObjectWriter`] driven by a [`SerializationContext`] emits only the
//! fields the context selects:
//!
//! - no groups in the context selects every group;
//! - no version in the context ignores `since`/`until`;
//! - `since` is inclusive, `until` is inclusive;
//! - `null` values are omitted unless the context asks for them.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

/// Response schema version, `major.minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid API version '{0}', expected MAJOR or MAJOR.MINOR")]
pub struct InvalidVersion(pub String);

impl FromStr for ApiVersion {
    type Err = InvalidVersion;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidVersion(value.to_string());
        let trimmed = value.trim();
        let (major, minor) = match trimmed.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (trimmed, "0"),
        };

        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

/// A serializable field: name, groups, and version window.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub groups: &'static [&'static str],
    pub since: Option<ApiVersion>,
    pub until: Option<ApiVersion>,
}

impl FieldDef {
    pub const fn new(name: &'static str, groups: &'static [&'static str]) -> Self {
        Self {
            name,
            groups,
            since: None,
            until: None,
        }
    }

    /// First version that carries this field.
    pub const fn since(mut self, version: ApiVersion) -> Self {
        self.since = Some(version);
        self
    }

    /// Last version that carries this field.
    pub const fn until(mut self, version: ApiVersion) -> Self {
        self.until = Some(version);
        self
    }
}

/// Which groups and which schema version a serialization targets.
#[derive(Debug, Clone, Default)]
pub struct SerializationContext {
    groups: Vec<String>,
    version: Option<ApiVersion>,
}

impl SerializationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|g| (*g).to_string()).collect();
        self
    }

    pub fn with_version(mut self, version: ApiVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Whether `field` is part of the output for this context.
    pub fn includes(&self, field: &FieldDef) -> bool {
        let in_group = self.groups.is_empty()
            || field
                .groups
                .iter()
                .any(|group| self.groups.iter().any(|g| g == group));
        if !in_group {
            return false;
        }

        match self.version {
            None => true,
            Some(version) => {
                field.since.map_or(true, |since| version >= since)
                    && field.until.map_or(true, |until| version <= until)
            }
        }
    }
}

/// Builds a JSON object field by field, honoring a context.
pub struct ObjectWriter<'a> {
    ctx: &'a SerializationContext,
    map: Map<String, Value>,
}

impl<'a> ObjectWriter<'a> {
    pub fn new(ctx: &'a SerializationContext) -> Self {
        Self {
            ctx,
            map: Map::new(),
        }
    }

    pub fn field(self, def: &FieldDef, value: impl Into<Value>) -> Self {
        self.field_with(def, || value.into())
    }

    /// Like [`ObjectWriter::field`], computing the value only when included.
    /// `null` values are left out.
    pub fn field_with(mut self, def: &FieldDef, value: impl FnOnce() -> Value) -> Self {
        if self.ctx.includes(def) {
            let value = value();
            if !value.is_null() {
                self.map.insert(def.name.to_string(), value);
            }
        }
        self
    }

    pub fn finish(self) -> Value {
        Value::Object(self.map)
    }
}

/// Converts a view into JSON according to a context.
pub trait Normalize {
    fn normalize(&self, ctx: &SerializationContext) -> Value;
}

/// Normalizes every item into a JSON array.
pub fn normalize_all<T: Normalize>(items: &[T], ctx: &SerializationContext) -> Value {
    Value::Array(items.iter().map(|item| item.normalize(ctx)).collect())
}

/// Normalizes and renders to a JSON string.
pub fn to_json_string<T: Normalize + ?Sized>(
    value: &T,
    ctx: &SerializationContext,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&value.normalize(ctx))
}

impl<T: Normalize> Normalize for [T] {
    fn normalize(&self, ctx: &SerializationContext) -> Value {
        normalize_all(self, ctx)
    }
}

impl<T: Normalize> Normalize for Vec<T> {
    fn normalize(&self, ctx: &SerializationContext) -> Value {
        normalize_all(self, ctx)
    }
}
