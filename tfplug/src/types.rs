//! Core type system for tfplug
//!
//! This module provides the core types used throughout the framework,
//! including Dynamic values, attribute paths and diagnostics.

use crate::error::{Result, TfplugError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Dynamic represents Terraform values that can be of any type
/// This is the core type for all configuration and state data
/// IMPORTANT: Always use type-safe accessors instead of matching directly
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Number value (all numbers are f64 to match Terraform)
    Number(f64),
    /// String value
    String(String),
    /// List of values (ordered, allows duplicates)
    List(Vec<Dynamic>),
    /// Map of string keys to values (objects are represented as Maps)
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    /// Known and not null
    pub fn is_known(&self) -> bool {
        !self.is_null() && !self.is_unknown()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n as i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Dynamic]> {
        match self {
            Dynamic::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Build an object value from key/value pairs
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Dynamic)>,
    {
        Dynamic::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }
}

impl From<&str> for Dynamic {
    fn from(value: &str) -> Self {
        Dynamic::String(value.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(value: String) -> Self {
        Dynamic::String(value)
    }
}

impl From<bool> for Dynamic {
    fn from(value: bool) -> Self {
        Dynamic::Bool(value)
    }
}

impl From<i64> for Dynamic {
    fn from(value: i64) -> Self {
        Dynamic::Number(value as f64)
    }
}

impl From<u32> for Dynamic {
    fn from(value: u32) -> Self {
        Dynamic::Number(f64::from(value))
    }
}

impl From<f64> for Dynamic {
    fn from(value: f64) -> Self {
        Dynamic::Number(value)
    }
}

impl<T: Into<Dynamic>> From<Option<T>> for Dynamic {
    fn from(value: Option<T>) -> Self {
        value.map_or(Dynamic::Null, Into::into)
    }
}

impl<T: Into<Dynamic>> From<Vec<T>> for Dynamic {
    fn from(values: Vec<T>) -> Self {
        Dynamic::List(values.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => serializer.serialize_f64(*n),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_str("__unknown__"),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid Dynamic value")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Dynamic, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Dynamic::deserialize(deserializer)
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Dynamic, E> {
                if value == "__unknown__" {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value.to_string()))
                }
            }

            fn visit_string<E: de::Error>(self, value: String) -> std::result::Result<Dynamic, E> {
                if value == "__unknown__" {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value))
                }
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Dynamic::List(vec))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut hashmap = HashMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    hashmap.insert(key, value);
                }
                Ok(Dynamic::Map(hashmap))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// DynamicValue wraps Dynamic and provides encoding/decoding capabilities
/// This is what gets passed between Terraform and the provider
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    /// An empty object, the usual starting point for a state
    pub fn empty_object() -> Self {
        Self {
            value: Dynamic::Map(HashMap::new()),
        }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    pub fn unknown() -> Self {
        Self {
            value: Dynamic::Unknown,
        }
    }

    /// Terraform speaks msgpack on the wire
    pub fn encode_msgpack(&self) -> Result<Vec<u8>> {
        match &self.value {
            Dynamic::Null => Ok(vec![]),
            value => rmp_serde::encode::to_vec(value)
                .map_err(|e| TfplugError::EncodingError(format!("msgpack encoding failed: {}", e))),
        }
    }

    pub fn decode_msgpack(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }

        rmp_serde::decode::from_slice::<Dynamic>(data)
            .map(Self::new)
            .map_err(|e| TfplugError::DecodingError(format!("msgpack decoding failed: {}", e)))
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.value)
            .map_err(|e| TfplugError::EncodingError(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        let value = serde_json::from_slice(data)
            .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    /// Raw access; None when any step of the path is absent or null
    pub fn get(&self, path: &AttributePath) -> Option<&Dynamic> {
        let mut current = &self.value;

        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m.get(name)?,
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    l.get(usize::try_from(*idx).ok()?)?
                }
                _ => return None,
            };
        }

        Some(current)
    }

    /// Type-safe accessors - ALWAYS use these instead of pattern matching
    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        let value = self.require(path)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(path, "string", value))
    }

    pub fn get_number(&self, path: &AttributePath) -> Result<f64> {
        let value = self.require(path)?;
        value.as_f64().ok_or_else(|| mismatch(path, "number", value))
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        let value = self.require(path)?;
        value.as_bool().ok_or_else(|| mismatch(path, "bool", value))
    }

    pub fn get_list(&self, path: &AttributePath) -> Result<Vec<Dynamic>> {
        let value = self.require(path)?;
        value
            .as_list()
            .map(<[Dynamic]>::to_vec)
            .ok_or_else(|| mismatch(path, "list", value))
    }

    pub fn get_map(&self, path: &AttributePath) -> Result<HashMap<String, Dynamic>> {
        let value = self.require(path)?;
        value
            .as_map()
            .cloned()
            .ok_or_else(|| mismatch(path, "map", value))
    }

    /// Type-safe setters - Use for building state/config objects
    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set_value(path, Dynamic::String(value))
    }

    pub fn set_number(&mut self, path: &AttributePath, value: f64) -> Result<()> {
        self.set_value(path, Dynamic::Number(value))
    }

    pub fn set_bool(&mut self, path: &AttributePath, value: bool) -> Result<()> {
        self.set_value(path, Dynamic::Bool(value))
    }

    pub fn set_list(&mut self, path: &AttributePath, value: Vec<Dynamic>) -> Result<()> {
        self.set_value(path, Dynamic::List(value))
    }

    pub fn set_map(&mut self, path: &AttributePath, value: HashMap<String, Dynamic>) -> Result<()> {
        self.set_value(path, Dynamic::Map(value))
    }

    /// Helpers for handling unknown values during planning
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn is_unknown(&self) -> bool {
        self.value.is_unknown()
    }

    /// Mark computed values as unknown during planning
    pub fn mark_unknown(&mut self, path: &AttributePath) -> Result<()> {
        self.set_value(path, Dynamic::Unknown)
    }

    /// Remove a top-level attribute, returning its previous value
    pub fn remove_attribute(&mut self, name: &str) -> Option<Dynamic> {
        match &mut self.value {
            Dynamic::Map(m) => m.remove(name),
            _ => None,
        }
    }

    /// Write `new_value` at `path`, creating intermediate objects and growing
    /// lists by one element when the index equals their length
    pub fn set_value(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            self.value = new_value;
            return Ok(());
        };

        let mut current = &mut self.value;
        for step in parents {
            current = child_mut(current, step, path)?;
        }

        let slot = child_mut(current, last, path)?;
        *slot = new_value;
        Ok(())
    }

    fn require(&self, path: &AttributePath) -> Result<&Dynamic> {
        match self.get(path) {
            Some(Dynamic::Null) | None => Err(TfplugError::AttributeNotFound(path.to_string())),
            Some(value) => Ok(value),
        }
    }
}

fn mismatch(path: &AttributePath, expected: &str, actual: &Dynamic) -> TfplugError {
    TfplugError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

fn child_mut<'a>(
    current: &'a mut Dynamic,
    step: &AttributePathStep,
    path: &AttributePath,
) -> Result<&'a mut Dynamic> {
    if matches!(current, Dynamic::Null | Dynamic::Unknown) {
        *current = match step {
            AttributePathStep::ElementKeyInt(_) => Dynamic::List(Vec::new()),
            _ => Dynamic::Map(HashMap::new()),
        };
    }

    match (current, step) {
        (Dynamic::Map(m), AttributePathStep::AttributeName(name))
        | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
            Ok(m.entry(name.clone()).or_insert(Dynamic::Null))
        }
        (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
            let idx = usize::try_from(*idx)
                .map_err(|_| TfplugError::InvalidPath(path.to_string()))?;
            if idx == l.len() {
                l.push(Dynamic::Null);
            }
            l.get_mut(idx).ok_or_else(|| {
                TfplugError::InvalidPath(format!("{}: list index {} out of bounds", path, idx))
            })
        }
        _ => Err(TfplugError::InvalidPath(path.to_string())),
    }
}

/// AttributePath represents a path to an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    /// Parse a dotted path such as `permissions.0.can_publish`;
    /// numeric segments become list indexes
    pub fn parse(dotted: &str) -> Self {
        let steps = dotted
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.parse::<i64>() {
                Ok(idx) => AttributePathStep::ElementKeyInt(idx),
                Err(_) => AttributePathStep::AttributeName(segment.to_string()),
            })
            .collect();
        Self { steps }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            match step {
                AttributePathStep::AttributeName(name) => f.write_str(name)?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[\"{}\"]", key)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "{}", idx)?,
            }
        }
        Ok(())
    }
}

/// Individual step in an AttributePath
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributePathStep {
    /// Access attribute by name in object/map
    AttributeName(String),
    /// Access element by string key (for maps)
    ElementKeyString(String),
    /// Access element by integer index (for lists)
    ElementKeyInt(i64),
}

/// RawState holds the stored state for a resource to be upgraded
#[derive(Debug, Clone)]
pub struct RawState {
    pub json: Option<Vec<u8>>,
    pub flatmap: Option<HashMap<String, String>>,
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// Ordered list of diagnostics produced by one handler invocation.
/// The host aborts only when at least one entry is an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single error diagnostic built from any displayable error
    pub fn from_error(summary: impl Into<String>, err: impl fmt::Display) -> Self {
        Diagnostic::error(summary, err.to_string()).into()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::error(summary, detail));
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::warning(summary, detail));
    }

    pub fn add_error_at(
        &mut self,
        path: AttributePath,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::error(summary, detail).with_attribute(path));
    }

    pub fn add_warning_at(
        &mut self,
        path: AttributePath,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::warning(summary, detail).with_attribute(path));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| !d.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            entries: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(entries: Vec<Diagnostic>) -> Self {
        Self { entries }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// ResourceIdentityData contains actual identity data
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceIdentityData {
    pub identity_data: DynamicValue,
}

/// Config represents configuration values
pub type Config = DynamicValue;

/// State represents resource state values
pub type State = DynamicValue;
