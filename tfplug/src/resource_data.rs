//! Mutable view over a resource's state for the duration of one handler
//!
//! Handlers read user intent, write server values back and set the primary
//! ID. Clearing the ID tombstones the resource: the host drops it from state
//! and plans a create on the next apply.

use crate::error::Result;
use crate::plan_modifier::values_equal;
use crate::resource::{
    CreateResourceRequest, DeleteResourceRequest, ReadResourceRequest, UpdateResourceRequest,
};
use crate::types::{AttributePath, Dynamic, DynamicValue, ResourceIdentityData};
use std::collections::HashMap;

const ID: &str = "id";

#[derive(Debug, Clone)]
pub struct ResourceData {
    prior: DynamicValue,
    config: DynamicValue,
    state: DynamicValue,
    identity: Vec<(String, String)>,
    tombstoned: bool,
}

impl ResourceData {
    /// Start from a plain state, as after import or in tests
    pub fn from_state(state: DynamicValue) -> Self {
        let state = object_or_empty(state);
        Self {
            prior: state.clone(),
            config: state.clone(),
            state,
            identity: Vec::new(),
            tombstoned: false,
        }
    }

    pub fn for_create(request: &CreateResourceRequest) -> Self {
        Self {
            prior: DynamicValue::null(),
            config: request.config.clone(),
            state: object_or_empty(request.planned_state.clone()),
            identity: identity_pairs(request.planned_identity.as_ref()),
            tombstoned: false,
        }
    }

    pub fn for_read(request: &ReadResourceRequest) -> Self {
        let mut data = Self::from_state(request.current_state.clone());
        data.identity = identity_pairs(request.current_identity.as_ref());
        data
    }

    pub fn for_update(request: &UpdateResourceRequest) -> Self {
        Self {
            prior: request.prior_state.clone(),
            config: request.config.clone(),
            state: object_or_empty(request.planned_state.clone()),
            identity: identity_pairs(request.planned_identity.as_ref()),
            tombstoned: false,
        }
    }

    pub fn for_delete(request: &DeleteResourceRequest) -> Self {
        let mut data = Self::from_state(request.prior_state.clone());
        data.identity = identity_pairs(request.prior_identity.as_ref());
        data
    }

    /// The primary ID, empty when unset or tombstoned
    pub fn id(&self) -> String {
        self.get_string(ID).unwrap_or_default()
    }

    /// Setting an empty ID tombstones the resource
    ///
    /// A resource state is an object; any other root is replaced by one
    /// holding just the ID.
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.tombstoned = id.is_empty();
        let value = if self.tombstoned {
            self.identity.clear();
            Dynamic::Null
        } else {
            Dynamic::String(id)
        };

        match &mut self.state.value {
            Dynamic::Map(entries) => {
                entries.insert(ID.to_string(), value);
            }
            root => *root = Dynamic::object([(ID, value)]),
        }
    }

    pub fn is_tombstoned(&self) -> bool {
        self.tombstoned
    }

    /// Whether a create is in progress (no prior state)
    pub fn is_new(&self) -> bool {
        self.prior.is_null()
    }

    /// Raw value at a dotted path in the working state
    pub fn get(&self, path: &str) -> Option<&Dynamic> {
        self.state.get(&AttributePath::parse(path))
    }

    /// Value at `path` when known and not the zero value of its type
    pub fn get_ok(&self, path: &str) -> Option<&Dynamic> {
        self.get(path).filter(|v| v.is_known() && !is_zero(v))
    }

    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).and_then(Dynamic::as_str).map(str::to_string)
    }

    /// Known string that is not empty
    pub fn get_string_ok(&self, path: &str) -> Option<String> {
        self.get_ok(path).and_then(Dynamic::as_str).map(str::to_string)
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Dynamic::as_i64)
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Dynamic::as_f64)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Dynamic::as_bool)
    }

    pub fn get_list(&self, path: &str) -> Vec<Dynamic> {
        self.get(path)
            .and_then(Dynamic::as_list)
            .map(<[Dynamic]>::to_vec)
            .unwrap_or_default()
    }

    pub fn get_string_list(&self, path: &str) -> Vec<String> {
        self.get_list(path)
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    pub fn get_string_map(&self, path: &str) -> HashMap<String, String> {
        self.get(path)
            .and_then(Dynamic::as_map)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Value the user wrote in configuration, ignoring defaults and state
    pub fn get_config(&self, path: &str) -> Option<&Dynamic> {
        self.config
            .get(&AttributePath::parse(path))
            .filter(|v| !v.is_null())
    }

    /// Prior and new value at `path`
    pub fn get_change(&self, path: &str) -> (Dynamic, Dynamic) {
        let parsed = AttributePath::parse(path);
        let old = self.prior.get(&parsed).cloned().unwrap_or(Dynamic::Null);
        let new = self.state.get(&parsed).cloned().unwrap_or(Dynamic::Null);
        (old, new)
    }

    pub fn has_change(&self, path: &str) -> bool {
        let (old, new) = self.get_change(path);
        !values_equal(&old, &new)
    }

    pub fn has_changes(&self, paths: &[&str]) -> bool {
        paths.iter().any(|p| self.has_change(p))
    }

    pub fn set(&mut self, path: &str, value: impl Into<Dynamic>) -> Result<()> {
        self.state.set_value(&AttributePath::parse(path), value.into())
    }

    pub fn set_identity(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.identity.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.identity.push((key.to_string(), value)),
        }
    }

    /// Identity entries in the order they were set
    pub fn identity(&self) -> &[(String, String)] {
        &self.identity
    }

    pub fn identity_data(&self) -> Option<ResourceIdentityData> {
        if self.identity.is_empty() {
            return None;
        }
        let map = self
            .identity
            .iter()
            .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
            .collect();
        Some(ResourceIdentityData {
            identity_data: DynamicValue::new(Dynamic::Map(map)),
        })
    }

    /// The working state with unresolved unknowns nulled, or None when tombstoned
    pub fn into_state(self) -> Option<DynamicValue> {
        if self.tombstoned {
            return None;
        }
        let mut state = self.state;
        resolve_unknowns(&mut state.value);
        Some(state)
    }

    /// Current working state, unknowns included
    pub fn state(&self) -> &DynamicValue {
        &self.state
    }
}

fn object_or_empty(value: DynamicValue) -> DynamicValue {
    match value.value {
        Dynamic::Map(_) => value,
        _ => DynamicValue::empty_object(),
    }
}

fn identity_pairs(identity: Option<&ResourceIdentityData>) -> Vec<(String, String)> {
    let Some(Dynamic::Map(map)) = identity.map(|i| &i.identity_data.value) else {
        return Vec::new();
    };
    let mut pairs: Vec<(String, String)> = map
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect();
    pairs.sort();
    pairs
}

fn is_zero(value: &Dynamic) -> bool {
    match value {
        Dynamic::Null | Dynamic::Unknown => true,
        Dynamic::Bool(b) => !b,
        Dynamic::Number(n) => *n == 0.0,
        Dynamic::String(s) => s.is_empty(),
        Dynamic::List(l) => l.is_empty(),
        Dynamic::Map(m) => m.is_empty(),
    }
}

fn resolve_unknowns(value: &mut Dynamic) {
    match value {
        Dynamic::Unknown => *value = Dynamic::Null,
        Dynamic::List(items) => items.iter_mut().for_each(resolve_unknowns),
        Dynamic::Map(map) => map.values_mut().for_each(resolve_unknowns),
        _ => {}
    }
}
