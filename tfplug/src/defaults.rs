//! Default value providers for attributes
//!
//! Defaults are evaluated during planning when an optional attribute is
//! absent from configuration. They differ from plan modifiers in that they
//! only run when the value is null.

use crate::types::{AttributePath, Dynamic};

/// DefaultValue provides default values for optional attributes
pub trait DefaultValue: Send + Sync {
    fn description(&self) -> String;
    fn default_value(&self, path: &AttributePath) -> Dynamic;
}

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn string(value: &str) -> Self {
        Self::new(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Self {
        Self::new(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(Dynamic::Bool(value))
    }

    pub fn list(values: Vec<Dynamic>) -> Self {
        Self::new(Dynamic::List(values))
    }
}

impl DefaultValue for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _path: &AttributePath) -> Dynamic {
        self.value.clone()
    }
}
