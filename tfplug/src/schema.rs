//! Schema types and builders for tfplug
//!
//! Resources, data sources and providers describe their configuration with a
//! tree of attributes. Lists of objects use a `NestedType` with list nesting;
//! values for them are a list of maps, the 0th element carrying single blocks.

use crate::defaults::DefaultValue;
use crate::plan_modifier::PlanModifier;
use crate::types::{AttributePath, AttributePathStep};
use crate::validator::Validator;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    /// Resolve an attribute through nested object lists, e.g.
    /// `permissions.0.can_publish`. Index steps are only accepted where the
    /// attribute is a list, set or map.
    pub fn attribute_at(&self, path: &AttributePath) -> Option<&Attribute> {
        let mut attributes = &self.block.attributes;
        let mut current: Option<&Attribute> = None;

        for step in &path.steps {
            match step {
                AttributePathStep::AttributeName(name) => {
                    if let Some(attr) = current {
                        let nested = attr.nested_type.as_ref()?;
                        if nested.nesting != ObjectNestingMode::Single {
                            return None;
                        }
                        attributes = &nested.attributes;
                    }
                    current = Some(attributes.iter().find(|a| &a.name == name)?);
                }
                AttributePathStep::ElementKeyInt(_) | AttributePathStep::ElementKeyString(_) => {
                    let attr = current?;
                    let nested = attr.nested_type.as_ref()?;
                    if nested.nesting == ObjectNestingMode::Single {
                        return None;
                    }
                    attributes = &nested.attributes;
                    current = None;
                }
            }
        }

        current
    }
}

/// Block represents a configuration block
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub description: String,
    pub deprecated: bool,
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn DefaultValue>>,
    pub nested_type: Option<NestedType>,
    pub deprecated: bool,
}

impl Attribute {
    /// Whether the user may write this attribute
    pub fn is_writable(&self) -> bool {
        self.required || self.optional
    }
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .field("nested_type", &self.nested_type)
            .finish()
    }
}

/// NestedType for attributes with nested structures
#[derive(Debug, Clone)]
pub struct NestedType {
    pub attributes: Vec<Attribute>,
    pub nesting: ObjectNestingMode,
    pub max_items: Option<usize>,
}

impl NestedType {
    /// A list of objects holding at most one element
    pub fn single_list(attributes: Vec<Attribute>) -> Self {
        Self {
            attributes,
            nesting: ObjectNestingMode::List,
            max_items: Some(1),
        }
    }

    pub fn list(attributes: Vec<Attribute>) -> Self {
        Self {
            attributes,
            nesting: ObjectNestingMode::List,
            max_items: None,
        }
    }

    /// The object type of one element
    pub fn object_type(&self) -> AttributeType {
        AttributeType::Object(
            self.attributes
                .iter()
                .map(|a| (a.name.clone(), a.r#type.clone()))
                .collect(),
        )
    }
}

/// ObjectNestingMode for nested attribute objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectNestingMode {
    Single,
    List,
    Set,
    Map,
}

/// IdentitySchema describes the resource identity side-channel
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySchema {
    pub version: i64,
    pub attributes: Vec<IdentityAttribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityAttribute {
    pub name: String,
    pub r#type: AttributeType,
    pub required_for_import: bool,
    pub optional_for_import: bool,
    pub description: String,
}

impl IdentitySchema {
    pub fn new(version: i64) -> Self {
        Self {
            version,
            attributes: Vec::new(),
        }
    }

    pub fn required_string(mut self, name: &str, description: &str) -> Self {
        self.attributes.push(IdentityAttribute {
            name: name.to_string(),
            r#type: AttributeType::String,
            required_for_import: true,
            optional_for_import: false,
            description: description.to_string(),
        });
        self
    }

    pub fn optional_string(mut self, name: &str, description: &str) -> Self {
        self.attributes.push(IdentityAttribute {
            name: name.to_string(),
            r#type: AttributeType::String,
            required_for_import: false,
            optional_for_import: true,
            description: description.to_string(),
        });
        self
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                nested_type: None,
                deprecated: false,
            },
        }
    }

    /// A list-of-objects attribute backed by a nested type
    pub fn nested(name: &str, nested: NestedType) -> Self {
        let element = nested.object_type();
        let type_ = match nested.nesting {
            ObjectNestingMode::Single => element,
            ObjectNestingMode::List => AttributeType::List(Box::new(element)),
            ObjectNestingMode::Set => AttributeType::Set(Box::new(element)),
            ObjectNestingMode::Map => AttributeType::Map(Box::new(element)),
        };
        Self::new(name, type_).nested_type(nested)
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn optional_computed(self) -> Self {
        self.optional().computed()
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: impl PlanModifier + 'static) -> Self {
        self.attribute.plan_modifiers.push(Arc::new(modifier));
        self
    }

    /// Replace the resource when this attribute changes
    pub fn force_new(self) -> Self {
        self.plan_modifier(crate::plan_modifier::RequiresReplaceIfChanged)
    }

    pub fn default(mut self, default: impl DefaultValue + 'static) -> Self {
        self.attribute.default = Some(Arc::new(default));
        self
    }

    pub fn nested_type(mut self, nested: NestedType) -> Self {
        self.attribute.nested_type = Some(nested);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
#[derive(Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            version: 0,
            block: Block::default(),
        }
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn attributes(mut self, attrs: impl IntoIterator<Item = Attribute>) -> Self {
        self.schema.block.attributes.extend(attrs);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}
