//! Resource implementations

pub mod account;
pub mod edge_services;
pub mod file;
pub mod function;
pub mod inference;
pub mod mnq;
pub mod registry;
pub mod sdb;

use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::schema::Attribute;
use tfplug::validator::{StringOneOfValidator, UuidValidator};
use tfplug::{AttributeBuilder, AttributeType, Diagnostics, ResourceData};

use crate::ids::parse_regional_id;
use crate::locality::Region;
use crate::provider_data::ScalewayProviderData;
use crate::skeleton::id_error;

pub fn id_attribute() -> Attribute {
    AttributeBuilder::new("id", AttributeType::String)
        .description("The ID of the resource")
        .computed()
        .plan_modifier(UseStateForUnknown)
        .build()
}

pub fn region_attribute() -> Attribute {
    let regions: Vec<&str> = Region::ALL.iter().map(Region::as_str).collect();
    AttributeBuilder::new("region", AttributeType::String)
        .description("The region of the resource, defaults to the provider region")
        .optional_computed()
        .validator(StringOneOfValidator::new(&regions))
        .plan_modifier(UseStateForUnknown)
        .plan_modifier(RequiresReplaceIfChanged)
        .build()
}

pub fn project_id_attribute() -> Attribute {
    AttributeBuilder::new("project_id", AttributeType::String)
        .description("The project the resource belongs to, defaults to the provider project")
        .optional_computed()
        .validator(UuidValidator {
            allow_locality: false,
        })
        .plan_modifier(UseStateForUnknown)
        .plan_modifier(RequiresReplaceIfChanged)
        .build()
}

pub fn organization_id_attribute() -> Attribute {
    AttributeBuilder::new("organization_id", AttributeType::String)
        .description("The organization the resource belongs to")
        .computed()
        .plan_modifier(UseStateForUnknown)
        .build()
}

pub fn tags_attribute() -> Attribute {
    AttributeBuilder::new("tags", AttributeType::List(Box::new(AttributeType::String)))
        .description("Tags attached to the resource")
        .optional()
        .build()
}

pub fn timestamp_attribute(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .computed()
        .build()
}

pub fn status_attribute() -> Attribute {
    AttributeBuilder::new("status", AttributeType::String)
        .description("The status of the resource")
        .computed()
        .build()
}

/// Reference to another resource by UUID, locality prefix allowed
pub fn reference_attribute(name: &str, description: &str) -> AttributeBuilder {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .validator(UuidValidator {
            allow_locality: true,
        })
}

/// Region for a new resource, as a diagnostic when `region` is invalid
pub fn resolve_region(meta: &ScalewayProviderData, data: &ResourceData) -> Result<Region, Diagnostics> {
    meta.region(data).map_err(id_error)
}

/// `(region, uuid)` of an existing regional resource
pub fn regional_id(meta: &ScalewayProviderData, data: &ResourceData) -> Result<(Region, String), Diagnostics> {
    parse_regional_id(&data.id(), meta.default_region).map_err(id_error)
}
