//! Serverless Functions: namespaces, functions and what hangs off them

pub mod resource_cron;
pub mod resource_domain;
pub mod resource_function;
pub mod resource_namespace;
pub mod resource_token;
pub mod resource_trigger;

pub use resource_cron::CronResource;
pub use resource_domain::DomainResource;
pub use resource_function::FunctionResource;
pub use resource_namespace::NamespaceResource;
pub use resource_token::TokenResource;
pub use resource_trigger::TriggerResource;

use std::time::Duration;

use tfplug::plan_modifier::SuppressDiff;
use tfplug::schema::Attribute;
use tfplug::{AttributeBuilder, AttributeType};

use crate::ids::locality_insensitive_eq;
use crate::resources::reference_attribute;
use crate::skeleton::Timeouts;

pub(crate) const FUNCTION_TIMEOUTS: Timeouts = Timeouts::uniform(Duration::from_secs(15 * 60));

pub(crate) fn environment_variables_attribute() -> Attribute {
    AttributeBuilder::new(
        "environment_variables",
        AttributeType::Map(Box::new(AttributeType::String)),
    )
    .description("Environment variables exposed at runtime")
    .optional()
    .build()
}

pub(crate) fn secret_environment_variables_attribute() -> Attribute {
    AttributeBuilder::new(
        "secret_environment_variables",
        AttributeType::Map(Box::new(AttributeType::String)),
    )
    .description("Secret environment variables exposed at runtime")
    .optional()
    .sensitive()
    .build()
}

/// `function_id` given as a bare UUID or `<region>/<uuid>`
pub(crate) fn function_id_attribute() -> Attribute {
    reference_attribute("function_id", "The ID of the function")
        .required()
        .plan_modifier(SuppressDiff::new(locality_insensitive_eq))
        .force_new()
        .build()
}
