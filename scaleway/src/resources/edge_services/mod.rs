//! Edge Services pipelines and their stages
//!
//! Edge Services is a global API: every ID here is a bare UUID and the
//! identity carries a single key named after the stage kind.

pub mod resource_backend_stage;
pub mod resource_cache_stage;
pub mod resource_dns_stage;
pub mod resource_head_stage;
pub mod resource_pipeline;
pub mod resource_route_stage;
pub mod resource_waf_stage;

pub use resource_backend_stage::BackendStageResource;
pub use resource_cache_stage::CacheStageResource;
pub use resource_dns_stage::DnsStageResource;
pub use resource_head_stage::HeadStageResource;
pub use resource_pipeline::PipelineResource;
pub use resource_route_stage::RouteStageResource;
pub use resource_waf_stage::WafStageResource;

use tfplug::schema::Attribute;
use tfplug::{AttributeBuilder, AttributeType, Dynamic};

use crate::flatten::flatten_time;

pub(crate) fn pipeline_id_attribute() -> Attribute {
    AttributeBuilder::new("pipeline_id", AttributeType::String)
        .description("The ID of the pipeline")
        .required()
        .force_new()
        .build()
}

pub(crate) fn stage_reference(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional_computed()
        .build()
}

/// State values shared by every stage
pub(crate) fn stage_values(
    pipeline_id: String,
    created_at: Option<&str>,
    updated_at: Option<&str>,
) -> [(&'static str, Dynamic); 3] {
    [
        ("pipeline_id", Dynamic::from(pipeline_id)),
        ("created_at", Dynamic::from(flatten_time(created_at))),
        ("updated_at", Dynamic::from(flatten_time(updated_at))),
    ]
}

