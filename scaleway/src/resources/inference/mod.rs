//! Managed Inference deployments and custom models

pub mod resource_deployment;
pub mod resource_model;

pub use resource_deployment::DeploymentResource;
pub use resource_model::ModelResource;

use std::time::Duration;

use crate::skeleton::Timeouts;

/// Model downloads and GPU node provisioning are slow
pub(crate) const INFERENCE_TIMEOUTS: Timeouts = Timeouts::uniform(Duration::from_secs(80 * 60));
