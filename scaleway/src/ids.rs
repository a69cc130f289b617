//! Composite identifier codec
//!
//! Shapes stored as primary IDs:
//! - flat `<uuid>` for global resources
//! - regional `<region>/<uuid>` and zonal `<zone>/<uuid>`
//! - MNQ `<region>/<project>/<name>`, plus `/<subscription>` for subscriptions
//! - ARN `arn:scw:<service>:<region>:project-<project>:<name>[:<extra>]`

use std::fmt;
use std::str::FromStr;

use tfplug::types::Dynamic;

use crate::locality::{Locality, Region, Zone};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("invalid ID: {0}")]
    InvalidID(String),
}

const ARN_PROJECT_PREFIX: &str = "project-";

/// Check that `s` is a canonical hyphenated UUID
pub fn validate_uuid(s: &str) -> Result<&str, IdError> {
    if s.len() != 36 || uuid::Uuid::parse_str(s).is_err() {
        return Err(IdError::InvalidID(format!("{:?} is not a UUID", s)));
    }
    Ok(s)
}

pub fn encode_regional(region: Region, uuid: &str) -> String {
    format!("{}/{}", region, uuid)
}

pub fn decode_regional(id: &str) -> Result<(Region, String), IdError> {
    let (region, uuid) = id
        .split_once('/')
        .ok_or_else(|| IdError::InvalidID(format!("{:?} is not <region>/<uuid>", id)))?;
    let region: Region = region.parse()?;
    Ok((region, validate_uuid(uuid)?.to_string()))
}

pub fn encode_zonal(zone: Zone, uuid: &str) -> String {
    format!("{}/{}", zone, uuid)
}

pub fn decode_zonal(id: &str) -> Result<(Zone, String), IdError> {
    let (zone, uuid) = id
        .split_once('/')
        .ok_or_else(|| IdError::InvalidID(format!("{:?} is not <zone>/<uuid>", id)))?;
    let zone: Zone = zone.parse()?;
    Ok((zone, validate_uuid(uuid)?.to_string()))
}

pub fn encode_mnq(region: Region, project_id: &str, name: &str) -> String {
    format!("{}/{}/{}", region, project_id, name)
}

pub fn decode_mnq(id: &str) -> Result<(Region, String, String), IdError> {
    let parts: Vec<&str> = id.split('/').collect();
    let [region, project_id, name] = parts.as_slice() else {
        return Err(IdError::InvalidID(format!(
            "{:?} is not <region>/<project-id>/<name>",
            id
        )));
    };
    if name.is_empty() {
        return Err(IdError::InvalidID(format!("{:?} has an empty name", id)));
    }
    Ok((
        region.parse()?,
        validate_uuid(project_id)?.to_string(),
        name.to_string(),
    ))
}

pub fn encode_mnq_subscription(
    region: Region,
    project_id: &str,
    topic_name: &str,
    subscription_id: &str,
) -> String {
    format!("{}/{}/{}/{}", region, project_id, topic_name, subscription_id)
}

/// Decoded `<region>/<project>/<topic>/<subscription>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionId {
    pub region: Region,
    pub project_id: String,
    pub topic_name: String,
    pub subscription_id: String,
}

pub fn decode_mnq_subscription(id: &str) -> Result<SubscriptionId, IdError> {
    let parts: Vec<&str> = id.split('/').collect();
    let [region, project_id, topic_name, subscription_id] = parts.as_slice() else {
        return Err(IdError::InvalidID(format!(
            "{:?} is not <region>/<project-id>/<topic>/<subscription-id>",
            id
        )));
    };
    if topic_name.is_empty() {
        return Err(IdError::InvalidID(format!("{:?} has an empty topic name", id)));
    }
    Ok(SubscriptionId {
        region: region.parse()?,
        project_id: validate_uuid(project_id)?.to_string(),
        topic_name: topic_name.to_string(),
        subscription_id: validate_uuid(subscription_id)?.to_string(),
    })
}

/// Amazon-style resource name used by the SNS/SQS compatibility surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    pub service: String,
    pub region: Region,
    pub project_id: String,
    pub name: String,
    pub extra: Option<String>,
}

impl Arn {
    pub fn new(service: &str, region: Region, project_id: &str, name: &str) -> Self {
        Self {
            service: service.to_string(),
            region,
            project_id: project_id.to_string(),
            name: name.to_string(),
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: &str) -> Self {
        self.extra = Some(extra.to_string());
        self
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:scw:{}:{}:{}{}:{}",
            self.service, self.region, ARN_PROJECT_PREFIX, self.project_id, self.name
        )?;
        if let Some(extra) = &self.extra {
            write!(f, ":{}", extra)?;
        }
        Ok(())
    }
}

impl FromStr for Arn {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |why: &str| IdError::InvalidID(format!("invalid ARN {:?}: {}", s, why));

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 && parts.len() != 7 {
            return Err(invalid("expected 6 or 7 parts"));
        }
        if parts[0] != "arn" {
            return Err(invalid("must start with arn"));
        }
        if parts[1] != "scw" {
            return Err(invalid("partition must be scw"));
        }
        if parts[2].is_empty() {
            return Err(invalid("empty service"));
        }
        let region: Region = parts[3].parse().map_err(|_| invalid("unknown region"))?;
        let project_id = parts[4]
            .strip_prefix(ARN_PROJECT_PREFIX)
            .ok_or_else(|| invalid("project part must start with project-"))?;
        validate_uuid(project_id)?;
        if parts[5].is_empty() {
            return Err(invalid("empty resource name"));
        }
        let extra = match parts.get(6) {
            Some(extra) => Some(validate_uuid(extra)?.to_string()),
            None => None,
        };

        Ok(Arn {
            service: parts[2].to_string(),
            region,
            project_id: project_id.to_string(),
            name: parts[5].to_string(),
            extra,
        })
    }
}

pub fn encode_arn(
    service: &str,
    region: Region,
    project_id: &str,
    name: &str,
    extra: Option<&str>,
) -> String {
    let arn = Arn::new(service, region, project_id, name);
    match extra {
        Some(extra) => arn.with_extra(extra).to_string(),
        None => arn.to_string(),
    }
}

pub fn decode_arn(arn: &str) -> Result<Arn, IdError> {
    arn.parse()
}

/// Split `<locality>/<id>` or a bare `<id>`, which takes `default`
pub fn parse_id_with_locality(id: &str, default: Locality) -> Result<(Locality, String), IdError> {
    match id.split_once('/') {
        Some((locality, bare)) => {
            if bare.is_empty() || bare.contains('/') {
                return Err(IdError::InvalidID(format!("{:?} is not <locality>/<id>", id)));
            }
            Ok((locality.parse()?, bare.to_string()))
        }
        None if id.is_empty() => Err(IdError::InvalidID("empty ID".to_string())),
        None => Ok((default, id.to_string())),
    }
}

/// Regional form of [`parse_id_with_locality`]; zones are narrowed to their region
pub fn parse_regional_id(id: &str, default: Region) -> Result<(Region, String), IdError> {
    let (locality, bare) = parse_id_with_locality(id, Locality::Region(default))?;
    Ok((locality.region(), validate_uuid(&bare)?.to_string()))
}

/// Drop a leading locality, e.g. `fr-par/<uuid>` becomes `<uuid>`
pub fn expand_id(id: &str) -> &str {
    match id.split_once('/') {
        Some((_, bare)) => bare,
        None => id,
    }
}

/// The configured reference when it names the server's UUID, so a
/// `<region>/<uuid>` in configuration survives a read
pub fn keep_reference(configured: Option<String>, server: &str) -> String {
    configured
        .filter(|c| expand_id(c) == expand_id(server))
        .unwrap_or_else(|| server.to_string())
}

/// Two references are equal once their locality prefix is ignored
pub fn locality_insensitive_eq(a: &Dynamic, b: &Dynamic) -> bool {
    match (a.as_str(), b.as_str()) {
        (Some(a), Some(b)) => expand_id(a) == expand_id(b),
        _ => false,
    }
}
