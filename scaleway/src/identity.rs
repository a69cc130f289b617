//! Keeping the primary ID and the resource identity side-channel in step

use std::collections::HashMap;

use tfplug::{IdentitySchema, ResourceData};

use crate::ids::{encode_mnq, encode_mnq_subscription, encode_regional, encode_zonal, SubscriptionId};
use crate::locality::{Region, Zone};

/// Sets the ID to `<region>/<uuid>` and the identity to `{region, id}`
pub fn persist_regional_identity(data: &mut ResourceData, region: Region, uuid: &str) {
    data.set_id(encode_regional(region, uuid));
    data.set_identity("id", uuid);
    data.set_identity("region", region.as_str());
}

/// Sets the ID to `<zone>/<uuid>` and the identity to `{zone, id}`
pub fn persist_zonal_identity(data: &mut ResourceData, zone: Zone, uuid: &str) {
    data.set_id(encode_zonal(zone, uuid));
    data.set_identity("id", uuid);
    data.set_identity("zone", zone.to_string());
}

/// Sets the ID to the bare value and the identity to `{key: value}`
pub fn persist_flat_identity(data: &mut ResourceData, key: &str, value: &str) {
    data.set_id(value);
    data.set_identity(key, value);
}

pub fn persist_mnq_identity(data: &mut ResourceData, region: Region, project_id: &str, name: &str) {
    data.set_id(encode_mnq(region, project_id, name));
    data.set_identity("region", region.as_str());
    data.set_identity("project_id", project_id);
    data.set_identity("name", name);
}

pub fn persist_subscription_identity(data: &mut ResourceData, id: &SubscriptionId) {
    data.set_id(encode_mnq_subscription(
        id.region,
        &id.project_id,
        &id.topic_name,
        &id.subscription_id,
    ));
    data.set_identity("region", id.region.as_str());
    data.set_identity("project_id", id.project_id.clone());
    data.set_identity("topic_name", id.topic_name.clone());
    data.set_identity("subscription_id", id.subscription_id.clone());
}

pub fn regional_identity_schema() -> IdentitySchema {
    IdentitySchema::new(0)
        .required_string("id", "The UUID of the resource")
        .required_string("region", "The region of the resource")
}

pub fn zonal_identity_schema() -> IdentitySchema {
    IdentitySchema::new(0)
        .required_string("id", "The UUID of the resource")
        .required_string("zone", "The zone of the resource")
}

pub fn flat_identity_schema(key: &str) -> IdentitySchema {
    IdentitySchema::new(0).required_string(key, "The UUID of the resource")
}

pub fn mnq_identity_schema() -> IdentitySchema {
    IdentitySchema::new(0)
        .required_string("region", "The region of the resource")
        .required_string("project_id", "The project owning the resource")
        .required_string("name", "The name of the resource")
}

pub fn subscription_identity_schema() -> IdentitySchema {
    IdentitySchema::new(0)
        .required_string("region", "The region of the topic")
        .required_string("project_id", "The project owning the topic")
        .required_string("topic_name", "The name of the topic")
        .required_string("subscription_id", "The UUID of the subscription")
}

pub fn compose_regional(fields: &HashMap<String, String>) -> Option<String> {
    Some(format!("{}/{}", fields.get("region")?, fields.get("id")?))
}

pub fn compose_zonal(fields: &HashMap<String, String>) -> Option<String> {
    Some(format!("{}/{}", fields.get("zone")?, fields.get("id")?))
}

pub fn compose_flat(fields: &HashMap<String, String>, key: &str) -> Option<String> {
    fields.get(key).cloned()
}

pub fn compose_mnq(fields: &HashMap<String, String>) -> Option<String> {
    Some(format!(
        "{}/{}/{}",
        fields.get("region")?,
        fields.get("project_id")?,
        fields.get("name")?
    ))
}

pub fn compose_subscription(fields: &HashMap<String, String>) -> Option<String> {
    Some(format!(
        "{}/{}/{}/{}",
        fields.get("region")?,
        fields.get("project_id")?,
        fields.get("topic_name")?,
        fields.get("subscription_id")?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::DynamicValue;

    const UUID: &str = "11111111-2222-3333-4444-555555555555";

    #[test]
    fn regional_identity_matches_id() {
        let mut data = ResourceData::from_state(DynamicValue::empty_object());
        persist_regional_identity(&mut data, Region::FrPar, UUID);

        assert_eq!(data.id(), format!("fr-par/{}", UUID));
        let fields: HashMap<String, String> = data.identity().iter().cloned().collect();
        assert_eq!(compose_regional(&fields), Some(data.id()));
    }

    #[test]
    fn tombstone_clears_identity() {
        let mut data = ResourceData::from_state(DynamicValue::empty_object());
        persist_flat_identity(&mut data, "project_id", UUID);
        assert_eq!(data.identity().len(), 1);

        data.set_id("");
        assert!(data.identity().is_empty());
        assert!(data.identity_data().is_none());
    }

    #[test]
    fn mnq_identity_composes_back() {
        let mut data = ResourceData::from_state(DynamicValue::empty_object());
        persist_mnq_identity(&mut data, Region::NlAms, UUID, "my-queue");

        let fields: HashMap<String, String> = data.identity().iter().cloned().collect();
        assert_eq!(compose_mnq(&fields).as_deref(), Some(data.id().as_str()));
        assert_eq!(compose_zonal(&fields), None);
    }

    #[test]
    fn zonal_identity_uses_zone() {
        let mut data = ResourceData::from_state(DynamicValue::empty_object());
        let zone: Zone = "fr-par-2".parse().unwrap();
        persist_zonal_identity(&mut data, zone, UUID);

        assert_eq!(data.id(), format!("fr-par-2/{}", UUID));
        let fields: HashMap<String, String> = data.identity().iter().cloned().collect();
        assert_eq!(compose_zonal(&fields), Some(data.id()));
    }
}
