//! SQS and SNS credentials with a `permissions` block
//!
//! The secret key is only returned at creation; reads keep the stored one.

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::schema::NestedType;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema, ResourceData,
    Schema, SchemaBuilder,
};

use crate::api::mnq::{Credentials, CredentialsRequest, MnqService, Permissions};
use crate::flatten::name_or_random;
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, project_id_attribute, region_attribute, regional_id, resolve_region,
};
use crate::skeleton::{ignore_not_found, read_failure, require_project, set_values, ScalewayResource};

pub struct SqsCredentialsResource;

pub struct SnsCredentialsResource;

const PERMISSIONS: [(&str, &str); 3] = [
    ("can_publish", "Allow publishing messages"),
    ("can_receive", "Allow receiving messages"),
    ("can_manage", "Allow managing the associated resources"),
];

fn schema(service: MnqService) -> Schema {
    let name = service.as_str().to_uppercase();
    let permissions = PERMISSIONS
        .iter()
        .map(|(key, description)| {
            AttributeBuilder::new(key, AttributeType::Bool)
                .description(description)
                .optional_computed()
                .build()
        })
        .collect();

    SchemaBuilder::new()
        .version(0)
        .description(&format!("Manages {} credentials", name))
        .attribute(id_attribute())
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("The name of the credentials, generated when omitted")
                .optional_computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::nested("permissions", NestedType::single_list(permissions))
                .description("What the credentials are allowed to do")
                .optional_computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("access_key", AttributeType::String)
                .description(&format!("The {} access key", name))
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("secret_key", AttributeType::String)
                .description(&format!("The {} secret key", name))
                .computed()
                .sensitive()
                .build(),
        )
        .attribute(region_attribute())
        .attribute(project_id_attribute())
        .build()
}

fn expand_permissions(data: &ResourceData) -> Option<Permissions> {
    data.get("permissions.0")?;
    let flag = |key: &str| data.get_bool(&format!("permissions.0.{}", key)).unwrap_or(false);
    Some(Permissions {
        can_publish: flag("can_publish"),
        can_receive: flag("can_receive"),
        can_manage: flag("can_manage"),
    })
}

fn flatten_permissions(permissions: Option<Permissions>) -> Dynamic {
    let permissions = permissions.unwrap_or_default();
    Dynamic::List(vec![Dynamic::object([
        ("can_publish", Dynamic::from(permissions.can_publish)),
        ("can_receive", Dynamic::from(permissions.can_receive)),
        ("can_manage", Dynamic::from(permissions.can_manage)),
    ])])
}

fn flatten(data: &mut ResourceData, credentials: Credentials) -> Diagnostics {
    let mut values = vec![
        ("name", Dynamic::from(credentials.name)),
        ("permissions", flatten_permissions(credentials.permissions)),
        ("access_key", Dynamic::from(credentials.access_key)),
        ("project_id", Dynamic::from(credentials.project_id)),
    ];
    if let Some(secret_key) = credentials.secret_key {
        values.push(("secret_key", Dynamic::from(secret_key)));
    }
    set_values(data, values)
}

async fn create(service: MnqService, meta: &ScalewayProviderData, data: &mut ResourceData) -> Diagnostics {
    let region = match resolve_region(meta, data) {
        Ok(region) => region,
        Err(diagnostics) => return diagnostics,
    };
    let project_id = match require_project(meta, data) {
        Ok(project_id) => project_id,
        Err(diagnostics) => return diagnostics,
    };
    let request = CredentialsRequest {
        project_id: Some(project_id),
        name: Some(name_or_random(data, &format!("mnq-{}", service.as_str()))),
        permissions: expand_permissions(data),
    };

    let summary = format!("Failed to create {} credentials", service.as_str().to_uppercase());
    let credentials = match meta.client.mnq(region).create_credentials(service, &request).await {
        Ok(credentials) => credentials,
        Err(e) => return Diagnostics::from_error(summary, e),
    };
    persist_regional_identity(data, region, &credentials.id);
    flatten(data, credentials)
}

async fn read(service: MnqService, meta: &ScalewayProviderData, data: &mut ResourceData) -> Diagnostics {
    let (region, id) = match regional_id(meta, data) {
        Ok(parsed) => parsed,
        Err(diagnostics) => return diagnostics,
    };
    let summary = format!("Failed to read {} credentials", service.as_str().to_uppercase());
    let credentials = match meta.client.mnq(region).get_credentials(service, &id).await {
        Ok(credentials) => credentials,
        Err(e) => return read_failure(data, &summary, &e),
    };

    persist_regional_identity(data, region, &credentials.id);
    let mut diagnostics = flatten(data, credentials);
    diagnostics.extend(set_values(data, [("region", Dynamic::from(region.as_str()))]));
    diagnostics
}

async fn update(service: MnqService, meta: &ScalewayProviderData, data: &mut ResourceData) -> Diagnostics {
    if !data.has_changes(&["name", "permissions"]) {
        return Diagnostics::new();
    }
    let (region, id) = match regional_id(meta, data) {
        Ok(parsed) => parsed,
        Err(diagnostics) => return diagnostics,
    };
    let mut request = CredentialsRequest::default();
    if data.has_change("name") {
        request.name = data.get_string_ok("name");
    }
    if data.has_change("permissions") {
        request.permissions = expand_permissions(data);
    }

    match meta.client.mnq(region).update_credentials(service, &id, &request).await {
        Ok(_) => Diagnostics::new(),
        Err(e) => Diagnostics::from_error(
            format!("Failed to update {} credentials", service.as_str().to_uppercase()),
            e,
        ),
    }
}

async fn delete(service: MnqService, meta: &ScalewayProviderData, data: &mut ResourceData) -> Diagnostics {
    let (region, id) = match regional_id(meta, data) {
        Ok(parsed) => parsed,
        Err(diagnostics) => return diagnostics,
    };
    match ignore_not_found(meta.client.mnq(region).delete_credentials(service, &id).await) {
        Ok(()) => Diagnostics::new(),
        Err(e) => Diagnostics::from_error(
            format!("Failed to delete {} credentials", service.as_str().to_uppercase()),
            e,
        ),
    }
}

macro_rules! credentials_resource {
    ($resource:ty, $type_name:literal, $service:expr) => {
        #[async_trait]
        impl ScalewayResource for $resource {
            const TYPE_NAME: &'static str = $type_name;

            fn schema() -> Schema {
                schema($service)
            }

            fn identity_schema() -> IdentitySchema {
                regional_identity_schema()
            }

            fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
                compose_regional(fields)
            }

            async fn create(
                &self,
                _ctx: &Context,
                meta: &ScalewayProviderData,
                data: &mut ResourceData,
            ) -> Diagnostics {
                create($service, meta, data).await
            }

            async fn read(
                &self,
                _ctx: &Context,
                meta: &ScalewayProviderData,
                data: &mut ResourceData,
            ) -> Diagnostics {
                read($service, meta, data).await
            }

            async fn update(
                &self,
                _ctx: &Context,
                meta: &ScalewayProviderData,
                data: &mut ResourceData,
            ) -> Diagnostics {
                update($service, meta, data).await
            }

            async fn delete(
                &self,
                _ctx: &Context,
                meta: &ScalewayProviderData,
                data: &mut ResourceData,
            ) -> Diagnostics {
                delete($service, meta, data).await
            }
        }
    };
}

credentials_resource!(SqsCredentialsResource, "scaleway_mnq_sqs_credentials", MnqService::Sqs);
credentials_resource!(SnsCredentialsResource, "scaleway_mnq_sns_credentials", MnqService::Sns);

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::DynamicValue;

    fn data(entries: Vec<(&str, Dynamic)>) -> ResourceData {
        ResourceData::from_state(DynamicValue::new(Dynamic::object(entries)))
    }

    #[test]
    fn permissions_default_to_denied() {
        let data = data(vec![(
            "permissions",
            Dynamic::List(vec![Dynamic::object([("can_publish", Dynamic::Bool(true))])]),
        )]);
        let permissions = expand_permissions(&data).unwrap();
        assert!(permissions.can_publish);
        assert!(!permissions.can_receive);
        assert!(!permissions.can_manage);
    }

    #[test]
    fn missing_block_sends_no_permissions() {
        let data = data(vec![("name", Dynamic::from("creds"))]);
        assert_eq!(expand_permissions(&data), None);
    }
}
