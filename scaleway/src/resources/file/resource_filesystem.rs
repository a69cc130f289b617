//! File Storage filesystem

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::validator::FnValidator;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema,
    ResourceData, Schema, SchemaBuilder,
};

use crate::api::file::{CreateFilesystemRequest, Filesystem, UpdateFilesystemRequest};
use crate::flatten::{flatten_time, name_or_random};
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, organization_id_attribute, project_id_attribute, region_attribute, regional_id,
    resolve_region, status_attribute, tags_attribute, timestamp_attribute,
};
use crate::skeleton::{
    ignore_gone, ignore_not_found, require_project, set_values, wait_failure, ScalewayResource,
};
use crate::waiter::{ensure_ready, wait_for, wait_for_deletion, FILE_SYSTEM};

/// Sizes are allocated in steps of 100 GB
const SIZE_STEP: u64 = 100_000_000_000;

pub struct FilesystemResource;

fn size_step(value: &Dynamic) -> Result<(), String> {
    match value.as_f64() {
        Some(size) if size < SIZE_STEP as f64 => {
            Err(format!("size must be at least {} bytes", SIZE_STEP))
        }
        Some(size) if size.fract() != 0.0 || (size as u64) % SIZE_STEP != 0 => {
            Err(format!("size must be a multiple of {} bytes", SIZE_STEP))
        }
        _ => Ok(()),
    }
}

fn size(data: &ResourceData) -> u64 {
    data.get_f64("size").map(|s| s as u64).unwrap_or(SIZE_STEP)
}

fn flatten(data: &mut ResourceData, filesystem: Filesystem) -> Diagnostics {
    set_values(
        data,
        [
            ("name", Dynamic::from(filesystem.name)),
            ("size", Dynamic::from(filesystem.size as f64)),
            ("tags", Dynamic::from(filesystem.tags)),
            ("number_of_attachments", Dynamic::from(filesystem.number_of_attachments)),
            ("status", Dynamic::from(filesystem.status)),
            ("project_id", Dynamic::from(filesystem.project_id)),
            ("organization_id", Dynamic::from(filesystem.organization_id)),
            ("created_at", Dynamic::from(flatten_time(filesystem.created_at.as_deref()))),
            ("updated_at", Dynamic::from(flatten_time(filesystem.updated_at.as_deref()))),
        ],
    )
}

#[async_trait]
impl ScalewayResource for FilesystemResource {
    const TYPE_NAME: &'static str = "scaleway_file_filesystem";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a File Storage filesystem")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the filesystem, generated when omitted")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size", AttributeType::Number)
                    .description("Size in bytes, a multiple of 100 GB; it can only grow")
                    .required()
                    .validator(FnValidator::new("multiple of 100 GB", size_step))
                    .build(),
            )
            .attribute(tags_attribute())
            .attribute(
                AttributeBuilder::new("number_of_attachments", AttributeType::Number)
                    .description("Number of instances the filesystem is attached to")
                    .computed()
                    .build(),
            )
            .attribute(status_attribute())
            .attribute(region_attribute())
            .attribute(project_id_attribute())
            .attribute(organization_id_attribute())
            .attribute(timestamp_attribute("created_at", "The date and time of the creation of the filesystem"))
            .attribute(timestamp_attribute("updated_at", "The date and time of the last update of the filesystem"))
            .build()
    }

    fn identity_schema() -> IdentitySchema {
        regional_identity_schema()
    }

    fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
        compose_regional(fields)
    }

    async fn create(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let region = match resolve_region(meta, data) {
            Ok(region) => region,
            Err(diagnostics) => return diagnostics,
        };
        let project_id = match require_project(meta, data) {
            Ok(project_id) => project_id,
            Err(diagnostics) => return diagnostics,
        };
        let request = CreateFilesystemRequest {
            name: name_or_random(data, "fs"),
            project_id,
            size: size(data),
            tags: data.get_string_list("tags"),
        };

        let api = meta.client.file(region);
        let filesystem = match api.create_filesystem(&request).await {
            Ok(filesystem) => filesystem,
            Err(e) => return Diagnostics::from_error("Failed to create filesystem", e),
        };
        persist_regional_identity(data, region, &filesystem.id);

        let interval = FILE_SYSTEM.interval(meta.wait_retry_interval);
        match wait_for(ctx, &FILE_SYSTEM, interval, || api.get_filesystem(&filesystem.id))
            .await
            .and_then(|filesystem| ensure_ready(&FILE_SYSTEM, filesystem))
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Filesystem did not become available", e),
        }
    }

    async fn read(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let api = meta.client.file(region);
        let interval = FILE_SYSTEM.interval(meta.wait_retry_interval);

        let filesystem = match wait_for(ctx, &FILE_SYSTEM, interval, || api.get_filesystem(&id)).await {
            Ok(filesystem) => filesystem,
            Err(e) => return wait_failure(data, "Failed to read filesystem", &e),
        };

        persist_regional_identity(data, region, &filesystem.id);
        let mut diagnostics = flatten(data, filesystem);
        diagnostics.extend(set_values(data, [("region", Dynamic::from(region.as_str()))]));
        diagnostics
    }

    async fn update(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let api = meta.client.file(region);
        let interval = FILE_SYSTEM.interval(meta.wait_retry_interval);

        if let Err(e) = wait_for(ctx, &FILE_SYSTEM, interval, || api.get_filesystem(&id)).await {
            return Diagnostics::from_error("Failed to wait for filesystem", e);
        }
        if !data.has_changes(&["name", "size", "tags"]) {
            return Diagnostics::new();
        }

        let mut request = UpdateFilesystemRequest::default();
        if data.has_change("name") {
            request.name = data.get_string_ok("name");
        }
        if data.has_change("size") {
            let (old, new) = data.get_change("size");
            let old = old.as_f64().unwrap_or_default();
            let new = new.as_f64().unwrap_or_default();
            if new < old {
                let mut diagnostics = Diagnostics::new();
                diagnostics.add_error_at(
                    AttributePath::new("size"),
                    "Filesystem cannot shrink",
                    format!("size can only grow, from {} bytes", old),
                );
                return diagnostics;
            }
            request.size = Some(new as u64);
        }
        if data.has_change("tags") {
            request.tags = Some(data.get_string_list("tags"));
        }

        if let Err(e) = api.update_filesystem(&id, &request).await {
            return Diagnostics::from_error("Failed to update filesystem", e);
        }
        match wait_for(ctx, &FILE_SYSTEM, interval, || api.get_filesystem(&id)).await {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for filesystem", e),
        }
    }

    async fn delete(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let api = meta.client.file(region);
        let interval = FILE_SYSTEM.interval(meta.wait_retry_interval);

        let settled = wait_for(ctx, &FILE_SYSTEM, interval, || api.get_filesystem(&id)).await;
        if let Err(e) = ignore_gone(settled.map(|_| ())) {
            return Diagnostics::from_error("Failed to wait for filesystem", e);
        }
        if let Err(e) = ignore_not_found(api.delete_filesystem(&id).await) {
            return Diagnostics::from_error("Failed to delete filesystem", e);
        }
        match wait_for_deletion(ctx, &FILE_SYSTEM, interval, || api.get_filesystem(&id)).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for filesystem deletion", e),
        }
    }
}
