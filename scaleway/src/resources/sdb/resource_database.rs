//! Serverless SQL database, scaled between `min_cpu` and `max_cpu` vCPUs

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tfplug::defaults::StaticDefault;
use tfplug::validator::NumberRangeValidator;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostics, Dynamic, DynamicValue,
    IdentitySchema, ResourceData, Schema, SchemaBuilder,
};

use crate::api::sdb::{CreateDatabaseRequest, UpdateDatabaseRequest};
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, project_id_attribute, region_attribute, regional_id, resolve_region,
};
use crate::skeleton::{
    ignore_gone, ignore_not_found, require_project, set_values, wait_failure, ScalewayResource,
    Timeouts,
};
use crate::waiter::{ensure_ready, wait_for, wait_for_deletion, SQL_DATABASE};

const DEFAULT_MIN_CPU: i64 = 0;
const DEFAULT_MAX_CPU: i64 = 15;

pub struct SqlDatabaseResource;

fn cpu(data: &ResourceData, key: &str, default: i64) -> u32 {
    u32::try_from(data.get_i64(key).unwrap_or(default)).unwrap_or_default()
}

#[async_trait]
impl ScalewayResource for SqlDatabaseResource {
    const TYPE_NAME: &'static str = "scaleway_sdb_sql_database";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Serverless SQL database")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the database")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("min_cpu", AttributeType::Number)
                    .description("Minimum number of vCPUs, 0 lets the database sleep")
                    .optional_computed()
                    .validator(NumberRangeValidator::between(0.0, 15.0))
                    .default(StaticDefault::number(DEFAULT_MIN_CPU as f64))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_cpu", AttributeType::Number)
                    .description("Maximum number of vCPUs")
                    .optional_computed()
                    .validator(NumberRangeValidator::between(1.0, 15.0))
                    .default(StaticDefault::number(DEFAULT_MAX_CPU as f64))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("Connection endpoint, without credentials")
                    .computed()
                    .build(),
            )
            .attribute(region_attribute())
            .attribute(project_id_attribute())
            .build()
    }

    fn identity_schema() -> IdentitySchema {
        regional_identity_schema()
    }

    fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
        compose_regional(fields)
    }

    fn timeouts() -> Timeouts {
        Timeouts::uniform(Duration::from_secs(15 * 60))
    }

    fn validate(config: &DynamicValue, diagnostics: &mut Diagnostics) {
        let min = config.get_number(&AttributePath::new("min_cpu")).ok();
        let max = config.get_number(&AttributePath::new("max_cpu")).ok();
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                diagnostics.add_error_at(
                    AttributePath::new("min_cpu"),
                    "Invalid CPU range",
                    format!("min_cpu ({}) is greater than max_cpu ({})", min, max),
                );
            }
        }
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
        let request = CreateDatabaseRequest {
            project_id,
            name: data.get_string("name").unwrap_or_default(),
            cpu_min: cpu(data, "min_cpu", DEFAULT_MIN_CPU),
            cpu_max: cpu(data, "max_cpu", DEFAULT_MAX_CPU),
            from_backup_id: None,
        };

        let api = meta.client.sdb(region);
        let database = match api.create_database(&request).await {
            Ok(database) => database,
            Err(e) => return Diagnostics::from_error("Failed to create SQL database", e),
        };
        persist_regional_identity(data, region, &database.id);

        let interval = SQL_DATABASE.interval(meta.wait_retry_interval);
        match wait_for(ctx, &SQL_DATABASE, interval, || api.get_database(&database.id))
            .await
            .and_then(|database| ensure_ready(&SQL_DATABASE, database))
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("SQL database did not become ready", e),
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
        let api = meta.client.sdb(region);
        let interval = SQL_DATABASE.interval(meta.wait_retry_interval);

        let database = match wait_for(ctx, &SQL_DATABASE, interval, || api.get_database(&id)).await {
            Ok(database) => database,
            Err(e) => return wait_failure(data, "Failed to read SQL database", &e),
        };

        persist_regional_identity(data, region, &database.id);
        set_values(
            data,
            [
                ("name", Dynamic::from(database.name)),
                ("min_cpu", Dynamic::from(database.cpu_min)),
                ("max_cpu", Dynamic::from(database.cpu_max)),
                ("endpoint", Dynamic::from(database.endpoint)),
                ("project_id", Dynamic::from(database.project_id)),
                ("region", Dynamic::from(region.as_str())),
            ],
        )
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
        let api = meta.client.sdb(region);
        let interval = SQL_DATABASE.interval(meta.wait_retry_interval);

        if let Err(e) = wait_for(ctx, &SQL_DATABASE, interval, || api.get_database(&id)).await {
            return Diagnostics::from_error("Failed to wait for SQL database", e);
        }
        if !data.has_changes(&["min_cpu", "max_cpu"]) {
            return Diagnostics::new();
        }

        let mut request = UpdateDatabaseRequest::default();
        if data.has_change("min_cpu") {
            request.cpu_min = Some(cpu(data, "min_cpu", DEFAULT_MIN_CPU));
        }
        if data.has_change("max_cpu") {
            request.cpu_max = Some(cpu(data, "max_cpu", DEFAULT_MAX_CPU));
        }
        if let Err(e) = api.update_database(&id, &request).await {
            return Diagnostics::from_error("Failed to update SQL database", e);
        }
        match wait_for(ctx, &SQL_DATABASE, interval, || api.get_database(&id)).await {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for SQL database", e),
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
        let api = meta.client.sdb(region);
        let interval = SQL_DATABASE.interval(meta.wait_retry_interval);

        let settled = wait_for(ctx, &SQL_DATABASE, interval, || api.get_database(&id)).await;
        if let Err(e) = ignore_gone(settled.map(|_| ())) {
            return Diagnostics::from_error("Failed to wait for SQL database", e);
        }
        if let Err(e) = ignore_not_found(api.delete_database(&id).await) {
            return Diagnostics::from_error("Failed to delete SQL database", e);
        }
        match wait_for_deletion(ctx, &SQL_DATABASE, interval, || api.get_database(&id)).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for SQL database deletion", e),
        }
    }
}
