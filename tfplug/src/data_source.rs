//! Data sources: read-only lookups evaluated during plan

use crate::context::Context;
use crate::plan::validate_config;
use crate::schema::Schema;
use crate::types::{Diagnostics, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Name under which the provider hands the data source out, e.g. "scaleway_billing_invoices"
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        ctx: Context,
        request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse;

    async fn validate(
        &self,
        ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let schema = self.schema(ctx, DataSourceSchemaRequest).await;
        let mut diagnostics = schema.diagnostics;
        diagnostics.extend(validate_config(&schema.schema, &request.config));
        ValidateDataSourceConfigResponse { diagnostics }
    }

    /// The returned state must carry every attribute of the schema
    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse;
}

pub struct DataSourceMetadataRequest;

pub struct DataSourceMetadataResponse {
    pub type_name: String,
}

pub struct DataSourceSchemaRequest;

pub struct DataSourceSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Diagnostics,
}

pub struct ValidateDataSourceConfigRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ValidateDataSourceConfigResponse {
    pub diagnostics: Diagnostics,
}

pub struct ReadDataSourceRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ReadDataSourceResponse {
    pub state: DynamicValue,
    pub diagnostics: Diagnostics,
}

impl From<Result<DynamicValue, Diagnostics>> for ReadDataSourceResponse {
    fn from(result: Result<DynamicValue, Diagnostics>) -> Self {
        match result {
            Ok(state) => Self {
                state,
                diagnostics: Diagnostics::new(),
            },
            Err(diagnostics) => Self {
                state: DynamicValue::null(),
                diagnostics,
            },
        }
    }
}

/// Receives the provider's configured state right after the data source is built
#[async_trait]
pub trait DataSourceWithConfigure: DataSource {
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse;
}

pub struct ConfigureDataSourceRequest {
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ConfigureDataSourceResponse {
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
    use crate::types::Dynamic;

    struct Echo;

    #[async_trait]
    impl DataSource for Echo {
        fn type_name(&self) -> &str {
            "test_echo"
        }

        async fn schema(
            &self,
            _ctx: Context,
            _request: DataSourceSchemaRequest,
        ) -> DataSourceSchemaResponse {
            DataSourceSchemaResponse {
                schema: SchemaBuilder::new()
                    .attribute(
                        AttributeBuilder::new("text", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .build(),
                diagnostics: Diagnostics::new(),
            }
        }

        async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
            Ok(request.config).into()
        }
    }

    #[tokio::test]
    async fn metadata_defaults_to_the_type_name() {
        let response = Echo.metadata(Context::new(), DataSourceMetadataRequest).await;
        assert_eq!(response.type_name, "test_echo");
    }

    #[tokio::test]
    async fn default_validation_checks_the_schema() {
        let missing = Echo
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: "test_echo".to_string(),
                    config: DynamicValue::empty_object(),
                },
            )
            .await;
        assert!(missing.diagnostics.has_errors());

        let present = Echo
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: "test_echo".to_string(),
                    config: DynamicValue::new(Dynamic::object([("text", Dynamic::from("hi"))])),
                },
            )
            .await;
        assert!(!present.diagnostics.has_errors());
    }

    #[test]
    fn failed_reads_carry_no_state() {
        let response = ReadDataSourceResponse::from(Err(Diagnostics::from_error("boom", "lookup failed")));
        assert!(response.state.is_null());
        assert!(response.diagnostics.has_errors());
    }
}
