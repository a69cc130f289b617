//! Data sources
//!
//! A data source implements [`ScalewayDataSource`]; [`Reader`] adapts it
//! to the tfplug traits the same way resources are wrapped.

pub mod billing_consumptions;
pub mod billing_invoices;

pub use billing_consumptions::ConsumptionsDataSource;
pub use billing_invoices::InvoicesDataSource;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse,
};
use tfplug::{
    AttributePath, Context, DataSource, DataSourceWithConfigure, Diagnostics, DynamicValue, Schema,
};

use crate::provider_data::ScalewayProviderData;
use crate::skeleton::downcast_meta;

const READ_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[async_trait]
pub trait ScalewayDataSource: Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn schema() -> Schema;

    /// Full state of the data source for `config`
    async fn read(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostics>;
}

pub struct Reader<D> {
    source: D,
    meta: Option<Arc<ScalewayProviderData>>,
}

impl<D: ScalewayDataSource> Reader<D> {
    pub fn new(source: D) -> Self {
        Self { source, meta: None }
    }

    pub fn with_meta(source: D, meta: Arc<ScalewayProviderData>) -> Self {
        Self {
            source,
            meta: Some(meta),
        }
    }
}

/// Optional string argument of a data source configuration
pub(crate) fn config_string(config: &DynamicValue, name: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|s| !s.is_empty())
}

pub fn boxed<D: ScalewayDataSource>(source: D, meta: &Arc<ScalewayProviderData>) -> Box<dyn DataSource> {
    Box::new(Reader::with_meta(source, Arc::clone(meta)))
}

#[async_trait]
impl<D: ScalewayDataSource> DataSource for Reader<D> {
    fn type_name(&self) -> &str {
        D::TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: D::schema(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(meta) = self.meta.as_deref() else {
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics: Diagnostics::from_error(
                    "Provider not configured",
                    format!("{} was read before the provider was configured", D::TYPE_NAME),
                ),
            };
        };
        let ctx = ctx.with_timeout(READ_TIMEOUT);
        let meta = meta.scoped(&ctx);

        tracing::debug!("reading {}", D::TYPE_NAME);
        self.source.read(&ctx, &meta, &request.config).await.into()
    }
}

#[async_trait]
impl<D: ScalewayDataSource> DataSourceWithConfigure for Reader<D> {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = Diagnostics::new();
        match downcast_meta(request.provider_data) {
            Some(meta) => self.meta = Some(meta),
            None => diagnostics.add_error(
                "Provider not configured",
                format!("{} expects Scaleway provider data", D::TYPE_NAME),
            ),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}
