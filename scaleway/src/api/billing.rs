//! Billing API: consumptions and invoices

use serde::Deserialize;

use crate::api::common::{ApiQueryParams, Money};
use crate::api::{ApiError, Client};

pub struct BillingApi<'a> {
    client: &'a Client,
}

impl<'a> BillingApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /billing/v2beta1/consumptions
    pub async fn list_consumptions(
        &self,
        request: &ListConsumptionsRequest,
    ) -> Result<ListConsumptionsResponse, ApiError> {
        let params = ApiQueryParams::new()
            .add_optional("organization_id", request.organization_id.as_deref())
            .add_optional("project_id", request.project_id.as_deref())
            .add_optional("billing_period", request.billing_period.as_deref())
            .add_optional("category_name", request.category_name.as_deref());
        self.client
            .get_with_params("/billing/v2beta1/consumptions", &params)
            .await
    }

    /// GET /billing/v2beta1/invoices
    pub async fn list_invoices(
        &self,
        request: &ListInvoicesRequest,
    ) -> Result<ListInvoicesResponse, ApiError> {
        let params = ApiQueryParams::new()
            .add_optional("organization_id", request.organization_id.as_deref())
            .add_optional("billing_period_start_after", request.started_after.as_deref())
            .add_optional("billing_period_start_before", request.started_before.as_deref())
            .add_optional("invoice_type", request.invoice_type.as_deref());
        self.client
            .get_with_params("/billing/v2beta1/invoices", &params)
            .await
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListConsumptionsRequest {
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub billing_period: Option<String>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListInvoicesRequest {
    pub organization_id: Option<String>,
    pub started_after: Option<String>,
    pub started_before: Option<String>,
    pub invoice_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListConsumptionsResponse {
    #[serde(default)]
    pub consumptions: Vec<Consumption>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Consumption {
    #[serde(default)]
    pub value: Option<Money>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub resource_name: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub billed_quantity: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListInvoicesResponse {
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub organization_name: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub stop_date: Option<String>,
    #[serde(default)]
    pub billing_period: Option<String>,
    #[serde(default)]
    pub issued_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub total_untaxed: Option<Money>,
    #[serde(default)]
    pub total_taxed: Option<Money>,
    #[serde(default)]
    pub invoice_type: String,
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub seller_name: String,
}
