//! Invoices of an organization

use async_trait::async_trait;
use tfplug::schema::NestedType;
use tfplug::validator::{FnValidator, StringOneOfValidator};
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, DynamicValue, Schema,
    SchemaBuilder,
};

use super::{config_string, ScalewayDataSource};
use crate::api::billing::{Invoice, ListInvoicesRequest};
use crate::api::common::Money;
use crate::flatten::flatten_time;
use crate::provider_data::ScalewayProviderData;

const INVOICE_TYPES: [&str; 2] = ["periodic", "purchase"];

pub struct InvoicesDataSource;

fn rfc3339(value: &Dynamic) -> Result<(), String> {
    match value.as_str() {
        Some(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|_| ())
            .map_err(|e| format!("{:?} is not an RFC 3339 date: {}", s, e)),
        None => Ok(()),
    }
}

fn amount(money: Option<Money>) -> Dynamic {
    Dynamic::from(money.map(|m| m.as_f64()))
}

fn flatten_invoice(invoice: Invoice) -> Dynamic {
    Dynamic::object([
        ("id", Dynamic::from(invoice.id)),
        ("organization_name", Dynamic::from(invoice.organization_name)),
        ("start_date", Dynamic::from(flatten_time(invoice.start_date.as_deref()))),
        ("stop_date", Dynamic::from(flatten_time(invoice.stop_date.as_deref()))),
        ("billing_period", Dynamic::from(flatten_time(invoice.billing_period.as_deref()))),
        ("issued_date", Dynamic::from(flatten_time(invoice.issued_date.as_deref()))),
        ("due_date", Dynamic::from(flatten_time(invoice.due_date.as_deref()))),
        ("total_untaxed", amount(invoice.total_untaxed)),
        ("total_taxed", amount(invoice.total_taxed)),
        ("invoice_type", Dynamic::from(invoice.invoice_type)),
        ("number", Dynamic::from(invoice.number)),
        ("state", Dynamic::from(invoice.state)),
        ("seller_name", Dynamic::from(invoice.seller_name)),
    ])
}

#[async_trait]
impl ScalewayDataSource for InvoicesDataSource {
    const TYPE_NAME: &'static str = "scaleway_billing_invoices";

    fn schema() -> Schema {
        let field = |name: &str, kind: AttributeType, description: &str| {
            AttributeBuilder::new(name, kind)
                .description(description)
                .computed()
                .build()
        };
        let invoice = vec![
            field("id", AttributeType::String, "The ID of the invoice"),
            field("organization_name", AttributeType::String, "The organization billed"),
            field("start_date", AttributeType::String, "Start of the billed period"),
            field("stop_date", AttributeType::String, "End of the billed period"),
            field("billing_period", AttributeType::String, "The billing period"),
            field("issued_date", AttributeType::String, "When the invoice was issued"),
            field("due_date", AttributeType::String, "When payment is due"),
            field("total_untaxed", AttributeType::Number, "Total before taxes"),
            field("total_taxed", AttributeType::Number, "Total including taxes"),
            field("invoice_type", AttributeType::String, "periodic or purchase"),
            field("number", AttributeType::Number, "The invoice number"),
            field("state", AttributeType::String, "Payment state of the invoice"),
            field("seller_name", AttributeType::String, "The issuing entity"),
        ];
        let date = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .validator(FnValidator::new("RFC 3339 date", rfc3339))
                .build()
        };

        SchemaBuilder::new()
            .version(0)
            .description("Lists the invoices of an organization")
            .attribute(field("id", AttributeType::String, "The organization ID"))
            .attribute(
                AttributeBuilder::new("organization_id", AttributeType::String)
                    .description("The organization, defaults to the provider organization")
                    .optional_computed()
                    .build(),
            )
            .attribute(date("started_after", "Only invoices whose period starts after this date"))
            .attribute(date("started_before", "Only invoices whose period starts before this date"))
            .attribute(
                AttributeBuilder::new("invoice_type", AttributeType::String)
                    .description("Restrict to periodic or purchase invoices")
                    .optional()
                    .validator(StringOneOfValidator::new(&INVOICE_TYPES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::nested("invoices", NestedType::list(invoice))
                    .description("The matching invoices")
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn read(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostics> {
        let organization_id = config_string(config, "organization_id")
            .or_else(|| meta.default_organization_id.clone());
        let request = ListInvoicesRequest {
            organization_id: organization_id.clone(),
            started_after: config_string(config, "started_after"),
            started_before: config_string(config, "started_before"),
            invoice_type: config_string(config, "invoice_type"),
        };

        let response = meta
            .client
            .billing()
            .list_invoices(&request)
            .await
            .map_err(|e| Diagnostics::from_error("Failed to list invoices", e))?;

        let organization_id = organization_id.unwrap_or_default();
        Ok(DynamicValue::new(Dynamic::object([
            ("id", Dynamic::from(organization_id.as_str())),
            ("organization_id", Dynamic::from(organization_id.as_str())),
            ("started_after", Dynamic::from(request.started_after)),
            ("started_before", Dynamic::from(request.started_before)),
            ("invoice_type", Dynamic::from(request.invoice_type)),
            (
                "invoices",
                Dynamic::List(response.invoices.into_iter().map(flatten_invoice).collect()),
            ),
        ])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::create_test_client;
    use mockito::{Matcher, Server};
    use tfplug::AttributePath;

    #[test]
    fn dates_must_be_rfc3339() {
        assert!(rfc3339(&Dynamic::from("2024-05-01T00:00:00Z")).is_ok());
        assert!(rfc3339(&Dynamic::from("2024-05-01")).is_err());
    }

    #[tokio::test]
    async fn organization_defaults_to_the_provider() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/billing/v2beta1/invoices")
            .match_query(Matcher::UrlEncoded("organization_id".into(), "org-1".into()))
            .with_status(200)
            .with_body(r#"{"invoices":[{"id":"inv-1","number":7,"state":"paid"}],"total_count":1}"#)
            .create_async()
            .await;

        let mut meta = ScalewayProviderData::new(create_test_client(&server.url()));
        meta.default_organization_id = Some("org-1".to_string());

        let state = InvoicesDataSource
            .read(&Context::new(), &meta, &DynamicValue::new(Dynamic::object::<&str, _>([])))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "org-1");
        let invoices = state.get_list(&AttributePath::new("invoices")).unwrap();
        assert_eq!(invoices[0].as_map().unwrap()["number"], Dynamic::Number(7.0));
    }
}
