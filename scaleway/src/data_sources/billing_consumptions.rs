//! Consumption of an organization or project over a billing period

use async_trait::async_trait;
use tfplug::schema::{Attribute, NestedType};
use tfplug::validator::StringPatternValidator;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, DynamicValue, Schema,
    SchemaBuilder,
};

use super::{config_string, ScalewayDataSource};
use crate::api::billing::{Consumption, ListConsumptionsRequest};
use crate::flatten::flatten_time;
use crate::provider_data::ScalewayProviderData;

const BILLING_PERIOD_PATTERN: &str = r"^\d{4}-(0[1-9]|1[0-2])$";

pub struct ConsumptionsDataSource;

fn computed(name: &str, kind: AttributeType, description: &str) -> Attribute {
    AttributeBuilder::new(name, kind)
        .description(description)
        .computed()
        .build()
}

fn flatten_consumption(consumption: Consumption) -> Dynamic {
    let value = consumption.value.as_ref().map(|money| money.as_f64()).unwrap_or_default();
    let currency = consumption.value.map(|money| money.currency_code).unwrap_or_default();
    Dynamic::object([
        ("value", Dynamic::from(value)),
        ("currency", Dynamic::from(currency)),
        ("product_name", Dynamic::from(consumption.product_name)),
        ("resource_name", Dynamic::from(consumption.resource_name)),
        ("sku", Dynamic::from(consumption.sku)),
        ("project_id", Dynamic::from(consumption.project_id)),
        ("category_name", Dynamic::from(consumption.category_name)),
        ("unit", Dynamic::from(consumption.unit)),
        ("billed_quantity", Dynamic::from(consumption.billed_quantity)),
    ])
}

#[async_trait]
impl ScalewayDataSource for ConsumptionsDataSource {
    const TYPE_NAME: &'static str = "scaleway_billing_consumptions";

    fn schema() -> Schema {
        let mut billing_period = AttributeBuilder::new("billing_period", AttributeType::String)
            .description("The billing period as YYYY-MM, defaults to the current one")
            .optional();
        if let Ok(pattern) = StringPatternValidator::new(BILLING_PERIOD_PATTERN, "a YYYY-MM month") {
            billing_period = billing_period.validator(pattern);
        }

        let consumption = vec![
            computed("value", AttributeType::Number, "Amount consumed"),
            computed("currency", AttributeType::String, "ISO 4217 currency code of the amount"),
            computed("product_name", AttributeType::String, "The product consumed"),
            computed("resource_name", AttributeType::String, "The resource consumed"),
            computed("sku", AttributeType::String, "The stock keeping unit of the product"),
            computed("project_id", AttributeType::String, "The project of the consumption"),
            computed("category_name", AttributeType::String, "The category of the product"),
            computed("unit", AttributeType::String, "Unit of the billed quantity"),
            computed("billed_quantity", AttributeType::String, "Quantity billed"),
        ];

        SchemaBuilder::new()
            .version(0)
            .description("Lists the consumption of an organization")
            .attribute(computed("id", AttributeType::String, "The organization ID"))
            .attribute(
                AttributeBuilder::new("organization_id", AttributeType::String)
                    .description("The organization, defaults to the provider organization")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Restrict to one project")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("category_name", AttributeType::String)
                    .description("Restrict to one product category")
                    .optional()
                    .build(),
            )
            .attribute(billing_period.build())
            .attribute(
                AttributeBuilder::nested("consumptions", NestedType::list(consumption))
                    .description("Consumption lines of the period")
                    .computed()
                    .build(),
            )
            .attribute(computed("updated_at", AttributeType::String, "When consumption was last computed"))
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
        let request = ListConsumptionsRequest {
            organization_id: organization_id.clone(),
            project_id: config_string(config, "project_id"),
            billing_period: config_string(config, "billing_period"),
            category_name: config_string(config, "category_name"),
        };

        let response = meta
            .client
            .billing()
            .list_consumptions(&request)
            .await
            .map_err(|e| Diagnostics::from_error("Failed to list consumptions", e))?;
        tracing::debug!("{} consumption lines", response.total_count);

        let organization_id = organization_id.unwrap_or_default();
        Ok(DynamicValue::new(Dynamic::object([
            ("id", Dynamic::from(organization_id.as_str())),
            ("organization_id", Dynamic::from(organization_id.as_str())),
            ("project_id", Dynamic::from(request.project_id)),
            ("category_name", Dynamic::from(request.category_name)),
            ("billing_period", Dynamic::from(request.billing_period)),
            (
                "consumptions",
                Dynamic::List(response.consumptions.into_iter().map(flatten_consumption).collect()),
            ),
            ("updated_at", Dynamic::from(flatten_time(response.updated_at.as_deref()))),
        ])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::common::Money;
    use regex::Regex;

    #[test]
    fn billing_period_is_a_month() {
        let pattern = Regex::new(BILLING_PERIOD_PATTERN).unwrap();
        assert!(pattern.is_match("2024-05"));
        assert!(!pattern.is_match("2024-13"));
        assert!(!pattern.is_match("2024-5"));
    }

    #[test]
    fn consumption_value_keeps_nanos() {
        let line = flatten_consumption(Consumption {
            value: Some(Money {
                currency_code: "EUR".to_string(),
                units: 3,
                nanos: 500_000_000,
            }),
            product_name: "Functions".to_string(),
            resource_name: String::new(),
            sku: "/functions/calls".to_string(),
            project_id: "p".to_string(),
            category_name: "Serverless".to_string(),
            unit: "call".to_string(),
            billed_quantity: "12".to_string(),
        });
        let fields = line.as_map().unwrap();
        assert_eq!(fields["value"], Dynamic::Number(3.5));
        assert_eq!(fields["currency"], Dynamic::from("EUR"));
    }
}
