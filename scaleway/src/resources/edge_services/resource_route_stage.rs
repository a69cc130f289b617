//! Edge Services route stage resource
//!
//! Rules are matched top to bottom, so their order in configuration is
//! sent and stored as is.

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::schema::NestedType;
use tfplug::validator::StringOneOfValidator;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostic, Diagnostics, Dynamic,
    IdentitySchema, ResourceData, Schema, SchemaBuilder,
};

use super::{pipeline_id_attribute, stage_reference, stage_values};
use crate::api::edge_services::{PathFilter, RouteRule, RouteStageRequest, RuleHttpMatch};
use crate::api::ApiError;
use crate::identity::{compose_flat, flat_identity_schema, persist_flat_identity};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, timestamp_attribute};
use crate::skeleton::{ignore_not_found, read_failure, set_values, ScalewayResource};

const IDENTITY_KEY: &str = "route_stage_id";

const HTTP_METHODS: &[&str] = &[
    "get", "post", "put", "patch", "delete", "head", "options",
];

pub struct RouteStageResource;

pub(crate) fn expand_rules(data: &ResourceData) -> Vec<RouteRule> {
    let count = data.get_list("rule").len();
    (0..count)
        .map(|i| {
            let prefix = format!("rule.{}", i);
            let http_match = data
                .get(&format!("{}.rule_http_match.0", prefix))
                .is_some()
                .then(|| {
                    let match_prefix = format!("{}.rule_http_match.0", prefix);
                    let path_filter = data
                        .get(&format!("{}.path_filter.0", match_prefix))
                        .is_some()
                        .then(|| PathFilter {
                            path_filter_type: data
                                .get_string(&format!("{}.path_filter.0.path_filter_type", match_prefix))
                                .unwrap_or_default(),
                            value: data
                                .get_string(&format!("{}.path_filter.0.value", match_prefix))
                                .unwrap_or_default(),
                        });
                    RuleHttpMatch {
                        method_filters: data
                            .get_string_list(&format!("{}.method_filters", match_prefix)),
                        path_filter,
                    }
                });
            RouteRule {
                rule_http_match: http_match,
                backend_stage_id: data
                    .get_string(&format!("{}.backend_stage_id", prefix))
                    .unwrap_or_default(),
            }
        })
        .collect()
}

pub(crate) fn flatten_rules(rules: Vec<RouteRule>) -> Dynamic {
    Dynamic::List(
        rules
            .into_iter()
            .map(|rule| {
                let http_match = match rule.rule_http_match {
                    Some(m) => {
                        let path_filter = match m.path_filter {
                            Some(f) => vec![Dynamic::object([
                                ("path_filter_type", Dynamic::from(f.path_filter_type)),
                                ("value", Dynamic::from(f.value)),
                            ])],
                            None => Vec::new(),
                        };
                        vec![Dynamic::object([
                            ("method_filters", Dynamic::from(m.method_filters)),
                            ("path_filter", Dynamic::List(path_filter)),
                        ])]
                    }
                    None => Vec::new(),
                };
                Dynamic::object([
                    ("backend_stage_id", Dynamic::from(rule.backend_stage_id)),
                    ("rule_http_match", Dynamic::List(http_match)),
                ])
            })
            .collect(),
    )
}

async fn set_rules(
    meta: &ScalewayProviderData,
    stage_id: &str,
    data: &ResourceData,
) -> Result<(), ApiError> {
    meta.client
        .edge_services()
        .set_route_rules(stage_id, expand_rules(data))
        .await
        .map(|_| ())
}

#[async_trait]
impl ScalewayResource for RouteStageResource {
    const TYPE_NAME: &'static str = "scaleway_edge_services_route_stage";

    fn schema() -> Schema {
        let path_filter = NestedType::single_list(vec![
            AttributeBuilder::new("path_filter_type", AttributeType::String)
                .description("The type of filter to match the request path against")
                .required()
                .validator(StringOneOfValidator::new(&["regex"]))
                .build(),
            AttributeBuilder::new("value", AttributeType::String)
                .description("The value the path is matched against")
                .required()
                .build(),
        ]);
        let http_match = NestedType::single_list(vec![
            AttributeBuilder::new(
                "method_filters",
                AttributeType::List(Box::new(AttributeType::String)),
            )
            .description("HTTP methods to match")
            .optional_computed()
            .build(),
            AttributeBuilder::nested("path_filter", path_filter)
                .description("Filter on the request path")
                .optional()
                .build(),
        ]);

        SchemaBuilder::new()
            .version(0)
            .description("Manages the route stage of an Edge Services pipeline")
            .attribute(id_attribute())
            .attribute(pipeline_id_attribute())
            .attribute(stage_reference("waf_stage_id", "The WAF stage to forward unmatched requests to"))
            .attribute(
                AttributeBuilder::nested(
                    "rule",
                    NestedType::list(vec![
                        AttributeBuilder::new("backend_stage_id", AttributeType::String)
                            .description("The backend stage matching requests are sent to")
                            .required()
                            .build(),
                        AttributeBuilder::nested("rule_http_match", http_match)
                            .description("The condition for a request to match this rule")
                            .optional()
                            .build(),
                    ]),
                )
                .description("Ordered list of routing rules")
                .optional()
                .build(),
            )
            .attribute(timestamp_attribute("created_at", "The date and time of the creation of the stage"))
            .attribute(timestamp_attribute("updated_at", "The date and time of the last update of the stage"))
            .build()
    }

    fn identity_schema() -> IdentitySchema {
        flat_identity_schema(IDENTITY_KEY)
    }

    fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
        compose_flat(fields, IDENTITY_KEY)
    }

    fn validate(config: &tfplug::DynamicValue, diagnostics: &mut Diagnostics) {
        let rules = config
            .get_list(&AttributePath::new("rule"))
            .unwrap_or_default();
        for (i, rule) in rules.iter().enumerate() {
            let methods = rule
                .as_map()
                .and_then(|r| r.get("rule_http_match"))
                .and_then(Dynamic::as_list)
                .and_then(|m| m.first())
                .and_then(Dynamic::as_map)
                .and_then(|m| m.get("method_filters"))
                .and_then(Dynamic::as_list)
                .unwrap_or_default();
            for method in methods.iter().filter_map(Dynamic::as_str) {
                if !HTTP_METHODS.contains(&method) {
                    diagnostics.add_error_at(
                        AttributePath::parse(&format!(
                            "rule.{}.rule_http_match.0.method_filters",
                            i
                        )),
                        "Invalid HTTP method",
                        format!("{} is not one of {}", method, HTTP_METHODS.join(", ")),
                    );
                }
            }
        }
    }

    async fn create(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let pipeline_id = data.get_string("pipeline_id").unwrap_or_default();
        let request = RouteStageRequest {
            waf_stage_id: data.get_string_ok("waf_stage_id"),
        };

        let stage = match meta
            .client
            .edge_services()
            .create_route_stage(&pipeline_id, &request)
            .await
        {
            Ok(stage) => stage,
            Err(e) => return Diagnostics::from_error("Failed to create route stage", e),
        };
        persist_flat_identity(data, IDENTITY_KEY, &stage.id);

        let mut diagnostics = Diagnostics::new();
        if data.get_list("rule").is_empty() {
            return diagnostics;
        }
        if let Err(e) = set_rules(meta, &stage.id, data).await {
            diagnostics.push(
                Diagnostic::warning("Failed to set route rules", e.to_string())
                    .with_attribute(AttributePath::new("rule")),
            );
        }
        diagnostics
    }

    async fn read(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let api = meta.client.edge_services();
        let stage = match api.get_route_stage(&data.id()).await {
            Ok(stage) => stage,
            Err(e) => return read_failure(data, "Failed to read route stage", &e),
        };
        let rules = match api.list_route_rules(&stage.id).await {
            Ok(rules) => rules,
            Err(e) => return read_failure(data, "Failed to read route rules", &e),
        };

        persist_flat_identity(data, IDENTITY_KEY, &stage.id);
        let mut diagnostics = set_values(
            data,
            stage_values(
                stage.pipeline_id,
                stage.created_at.as_deref(),
                stage.updated_at.as_deref(),
            ),
        );
        diagnostics.extend(set_values(
            data,
            [
                ("waf_stage_id", Dynamic::from(stage.waf_stage_id)),
                ("rule", flatten_rules(rules)),
            ],
        ));
        diagnostics
    }

    async fn update(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let id = data.id();
        if data.has_change("waf_stage_id") {
            let request = RouteStageRequest {
                waf_stage_id: data.get_string_ok("waf_stage_id"),
            };
            if let Err(e) = meta
                .client
                .edge_services()
                .update_route_stage(&id, &request)
                .await
            {
                return Diagnostics::from_error("Failed to update route stage", e);
            }
        }

        if data.has_change("rule") {
            if let Err(e) = set_rules(meta, &id, data).await {
                return Diagnostics::from_error("Failed to set route rules", e);
            }
        }
        Diagnostics::new()
    }

    async fn delete(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let result = meta.client.edge_services().delete_route_stage(&data.id()).await;
        match ignore_not_found(result) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete route stage", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::DynamicValue;

    fn rule(backend: &str, methods: Vec<&str>, regex: Option<&str>) -> RouteRule {
        RouteRule {
            rule_http_match: Some(RuleHttpMatch {
                method_filters: methods.into_iter().map(str::to_string).collect(),
                path_filter: regex.map(|value| PathFilter {
                    path_filter_type: "regex".to_string(),
                    value: value.to_string(),
                }),
            }),
            backend_stage_id: backend.to_string(),
        }
    }

    #[test]
    fn rules_keep_their_order_through_state() {
        let rules = vec![
            rule("b2", vec!["post", "get"], Some("^/api/.*")),
            rule("b1", vec![], None),
            RouteRule {
                rule_http_match: None,
                backend_stage_id: "b3".to_string(),
            },
        ];

        let mut data = ResourceData::from_state(DynamicValue::empty_object());
        data.set("rule", flatten_rules(rules.clone())).unwrap();

        assert_eq!(expand_rules(&data), rules);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let config = DynamicValue::new(Dynamic::object([(
            "rule",
            Dynamic::List(vec![Dynamic::object([
                ("backend_stage_id", Dynamic::from("b1")),
                (
                    "rule_http_match",
                    Dynamic::List(vec![Dynamic::object([(
                        "method_filters",
                        Dynamic::from(vec!["get", "fetch"]),
                    )])]),
                ),
            ])]),
        )]));

        let mut diagnostics = Diagnostics::new();
        RouteStageResource::validate(&config, &mut diagnostics);

        assert_eq!(diagnostics.errors().count(), 1);
    }
}
