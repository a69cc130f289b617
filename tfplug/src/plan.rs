//! Plan computation and schema-driven config validation
//!
//! The host proposes a new state; the provider fills in defaults, marks
//! computed values unknown, runs plan modifiers and reports which
//! attributes force replacement.

use crate::plan_modifier::{values_equal, PlanModifyRequest};
use crate::schema::{Attribute, Schema};
use crate::types::{AttributePath, Diagnostics, Dynamic, DynamicValue};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Diagnostics,
}

/// Compute the planned state for a resource
///
/// A null `proposed` means destroy and is returned untouched. A null
/// `prior` means create.
pub fn plan_resource_change(
    schema: &Schema,
    prior: &DynamicValue,
    proposed: &DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    let mut diagnostics = Diagnostics::new();
    let mut requires_replace = Vec::new();

    if proposed.is_null() {
        return PlannedChange {
            planned_state: proposed.clone(),
            requires_replace,
            diagnostics,
        };
    }

    let creating = prior.is_null();
    let writable_changed = !creating
        && schema.block.attributes.iter().any(|attr| {
            attr.is_writable()
                && config_value(config, attr).is_known()
                && !values_equal(
                    &config_value(config, attr),
                    &prior_value(prior, attr),
                )
        });

    let mut planned: HashMap<String, Dynamic> = HashMap::new();

    for attr in &schema.block.attributes {
        let path = AttributePath::new(&attr.name);
        let configured = config_value(config, attr);
        let state = prior_value(prior, attr);

        let mut value = if !configured.is_null() {
            configured.clone()
        } else if let (Some(default), true) = (&attr.default, attr.optional) {
            default.default_value(&path)
        } else if attr.computed {
            if creating || writable_changed {
                Dynamic::Unknown
            } else {
                state.clone()
            }
        } else {
            Dynamic::Null
        };

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify_plan(PlanModifyRequest {
                state: state.clone(),
                plan: value,
                config: configured.clone(),
                attribute_path: path.clone(),
            });
            value = response.plan_value;
            diagnostics.extend(response.diagnostics);
            if response.requires_replace && !creating {
                tracing::debug!("{} forces replacement", path);
                requires_replace.push(path.clone());
            }
        }

        planned.insert(attr.name.clone(), value);
    }

    PlannedChange {
        planned_state: DynamicValue::new(Dynamic::Map(planned)),
        requires_replace,
        diagnostics,
    }
}

/// Check required/computed flags, nested item counts and attribute
/// validators. Unknown values are skipped.
pub fn validate_config(schema: &Schema, config: &DynamicValue) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    let root = match &config.value {
        Dynamic::Map(map) => map.clone(),
        _ => HashMap::new(),
    };
    validate_attributes(
        &schema.block.attributes,
        &root,
        &AttributePath::root(),
        &mut diagnostics,
    );
    diagnostics
}

fn validate_attributes(
    attributes: &[Attribute],
    values: &HashMap<String, Dynamic>,
    base: &AttributePath,
    diagnostics: &mut Diagnostics,
) {
    for attr in attributes {
        let path = base.clone().attribute(&attr.name);
        let value = values.get(&attr.name).unwrap_or(&Dynamic::Null);

        if value.is_null() {
            if attr.required {
                diagnostics.add_error_at(
                    path.clone(),
                    "Missing required argument",
                    format!("The argument \"{}\" is required, but no definition was found.", path),
                );
            }
            continue;
        }
        if value.is_unknown() {
            continue;
        }
        if !attr.is_writable() {
            diagnostics.add_error_at(
                path.clone(),
                "Invalid configuration",
                format!("\"{}\" is computed and cannot be set", path),
            );
            continue;
        }

        for validator in &attr.validators {
            validator.validate(value, &path, diagnostics);
        }

        let (Some(nested), Some(items)) = (&attr.nested_type, value.as_list()) else {
            continue;
        };
        if let Some(max) = nested.max_items {
            if items.len() > max {
                diagnostics.add_error_at(
                    path.clone(),
                    "Too many list items",
                    format!(
                        "Attribute {} supports {} item maximum, but config has {}",
                        path,
                        max,
                        items.len()
                    ),
                );
            }
        }
        for (idx, item) in items.iter().enumerate() {
            if let Some(fields) = item.as_map() {
                validate_attributes(
                    &nested.attributes,
                    fields,
                    &path.clone().index(idx as i64),
                    diagnostics,
                );
            }
        }
    }
}

fn config_value(config: &DynamicValue, attr: &Attribute) -> Dynamic {
    config
        .get(&AttributePath::new(&attr.name))
        .cloned()
        .unwrap_or(Dynamic::Null)
}

fn prior_value(prior: &DynamicValue, attr: &Attribute) -> Dynamic {
    prior
        .get(&AttributePath::new(&attr.name))
        .cloned()
        .unwrap_or(Dynamic::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::plan_modifier::UseStateForUnknown;
    use crate::schema::{AttributeBuilder, AttributeType, NestedType, SchemaBuilder};
    use crate::validator::NumberRangeValidator;

    fn queue_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("message_max_age", AttributeType::Number)
                    .optional()
                    .default(StaticDefault::number(345_600.0))
                    .validator(NumberRangeValidator::between(60.0, 1_209_600.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::nested(
                    "permissions",
                    NestedType::single_list(vec![AttributeBuilder::new(
                        "can_publish",
                        AttributeType::Bool,
                    )
                    .required()
                    .build()]),
                )
                .optional()
                .build(),
            )
            .build()
    }

    fn object(entries: Vec<(&str, Dynamic)>) -> DynamicValue {
        DynamicValue::new(Dynamic::object(entries))
    }

    #[test]
    fn create_plan_applies_defaults_and_marks_computed_unknown() {
        let schema = queue_schema();
        let config = object(vec![("name", Dynamic::from("q1"))]);

        let plan = plan_resource_change(&schema, &DynamicValue::null(), &config, &config);

        let state = &plan.planned_state;
        assert_eq!(
            state.get(&AttributePath::new("message_max_age")),
            Some(&Dynamic::Number(345_600.0))
        );
        assert_eq!(state.get(&AttributePath::new("id")), Some(&Dynamic::Unknown));
        assert_eq!(state.get(&AttributePath::new("url")), Some(&Dynamic::Unknown));
        assert!(plan.requires_replace.is_empty());
    }

    #[test]
    fn unchanged_config_plans_prior_state() {
        let schema = queue_schema();
        let prior = object(vec![
            ("id", Dynamic::from("fr-par/p/q1")),
            ("name", Dynamic::from("q1")),
            ("message_max_age", Dynamic::Number(345_600.0)),
            ("url", Dynamic::from("https://sqs/q1")),
            ("permissions", Dynamic::Null),
        ]);
        let config = object(vec![("name", Dynamic::from("q1"))]);

        let plan = plan_resource_change(&schema, &prior, &config, &config);

        assert_eq!(plan.planned_state, prior);
        assert!(plan.requires_replace.is_empty());
    }

    #[test]
    fn changed_force_new_attribute_requires_replace() {
        let schema = queue_schema();
        let prior = object(vec![
            ("id", Dynamic::from("fr-par/p/q1")),
            ("name", Dynamic::from("q1")),
            ("url", Dynamic::from("https://sqs/q1")),
        ]);
        let config = object(vec![("name", Dynamic::from("q2"))]);

        let plan = plan_resource_change(&schema, &prior, &config, &config);

        assert_eq!(plan.requires_replace, vec![AttributePath::new("name")]);
        assert_eq!(
            plan.planned_state.get(&AttributePath::new("id")),
            Some(&Dynamic::from("fr-par/p/q1"))
        );
        assert_eq!(
            plan.planned_state.get(&AttributePath::new("url")),
            Some(&Dynamic::Unknown)
        );
    }

    #[test]
    fn destroy_plan_is_returned_untouched() {
        let schema = queue_schema();
        let prior = object(vec![("name", Dynamic::from("q1"))]);

        let plan = plan_resource_change(
            &schema,
            &prior,
            &DynamicValue::null(),
            &DynamicValue::null(),
        );

        assert!(plan.planned_state.is_null());
    }

    #[test]
    fn validate_config_reports_missing_required_and_ranges() {
        let schema = queue_schema();
        let config = object(vec![("message_max_age", Dynamic::Number(10.0))]);

        let diags = validate_config(&schema, &config);

        let summaries: Vec<&str> = diags.errors().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries.len(), 2);
        assert!(summaries.contains(&"Missing required argument"));
        assert!(summaries.iter().any(|s| s.contains("at least 60")));
    }

    #[test]
    fn validate_config_rejects_computed_and_checks_nested_items() {
        let schema = queue_schema();
        let config = object(vec![
            ("name", Dynamic::from("q1")),
            ("url", Dynamic::from("https://sqs/q1")),
            (
                "permissions",
                Dynamic::List(vec![
                    Dynamic::object([("can_publish", Dynamic::Bool(true))]),
                    Dynamic::object([("can_publish", Dynamic::Null)]),
                ]),
            ),
        ]);

        let diags = validate_config(&schema, &config);

        let paths: Vec<String> = diags
            .errors()
            .filter_map(|d| d.attribute.as_ref().map(ToString::to_string))
            .collect();
        assert!(paths.contains(&"url".to_string()));
        assert!(paths.contains(&"permissions".to_string()));
        assert!(paths.contains(&"permissions.1.can_publish".to_string()));
    }

    #[test]
    fn validate_config_skips_unknown_values() {
        let schema = queue_schema();
        let config = object(vec![
            ("name", Dynamic::Unknown),
            ("message_max_age", Dynamic::Unknown),
        ]);

        assert!(validate_config(&schema, &config).is_empty());
    }
}
