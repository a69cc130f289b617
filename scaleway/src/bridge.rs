//! Mapping between a resource schema and flat AWS-style attribute maps
//!
//! The SQS/SNS compatible endpoints take `Attributes: {name: string}`. A
//! mapping table pairs each attribute name with a dotted resource path;
//! nested blocks are addressed through their 0th element
//! (`permissions.0.can_publish`).

use std::collections::{BTreeMap, HashMap};

use tfplug::schema::Attribute;
use tfplug::{AttributePath, AttributeType, Dynamic, DynamicValue, ResourceData, Schema};

/// `(attribute name, resource path)` pairs
pub type AttributeMap = [(&'static str, &'static str)];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("attribute {attribute} maps to unknown path {path}")]
    UnknownPath { attribute: String, path: String },

    #[error("attribute {attribute} at {path} has unsupported type {kind}")]
    UnsupportedType {
        attribute: String,
        path: String,
        kind: String,
    },

    #[error("attribute {attribute}: {value:?} is not a valid {expected}")]
    InvalidValue {
        attribute: String,
        value: String,
        expected: &'static str,
    },
}

/// Writable, user-set values as AWS attributes
///
/// Zero values are treated as unset.
pub fn schema_to_attributes(
    data: &ResourceData,
    schema: &Schema,
    map: &AttributeMap,
) -> Result<BTreeMap<String, String>, BridgeError> {
    let mut attributes = BTreeMap::new();

    for (name, path) in map {
        let attr = resolve(schema, name, path)?;
        if !attr.is_writable() {
            continue;
        }
        let Some(value) = data.get_ok(path) else {
            continue;
        };
        attributes.insert(name.to_string(), to_attribute(name, path, attr, value)?);
    }

    Ok(attributes)
}

/// Writable mapped fields whose planned value differs from the prior one
pub fn changed_attributes(
    data: &ResourceData,
    schema: &Schema,
    map: &AttributeMap,
) -> Result<BTreeMap<String, String>, BridgeError> {
    let mut attributes = BTreeMap::new();

    for (name, path) in map {
        let attr = resolve(schema, name, path)?;
        if !attr.is_writable() || !data.has_change(path) {
            continue;
        }
        let Some(value) = data.get(path).filter(|v| v.is_known() && !v.is_null()) else {
            continue;
        };
        attributes.insert(name.to_string(), to_attribute(name, path, attr, value)?);
    }

    Ok(attributes)
}

/// Parse AWS attributes into a nested value shaped like the schema
///
/// Attributes missing from `attrs` are left out.
pub fn attributes_to_schema(
    attrs: &HashMap<String, String>,
    schema: &Schema,
    map: &AttributeMap,
) -> Result<DynamicValue, BridgeError> {
    let mut values = DynamicValue::empty_object();

    for (name, path) in map {
        let Some(raw) = attrs.get(*name) else {
            continue;
        };
        let attr = resolve(schema, name, path)?;
        let value = from_attribute(name, path, attr, raw)?;
        values
            .set_value(&AttributePath::parse(path), value)
            .map_err(|_| BridgeError::UnknownPath {
                attribute: name.to_string(),
                path: path.to_string(),
            })?;
    }

    Ok(values)
}

/// Copy the top-level entries of a nested value into the working state
pub fn apply_to(data: &mut ResourceData, values: DynamicValue) -> tfplug::Result<()> {
    if let Dynamic::Map(entries) = values.value {
        for (key, value) in entries {
            data.set(&key, value)?;
        }
    }
    Ok(())
}

fn resolve<'a>(schema: &'a Schema, name: &str, path: &str) -> Result<&'a Attribute, BridgeError> {
    schema
        .attribute_at(&AttributePath::parse(path))
        .ok_or_else(|| BridgeError::UnknownPath {
            attribute: name.to_string(),
            path: path.to_string(),
        })
}

fn to_attribute(
    name: &str,
    path: &str,
    attr: &Attribute,
    value: &Dynamic,
) -> Result<String, BridgeError> {
    let invalid = |expected: &'static str| BridgeError::InvalidValue {
        attribute: name.to_string(),
        value: format!("{:?}", value),
        expected,
    };

    match attr.r#type {
        AttributeType::String => value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid("string")),
        AttributeType::Number => {
            let n = value.as_f64().ok_or_else(|| invalid("integer"))?;
            if n.fract() != 0.0 {
                return Err(invalid("integer"));
            }
            Ok(format!("{}", n as i64))
        }
        AttributeType::Bool => value
            .as_bool()
            .map(|b| b.to_string())
            .ok_or_else(|| invalid("bool")),
        ref other => Err(unsupported(name, path, other)),
    }
}

fn from_attribute(
    name: &str,
    path: &str,
    attr: &Attribute,
    raw: &str,
) -> Result<Dynamic, BridgeError> {
    let invalid = |expected: &'static str| BridgeError::InvalidValue {
        attribute: name.to_string(),
        value: raw.to_string(),
        expected,
    };

    match attr.r#type {
        AttributeType::String => Ok(Dynamic::String(raw.to_string())),
        AttributeType::Number => raw
            .parse::<i64>()
            .map(Dynamic::from)
            .map_err(|_| invalid("integer")),
        AttributeType::Bool => raw
            .parse::<bool>()
            .map(Dynamic::Bool)
            .map_err(|_| invalid("bool")),
        ref other => Err(unsupported(name, path, other)),
    }
}

fn unsupported(name: &str, path: &str, kind: &AttributeType) -> BridgeError {
    BridgeError::UnsupportedType {
        attribute: name.to_string(),
        path: path.to_string(),
        kind: format!("{:?}", kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::resource::UpdateResourceRequest;
    use tfplug::schema::NestedType;
    use tfplug::{AttributeBuilder, SchemaBuilder};

    const MAP: &AttributeMap = &[
        ("FifoQueue", "fifo_queue"),
        ("MessageRetentionPeriod", "message_max_age"),
        ("Policy", "policy"),
        ("CanPublish", "permissions.0.can_publish"),
        ("QueueArn", "arn"),
    ];

    fn schema() -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::new("fifo_queue", AttributeType::Bool).optional().build())
            .attribute(
                AttributeBuilder::new("message_max_age", AttributeType::Number)
                    .optional()
                    .build(),
            )
            .attribute(AttributeBuilder::new("policy", AttributeType::String).optional().build())
            .attribute(AttributeBuilder::new("arn", AttributeType::String).computed().build())
            .attribute(
                AttributeBuilder::new("tags", AttributeType::List(Box::new(AttributeType::String)))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::nested(
                    "permissions",
                    NestedType::single_list(vec![AttributeBuilder::new(
                        "can_publish",
                        AttributeType::Bool,
                    )
                    .optional()
                    .build()]),
                )
                .optional()
                .build(),
            )
            .build()
    }

    fn data(entries: Vec<(&str, Dynamic)>) -> ResourceData {
        ResourceData::from_state(DynamicValue::new(Dynamic::object(entries)))
    }

    #[test]
    fn emits_writable_user_set_values() {
        let data = data(vec![
            ("fifo_queue", Dynamic::Bool(true)),
            ("message_max_age", Dynamic::Number(345_600.0)),
            ("policy", Dynamic::from("")),
            ("arn", Dynamic::from("arn:scw:sqs:fr-par:project-x:q")),
            (
                "permissions",
                Dynamic::List(vec![Dynamic::object([("can_publish", Dynamic::Bool(true))])]),
            ),
        ]);

        let attrs = schema_to_attributes(&data, &schema(), MAP).unwrap();

        assert_eq!(
            attrs,
            BTreeMap::from([
                ("CanPublish".to_string(), "true".to_string()),
                ("FifoQueue".to_string(), "true".to_string()),
                ("MessageRetentionPeriod".to_string(), "345600".to_string()),
            ])
        );
    }

    #[test]
    fn round_trip_keeps_writable_values() {
        let written = data(vec![
            ("fifo_queue", Dynamic::Bool(true)),
            ("message_max_age", Dynamic::Number(60.0)),
            ("policy", Dynamic::from("{}")),
            (
                "permissions",
                Dynamic::List(vec![Dynamic::object([("can_publish", Dynamic::Bool(true))])]),
            ),
        ]);

        let attrs = schema_to_attributes(&written, &schema(), MAP).unwrap();
        let back = attributes_to_schema(&attrs.into_iter().collect(), &schema(), MAP).unwrap();

        for path in ["fifo_queue", "message_max_age", "policy", "permissions.0.can_publish"] {
            assert_eq!(
                back.get(&AttributePath::parse(path)),
                written.get(path),
                "{}",
                path
            );
        }
    }

    #[test]
    fn parses_by_declared_type_and_builds_list_wrapper() {
        let attrs = HashMap::from([
            ("FifoQueue".to_string(), "false".to_string()),
            ("MessageRetentionPeriod".to_string(), "120".to_string()),
            ("CanPublish".to_string(), "true".to_string()),
            ("Unmapped".to_string(), "x".to_string()),
        ]);

        let values = attributes_to_schema(&attrs, &schema(), MAP).unwrap();

        assert_eq!(
            values.get(&AttributePath::new("fifo_queue")),
            Some(&Dynamic::Bool(false))
        );
        assert_eq!(
            values.get(&AttributePath::new("message_max_age")),
            Some(&Dynamic::Number(120.0))
        );
        assert_eq!(
            values.get(&AttributePath::new("permissions")),
            Some(&Dynamic::List(vec![Dynamic::object([(
                "can_publish",
                Dynamic::Bool(true)
            )])]))
        );
        assert!(values.get(&AttributePath::new("policy")).is_none());
    }

    #[test]
    fn rejects_bad_values_and_types() {
        let attrs = HashMap::from([("MessageRetentionPeriod".to_string(), "soon".to_string())]);
        assert!(matches!(
            attributes_to_schema(&attrs, &schema(), MAP),
            Err(BridgeError::InvalidValue { expected: "integer", .. })
        ));

        let fractional = data(vec![("message_max_age", Dynamic::Number(1.5))]);
        assert!(schema_to_attributes(&fractional, &schema(), MAP).is_err());

        let tags = data(vec![("tags", Dynamic::from(vec!["a"]))]);
        assert!(matches!(
            schema_to_attributes(&tags, &schema(), &[("Tags", "tags")]),
            Err(BridgeError::UnsupportedType { .. })
        ));

        assert!(matches!(
            schema_to_attributes(&tags, &schema(), &[("Nope", "missing")]),
            Err(BridgeError::UnknownPath { .. })
        ));
    }

    #[test]
    fn changed_attributes_include_zero_values() {
        let prior = Dynamic::object([
            ("fifo_queue", Dynamic::Bool(true)),
            ("message_max_age", Dynamic::Number(60.0)),
            ("policy", Dynamic::from("{}")),
        ]);
        let planned = Dynamic::object([
            ("fifo_queue", Dynamic::Bool(false)),
            ("message_max_age", Dynamic::Number(60.0)),
            ("policy", Dynamic::from("{}")),
        ]);
        let data = ResourceData::for_update(&UpdateResourceRequest {
            type_name: "scaleway_mnq_sqs_queue".to_string(),
            prior_state: DynamicValue::new(prior),
            planned_state: DynamicValue::new(planned.clone()),
            config: DynamicValue::new(planned),
            planned_private: vec![],
            planned_identity: None,
        });

        let changed = changed_attributes(&data, &schema(), MAP).unwrap();

        assert_eq!(
            changed,
            BTreeMap::from([("FifoQueue".to_string(), "false".to_string())])
        );
    }

    #[test]
    fn apply_to_sets_top_level_entries() {
        let mut data = data(vec![("policy", Dynamic::from("old"))]);
        let values = DynamicValue::new(Dynamic::object([
            ("policy", Dynamic::from("new")),
            ("fifo_queue", Dynamic::Bool(true)),
        ]));

        apply_to(&mut data, values).unwrap();

        assert_eq!(data.get_string("policy").as_deref(), Some("new"));
        assert_eq!(data.get_bool("fifo_queue"), Some(true));
    }
}
