//! Common types and utilities for the Scaleway API

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error body returned by every Scaleway API
#[derive(Debug, Clone, Default, Deserialize, thiserror::Error)]
#[error("{error_type}: {message}")]
pub struct ScalewayErrorDetails {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub help_message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Key/value pair used for secret environment variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeyValue {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashed_value: Option<String>,
}

/// Amount of money as returned by the billing API
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Money {
    #[serde(default)]
    pub currency_code: String,
    #[serde(default)]
    pub units: i64,
    #[serde(default)]
    pub nanos: i32,
}

impl Money {
    pub fn as_f64(&self) -> f64 {
        self.units as f64 + f64::from(self.nanos) / 1e9
    }
}

/// Durations travel as strings like `"3600s"` or `"3600.5s"`
pub fn parse_duration_seconds(value: &str) -> Option<f64> {
    value.strip_suffix('s')?.parse().ok()
}

pub fn format_duration_seconds(seconds: i64) -> String {
    format!("{}s", seconds)
}

pub fn serialize_duration_opt<S>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(seconds) => serializer.serialize_str(&format_duration_seconds(*seconds)),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_duration_seconds(&s)
            .map(|f| Some(f.round() as i64))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration {:?}", s))),
        None => Ok(None),
    }
}
