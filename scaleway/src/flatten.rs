//! Conversions between API payloads and state values

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tfplug::{Dynamic, ResourceData};

use crate::api::common::SecretKeyValue;

const RANDOM_SUFFIX_LEN: usize = 8;

/// RFC-3339 timestamp normalised to UTC with second precision
///
/// Unparseable input is kept as is; a missing value becomes empty.
pub fn flatten_time(value: Option<&str>) -> String {
    let Some(raw) = value.filter(|v| !v.is_empty()) else {
        return String::new();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        Err(err) => {
            tracing::warn!("unparseable timestamp {:?}: {}", raw, err);
            raw.to_string()
        }
    }
}

/// Keep the user's order for items the server still has, then append the rest
pub fn ordered_merge(prior: &[String], server: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = prior
        .iter()
        .filter(|item| server.contains(item))
        .cloned()
        .collect();
    for item in server {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    merged
}

/// `tf-<prefix>-<8 random lowercase alphanumerics>`
pub fn random_name(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("tf-{}-{}", prefix, suffix)
}

/// The configured `name`, or a generated one
pub fn name_or_random(data: &ResourceData, prefix: &str) -> String {
    data.get_string_ok("name")
        .unwrap_or_else(|| random_name(prefix))
}

pub fn string_map(values: &HashMap<String, String>) -> Dynamic {
    Dynamic::object(
        values
            .iter()
            .map(|(k, v)| (k.clone(), Dynamic::String(v.clone()))),
    )
}

/// Secret map from state to the API's key/value list
pub fn expand_secrets(data: &ResourceData, path: &str) -> Vec<SecretKeyValue> {
    let mut secrets: Vec<SecretKeyValue> = data
        .get_string_map(path)
        .into_iter()
        .map(|(key, value)| SecretKeyValue {
            key,
            value: Some(value),
            hashed_value: None,
        })
        .collect();
    secrets.sort_by(|a, b| a.key.cmp(&b.key));
    secrets
}

/// Secrets removed since the prior state, sent with a null value to unset them
pub fn removed_secrets(data: &ResourceData, path: &str) -> Vec<SecretKeyValue> {
    let (old, _) = data.get_change(path);
    let current = data.get_string_map(path);
    let mut removed: Vec<SecretKeyValue> = old
        .as_map()
        .map(|m| {
            m.keys()
                .filter(|key| !current.contains_key(*key))
                .map(|key| SecretKeyValue {
                    key: key.clone(),
                    value: None,
                    hashed_value: None,
                })
                .collect()
        })
        .unwrap_or_default();
    removed.sort_by(|a, b| a.key.cmp(&b.key));
    removed
}

/// The API only returns hashes; keep the values known to state for keys it still lists
pub fn flatten_secrets(data: &ResourceData, path: &str, server: &[SecretKeyValue]) -> Dynamic {
    let known = data.get_string_map(path);
    let kept: HashMap<String, String> = server
        .iter()
        .filter_map(|s| known.get(&s.key).map(|v| (s.key.clone(), v.clone())))
        .collect();
    string_map(&kept)
}
