//! Attribute validators run against configuration values at plan time
//!
//! Validators never see null or unknown values; the planner skips them.

use crate::types::{AttributePath, Diagnostics, Dynamic};
use regex::Regex;

pub trait Validator: Send + Sync {
    fn description(&self) -> String;
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Diagnostics);
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        format!("string length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Diagnostics) {
        let Some(s) = value.as_str() else {
            return;
        };
        let len = s.chars().count();
        if let Some(min) = self.min {
            if len < min {
                diagnostics.add_error_at(
                    path.clone(),
                    format!("{} must have minimum length of {}", path, min),
                    format!("Got length {}", len),
                );
            }
        }
        if let Some(max) = self.max {
            if len > max {
                diagnostics.add_error_at(
                    path.clone(),
                    format!("{} must have maximum length of {}", path, max),
                    format!("Got length {}", len),
                );
            }
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: &str, description: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            description: description.to_string(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.add_error_at(
                    path.clone(),
                    format!("{} must match {}", path, self.description),
                    format!("Value '{}' does not match pattern", s),
                );
            }
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        format!("number between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Diagnostics) {
        let Some(n) = value.as_f64() else {
            return;
        };
        if let Some(min) = self.min {
            if n < min {
                diagnostics.add_error_at(
                    path.clone(),
                    format!("{} must be at least {}", path, min),
                    format!("Got {}", n),
                );
            }
        }
        if let Some(max) = self.max {
            if n > max {
                diagnostics.add_error_at(
                    path.clone(),
                    format!("{} must be at most {}", path, max),
                    format!("Got {}", n),
                );
            }
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        format!("list length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Diagnostics) {
        let Some(items) = value.as_list() else {
            return;
        };
        if let Some(min) = self.min {
            if items.len() < min {
                diagnostics.add_error_at(
                    path.clone(),
                    format!("{} must have at least {} items", path, min),
                    format!("Got {} items", items.len()),
                );
            }
        }
        if let Some(max) = self.max {
            if items.len() > max {
                diagnostics.add_error_at(
                    path.clone(),
                    format!("{} must have at most {} items", path, max),
                    format!("Got {} items", items.len()),
                );
            }
        }
    }
}

/// Accepts only one of a closed set of strings
pub struct StringOneOfValidator {
    pub allowed: Vec<String>,
}

impl StringOneOfValidator {
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Validator for StringOneOfValidator {
    fn description(&self) -> String {
        format!("one of {}", self.allowed.join(", "))
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_str() {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.add_error_at(
                    path.clone(),
                    format!("{} must be one of: {}", path, self.allowed.join(", ")),
                    format!("Got '{}'", s),
                );
            }
        }
    }
}

/// Accepts only one of a closed set of numbers
pub struct NumberOneOfValidator {
    pub allowed: Vec<f64>,
}

impl Validator for NumberOneOfValidator {
    fn description(&self) -> String {
        format!("one of {:?}", self.allowed)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(n) = value.as_f64() {
            if !self.allowed.iter().any(|a| (a - n).abs() < f64::EPSILON) {
                diagnostics.add_error_at(
                    path.clone(),
                    format!("{} must be one of: {:?}", path, self.allowed),
                    format!("Got {}", n),
                );
            }
        }
    }
}

/// Accepts a bare UUID, optionally prefixed by a locality (`fr-par/<uuid>`)
pub struct UuidValidator {
    pub allow_locality: bool,
}

impl Validator for UuidValidator {
    fn description(&self) -> String {
        "a UUID".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Diagnostics) {
        let Some(s) = value.as_str() else {
            return;
        };
        let candidate = match (self.allow_locality, s.rsplit_once('/')) {
            (true, Some((_, bare))) => bare,
            _ => s,
        };
        if uuid::Uuid::try_parse(candidate).is_err() {
            diagnostics.add_error_at(
                path.clone(),
                format!("{} must be a valid UUID", path),
                format!("Got '{}'", s),
            );
        }
    }
}

/// Wraps an arbitrary check; returning Err(detail) raises an error diagnostic
pub struct FnValidator<F>
where
    F: Fn(&Dynamic) -> Result<(), String> + Send + Sync,
{
    check: F,
    description: String,
}

impl<F> FnValidator<F>
where
    F: Fn(&Dynamic) -> Result<(), String> + Send + Sync,
{
    pub fn new(description: impl Into<String>, check: F) -> Self {
        Self {
            check,
            description: description.into(),
        }
    }
}

impl<F> Validator for FnValidator<F>
where
    F: Fn(&Dynamic) -> Result<(), String> + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Err(detail) = (self.check)(value) {
            diagnostics.add_error_at(
                path.clone(),
                format!("{} is invalid: {}", path, self.description),
                detail,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(validator: &dyn Validator, value: Dynamic) -> Diagnostics {
        let mut diags = Diagnostics::new();
        validator.validate(&value, &AttributePath::new("field"), &mut diags);
        diags
    }

    #[test]
    fn string_length_validator_accepts_valid_length() {
        let validator = StringLengthValidator {
            min: Some(3),
            max: Some(10),
        };

        assert!(run(&validator, Dynamic::from("hello")).is_empty());
    }

    #[test]
    fn string_length_validator_rejects_too_short() {
        let validator = StringLengthValidator {
            min: Some(5),
            max: None,
        };

        let diags = run(&validator, Dynamic::from("hi"));
        assert_eq!(diags.errors().count(), 1);
        assert!(diags.errors().next().unwrap().summary.contains("minimum length"));
    }

    #[test]
    fn string_pattern_validator_rejects_non_matching() {
        let validator = StringPatternValidator::new(r"^[a-zA-Z0-9_-]{1,80}$", "queue name format").unwrap();

        assert!(run(&validator, Dynamic::from("my-queue")).is_empty());

        let diags = run(&validator, Dynamic::from("bad name!"));
        assert_eq!(diags.errors().count(), 1);
        assert!(diags.errors().next().unwrap().summary.contains("queue name format"));
    }

    #[test]
    fn number_range_validator_checks_both_bounds() {
        let validator = NumberRangeValidator::between(60.0, 1_209_600.0);

        assert!(run(&validator, Dynamic::Number(345_600.0)).is_empty());
        assert!(run(&validator, Dynamic::Number(59.0)).has_errors());
        assert!(run(&validator, Dynamic::Number(1_209_601.0)).has_errors());
    }

    #[test]
    fn list_length_validator_rejects_too_many() {
        let validator = ListLengthValidator {
            min: None,
            max: Some(1),
        };

        let list = Dynamic::from(vec!["a", "b"]);
        assert!(run(&validator, list).has_errors());
    }

    #[test]
    fn number_one_of_rejects_paranoia_level_five() {
        let validator = NumberOneOfValidator {
            allowed: vec![1.0, 2.0, 3.0, 4.0],
        };

        assert!(run(&validator, Dynamic::Number(3.0)).is_empty());
        assert!(run(&validator, Dynamic::Number(5.0)).has_errors());
    }

    #[test]
    fn string_one_of_lists_allowed_values() {
        let validator = StringOneOfValidator::new(&["enable", "log_only", "disable"]);

        let diags = run(&validator, Dynamic::from("on"));
        assert!(diags
            .errors()
            .next()
            .unwrap()
            .summary
            .contains("enable, log_only, disable"));
    }

    #[test]
    fn uuid_validator_accepts_locality_prefix_when_allowed() {
        let prefixed = Dynamic::from("fr-par/11111111-2222-3333-4444-555555555555");

        assert!(run(&UuidValidator { allow_locality: true }, prefixed.clone()).is_empty());
        assert!(run(&UuidValidator { allow_locality: false }, prefixed).has_errors());
        assert!(run(&UuidValidator { allow_locality: true }, Dynamic::from("nope")).has_errors());
    }

    #[test]
    fn fn_validator_runs_custom_logic() {
        let validator = FnValidator::new("even number", |value| match value.as_i64() {
            Some(n) if n % 2 != 0 => Err(format!("Got {}, which is odd", n)),
            _ => Ok(()),
        });

        assert!(run(&validator, Dynamic::Number(4.0)).is_empty());
        assert!(run(&validator, Dynamic::Number(3.0)).has_errors());
    }
}
