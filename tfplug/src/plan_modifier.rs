use crate::types::{AttributePath, Diagnostics, Dynamic};

#[derive(Debug, Clone)]
pub struct PlanModifyRequest {
    pub state: Dynamic,
    pub plan: Dynamic,
    pub config: Dynamic,
    pub attribute_path: AttributePath,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Diagnostics,
}

impl PlanModifyResponse {
    fn keep(plan_value: Dynamic) -> Self {
        Self {
            plan_value,
            requires_replace: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Trait for modifying terraform plan behavior
///
/// Plan modifiers run after Terraform has generated a plan and can:
/// - Modify the planned value
/// - Mark an attribute as requiring replacement
/// - Add warnings or errors to the plan
pub trait PlanModifier: Send + Sync {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplaceIfChanged;

impl PlanModifier for RequiresReplaceIfChanged {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let requires_replace = !matches!(
            (&request.state, &request.plan),
            (Dynamic::Null, Dynamic::Null) | (Dynamic::Unknown, _) | (_, Dynamic::Unknown)
        ) && !values_equal(&request.state, &request.plan);

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Uses the prior state value when the planned value is unknown
///
/// Keeps computed attributes such as creation timestamps stable across
/// updates instead of showing them as "known after apply".
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = match (&request.plan, &request.state) {
            (Dynamic::Unknown, state) if state.is_known() => request.state.clone(),
            _ => request.plan,
        };
        PlanModifyResponse::keep(plan_value)
    }
}

/// Keeps the prior value when an equivalence function says the planned
/// value means the same thing, e.g. `fr-par/<uuid>` against a bare `<uuid>`
pub struct SuppressDiff {
    equivalent: fn(&Dynamic, &Dynamic) -> bool,
}

impl SuppressDiff {
    pub fn new(equivalent: fn(&Dynamic, &Dynamic) -> bool) -> Self {
        Self { equivalent }
    }
}

impl PlanModifier for SuppressDiff {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let suppressed = request.state.is_known()
            && request.plan.is_known()
            && (self.equivalent)(&request.state, &request.plan);

        if suppressed {
            PlanModifyResponse::keep(request.state)
        } else {
            PlanModifyResponse::keep(request.plan)
        }
    }
}

/// Structural equality with a float tolerance for numbers
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Unknown, Dynamic::Unknown) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifyRequest {
        PlanModifyRequest {
            config: plan.clone(),
            state,
            plan,
            attribute_path: AttributePath::new("field"),
        }
    }

    #[test]
    fn requires_replace_if_changed_does_not_trigger_on_same_value() {
        let response = RequiresReplaceIfChanged
            .modify_plan(request(Dynamic::from("hello"), Dynamic::from("hello")));

        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn requires_replace_if_changed_triggers_on_different_value() {
        let response = RequiresReplaceIfChanged
            .modify_plan(request(Dynamic::from("fr-par"), Dynamic::from("nl-ams")));

        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_if_changed_ignores_unknown_values() {
        let response =
            RequiresReplaceIfChanged.modify_plan(request(Dynamic::Unknown, Dynamic::from("v")));
        assert!(!response.requires_replace);

        let response =
            RequiresReplaceIfChanged.modify_plan(request(Dynamic::from("v"), Dynamic::Unknown));
        assert!(!response.requires_replace);

        let response = RequiresReplaceIfChanged.modify_plan(request(Dynamic::Null, Dynamic::Null));
        assert!(!response.requires_replace);
    }

    #[test]
    fn values_equal_handles_all_types() {
        assert!(values_equal(&Dynamic::Number(42.0), &Dynamic::Number(42.0)));
        assert!(!values_equal(&Dynamic::Number(42.0), &Dynamic::Number(43.0)));
        assert!(!values_equal(&Dynamic::Bool(true), &Dynamic::Bool(false)));

        let list1 = Dynamic::from(vec!["get", "post"]);
        let list2 = Dynamic::from(vec!["post", "get"]);
        assert!(values_equal(&list1, &list1.clone()));
        assert!(!values_equal(&list1, &list2));

        let map1 = HashMap::from([("key".to_string(), Dynamic::from("value"))]);
        let map2 = HashMap::from([("key".to_string(), Dynamic::from("different"))]);
        assert!(values_equal(
            &Dynamic::Map(map1.clone()),
            &Dynamic::Map(map1.clone())
        ));
        assert!(!values_equal(&Dynamic::Map(map1), &Dynamic::Map(map2)));
    }

    #[test]
    fn use_state_for_unknown_preserves_state_when_unknown() {
        let response = UseStateForUnknown.modify_plan(request(
            Dynamic::from("2024-01-01T00:00:00Z"),
            Dynamic::Unknown,
        ));

        assert_eq!(response.plan_value, Dynamic::from("2024-01-01T00:00:00Z"));
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_uses_plan_when_known() {
        let response = UseStateForUnknown
            .modify_plan(request(Dynamic::from("old"), Dynamic::from("new")));

        assert_eq!(response.plan_value, Dynamic::from("new"));
    }

    #[test]
    fn suppress_diff_keeps_state_for_equivalent_values() {
        fn same_suffix(a: &Dynamic, b: &Dynamic) -> bool {
            let strip = |v: &Dynamic| {
                v.as_str()
                    .map(|s| s.rsplit('/').next().unwrap_or(s).to_string())
            };
            strip(a) == strip(b)
        }
        let modifier = SuppressDiff::new(same_suffix);

        let response = modifier.modify_plan(request(
            Dynamic::from("fr-par/11111111-2222-3333-4444-555555555555"),
            Dynamic::from("11111111-2222-3333-4444-555555555555"),
        ));
        assert_eq!(
            response.plan_value,
            Dynamic::from("fr-par/11111111-2222-3333-4444-555555555555")
        );

        let response = modifier.modify_plan(request(
            Dynamic::from("fr-par/11111111-2222-3333-4444-555555555555"),
            Dynamic::from("99999999-2222-3333-4444-555555555555"),
        ));
        assert_eq!(
            response.plan_value,
            Dynamic::from("99999999-2222-3333-4444-555555555555")
        );
    }
}
