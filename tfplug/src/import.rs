//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// Sets the import ID to a specific attribute in state
///
/// Example: ID "fr-par/11111111-..." -> state.id = "fr-par/11111111-..."
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::empty_object();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr_path, request.id),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
        identity: request.identity.clone(),
    });
}

/// Import from the identity side-channel when the host supplies one
///
/// `compose` rebuilds the primary ID from identity fields (e.g. region and
/// id into `fr-par/<uuid>`). Falls back to the plain import ID.
pub fn import_state_from_identity<F>(
    ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
    compose: F,
) where
    F: Fn(&HashMap<String, String>) -> Option<String>,
{
    let Some(identity) = &request.identity else {
        import_state_passthrough_id(ctx, attr_path, request, response);
        return;
    };

    let fields: HashMap<String, String> = match &identity.identity_data.value {
        Dynamic::Map(map) => map
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
        _ => HashMap::new(),
    };

    let Some(id) = compose(&fields) else {
        tracing::warn!("identity of {} lacks the fields to build an ID", request.type_name);
        response.diagnostics.add_error(
            "Failed to read identity value",
            format!("Identity {:?} is missing required fields", fields),
        );
        return;
    };

    tracing::debug!("importing {} {} from its identity", request.type_name, id);
    let mut state = DynamicValue::empty_object();
    if let Err(e) = state.set_string(&attr_path, id) {
        response
            .diagnostics
            .add_error(format!("Failed to copy identity value: {}", e), String::new());
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
        identity: Some(identity.clone()),
    });
}
