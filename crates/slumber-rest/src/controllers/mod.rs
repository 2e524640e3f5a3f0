//! Resource views served below the applications root.

mod permissions;
mod route;
mod store;

pub use permissions::*;
pub use route::*;
pub use store::*;

use crate::{
    accept,
    middleware::CurrentUser,
    responses::{envelope, error_document, AppError, Meta},
    state::{AppState, ExposedModel},
};
use axum::{
    extract::{Query, Request, State},
    http::{header::ACCEPT, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::{json, Map, Value};
use slumber_core::{encode_fields, FieldMeta, ModelInstance, SlumberError, SlumberResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// `GET {root}`
pub async fn applications(State(state): State<AppState>, request: Request) -> Response {
    respond(&state, "", &[], request).await
}

/// `GET {root}*path`
///
/// Routes on the raw request path so that encoded slashes inside an
/// operation argument survive.
pub async fn resource(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
    request: Request,
) -> Response {
    let full = request.uri().path().to_string();
    let path = full.strip_prefix(state.registry.root()).unwrap_or(&full);
    respond(&state, path, &query, request).await
}

async fn respond(state: &AppState, path: &str, query: &[(String, String)], request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let username = parts
        .extensions
        .get::<CurrentUser>()
        .map(|user| user.0.username.clone());

    let document = match view(state, path, query).await {
        Ok(body) => envelope(&Meta::ok(username), body),
        Err(e) => {
            if e.status_code() >= 500 {
                warn!(path = %path, error = %e, "Resource view failed");
            } else {
                debug!(path = %path, error = %e, "Resource view rejected");
            }
            error_document(&e, username)
        }
    };

    accept::default_handler(&parts, &document, accepted_type(&parts), state.debug)
        .unwrap_or_else(|e| AppError(e).into_response())
}

fn accepted_type(parts: &Parts) -> &str {
    parts
        .headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/json")
}

async fn view(state: &AppState, path: &str, query: &[(String, String)]) -> SlumberResult<Map<String, Value>> {
    match Resource::parse(state, path)? {
        Resource::Applications => Ok(applications_view(state)),
        Resource::Application { app_label } => Ok(application_view(state, &app_label)),
        Resource::Model(model) => model_view(state, model),
        Resource::Instance { model, pk } => {
            let instance = model
                .store
                .get(&pk)
                .await?
                .ok_or_else(|| SlumberError::not_found("instance", &pk))?;
            instance_document(state, model, instance.as_ref())
        }
        Resource::Get(model) => {
            let mut matches = model.store.filter(query).await?;
            match matches.len() {
                0 => Err(SlumberError::not_found("instance", describe(query))),
                1 => {
                    let instance = matches.remove(0);
                    instance_document(state, model, instance.as_ref())
                }
                n => Err(SlumberError::internal(format!(
                    "{n} instances of {} match {}",
                    model.model_type(),
                    describe(query)
                ))),
            }
        }
        Resource::Permissions { model, username } => {
            let perms = user_permissions(model, &username).await?;
            Ok(object(json!({ "permissions": perms.all() })))
        }
        Resource::GroupPermissions { model, username } => {
            let perms = user_permissions(model, &username).await?;
            Ok(object(json!({ "group_permissions": perms.group() })))
        }
        Resource::HasPermission {
            model,
            username,
            permission,
        } => {
            let perms = user_permissions(model, &username).await?;
            Ok(object(json!({ "is_allowed": perms.has_perm(&permission) })))
        }
        Resource::ModulePermissions { model, username, module } => {
            let perms = user_permissions(model, &username).await?;
            Ok(object(json!({ "has_module_perms": perms.has_module_perms(&module) })))
        }
    }
}

fn applications_view(state: &AppState) -> Map<String, Value> {
    let apps: BTreeMap<&str, String> = state
        .registry
        .iter()
        .map(|(model_type, _)| {
            (
                model_type.app_label.as_str(),
                format!("{}{}/", state.registry.root(), model_type.app_path()),
            )
        })
        .collect();
    object(json!({ "apps": apps }))
}

fn application_view(state: &AppState, app_label: &str) -> Map<String, Value> {
    let models: BTreeMap<&str, String> = state
        .registry
        .iter()
        .filter(|(model_type, _)| model_type.app_label == app_label)
        .map(|(model_type, path)| {
            (
                model_type.model_name.as_str(),
                format!("{}{path}", state.registry.root()),
            )
        })
        .collect();
    object(json!({ "name": app_label, "models": models }))
}

fn model_view(state: &AppState, model: &ExposedModel) -> SlumberResult<Map<String, Value>> {
    let model_type = model.model_type();
    let model_url = state.registry.model_url(model_type)?;

    let fields: BTreeMap<&str, &FieldMeta> = model
        .schema
        .fields
        .iter()
        .map(|(name, meta)| (name.as_str(), meta))
        .collect();

    let mut operations = BTreeMap::new();
    operations.insert("data", format!("{model_url}data/"));
    operations.insert("get", format!("{model_url}get/"));
    if model.permissions.is_some() {
        for operation in [
            "get-permissions",
            "get-group-permissions",
            "has-permission",
            "module-permissions",
        ] {
            operations.insert(operation, format!("{model_url}{operation}/"));
        }
    }

    Ok(object(json!({
        "name": model_type.model_name,
        "module": format!("{}.models", model_type.app_label),
        "fields": fields,
        "operations": operations,
    })))
}

/// Document describing one instance: its model, its own URL, its label and
/// every schema field.
fn instance_document(
    state: &AppState,
    model: &ExposedModel,
    instance: &dyn ModelInstance,
) -> SlumberResult<Map<String, Value>> {
    let model_type = model.model_type();
    Ok(object(json!({
        "type": state.registry.model_url(model_type)?,
        "identity": state.registry.instance_url(model_type, &instance.pk().to_text())?,
        "display": instance.display(),
        "fields": encode_fields(&state.registry, instance, &model.schema)?,
    })))
}

async fn user_permissions(model: &ExposedModel, username: &str) -> SlumberResult<UserPermissions> {
    let source: &Arc<dyn PermissionSource> = model
        .permissions
        .as_ref()
        .ok_or_else(|| SlumberError::not_found("operation", model.model_type()))?;
    source
        .user_permissions(username)
        .await?
        .ok_or_else(|| SlumberError::not_found("user", username))
}

fn describe(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
