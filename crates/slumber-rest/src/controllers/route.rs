//! Resolution of request paths below the applications root.

use crate::state::{AppState, ExposedModel};
use percent_encoding::percent_decode_str;
use slumber_core::{SlumberError, SlumberResult};
use std::borrow::Cow;

/// A resource addressed by a path below the applications root.
#[derive(Clone)]
pub enum Resource<'a> {
    Applications,
    Application { app_label: String },
    Model(&'a ExposedModel),
    Instance { model: &'a ExposedModel, pk: String },
    Get(&'a ExposedModel),
    Permissions { model: &'a ExposedModel, username: String },
    GroupPermissions { model: &'a ExposedModel, username: String },
    HasPermission { model: &'a ExposedModel, username: String, permission: String },
    ModulePermissions { model: &'a ExposedModel, username: String, module: String },
}

impl<'a> Resource<'a> {
    /// Resolves a request path relative to the applications root.
    ///
    /// `raw_path` is still percent-encoded; it is split on `/` before each
    /// segment is decoded, so an encoded `%2F` stays inside its segment. The
    /// longest registered model path that prefixes the segments wins; the
    /// rest name an operation on that model.
    pub fn parse(state: &'a AppState, raw_path: &str) -> SlumberResult<Self> {
        let segments = decode_segments(raw_path)?;
        if segments.is_empty() {
            return Ok(Self::Applications);
        }

        let matched = state
            .registry
            .iter()
            .map(|(model_type, model_path)| (model_type, split(model_path)))
            .filter(|(_, prefix)| {
                prefix.len() <= segments.len()
                    && prefix.iter().zip(&segments).all(|(a, b)| *a == b.as_str())
            })
            .max_by_key(|(_, prefix)| prefix.len());

        if let Some((model_type, prefix)) = matched {
            let model = state
                .exposed(model_type)
                .ok_or_else(|| SlumberError::not_found("model", model_type))?;
            let rest: Vec<&str> = segments[prefix.len()..].iter().map(String::as_str).collect();
            return Self::operation(model, &rest).ok_or_else(|| SlumberError::not_found("resource", raw_path));
        }

        let app_path = segments.join("/");
        state
            .registry
            .iter()
            .map(|(model_type, _)| model_type)
            .find(|model_type| model_type.app_path() == app_path)
            .map(|model_type| Self::Application {
                app_label: model_type.app_label.clone(),
            })
            .ok_or_else(|| SlumberError::not_found("resource", raw_path))
    }

    fn operation(model: &'a ExposedModel, rest: &[&str]) -> Option<Self> {
        let owned = |s: &&str| (*s).to_string();
        Some(match rest {
            [] => Self::Model(model),
            ["data", pk] => Self::Instance { model, pk: owned(pk) },
            ["get"] => Self::Get(model),
            ["get-permissions", username] => Self::Permissions {
                model,
                username: owned(username),
            },
            ["get-group-permissions", username] => Self::GroupPermissions {
                model,
                username: owned(username),
            },
            ["has-permission", username, permission] => Self::HasPermission {
                model,
                username: owned(username),
                permission: owned(permission),
            },
            ["module-permissions", username, module] => Self::ModulePermissions {
                model,
                username: owned(username),
                module: owned(module),
            },
            _ => return None,
        })
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn decode_segments(raw_path: &str) -> SlumberResult<Vec<String>> {
    split(raw_path)
        .into_iter()
        .map(|segment| {
            percent_decode_str(segment)
                .decode_utf8()
                .map(Cow::into_owned)
                .map_err(|_| SlumberError::not_found("resource", raw_path))
        })
        .collect()
}
