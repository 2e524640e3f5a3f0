//! Application state for Axum handlers.

use crate::controllers::{ModelStore, PermissionSource};
use slumber_core::{ModelSchema, ModelType, SlumberError, SlumberResult, TypeRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// A model served by this application.
#[derive(Clone)]
pub struct ExposedModel {
    pub schema: ModelSchema,
    pub store: Arc<dyn ModelStore>,
    pub permissions: Option<Arc<dyn PermissionSource>>,
}

impl ExposedModel {
    pub fn new(schema: ModelSchema, store: Arc<dyn ModelStore>) -> Self {
        Self {
            schema,
            store,
            permissions: None,
        }
    }

    /// Enables the user permission operations on this model.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionSource>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    #[must_use]
    pub fn model_type(&self) -> &ModelType {
        &self.schema.model_type
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TypeRegistry>,
    pub models: Arc<HashMap<ModelType, ExposedModel>>,
    /// Pretty-print responses.
    pub debug: bool,
}

impl AppState {
    /// Creates the state. Every exposed model must be registered.
    pub fn new(
        registry: Arc<TypeRegistry>,
        models: impl IntoIterator<Item = ExposedModel>,
        debug: bool,
    ) -> SlumberResult<Self> {
        let mut exposed = HashMap::new();
        for model in models {
            registry.lookup(model.model_type())?;
            if exposed.contains_key(model.model_type()) {
                return Err(SlumberError::Configuration(format!(
                    "{} is exposed twice",
                    model.model_type()
                )));
            }
            exposed.insert(model.model_type().clone(), model);
        }

        Ok(Self {
            registry,
            models: Arc::new(exposed),
            debug,
        })
    }

    /// The exposed model of a type, if any.
    #[must_use]
    pub fn exposed(&self, model_type: &ModelType) -> Option<&ExposedModel> {
        self.models.get(model_type)
    }
}
