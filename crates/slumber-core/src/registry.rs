//! Type mapping registry.
//!
//! Maps native model types to the remote paths they are served under. The
//! registry is filled while the application starts and is only read while
//! requests are handled, so it is shared behind an `Arc` without locking.

use crate::{ModelType, SlumberError, SlumberResult};
use std::collections::HashMap;
use tracing::{debug, info};

/// Bidirectional index between model types and remote resource paths.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    root: String,
    paths: HashMap<ModelType, String>,
    models: HashMap<String, ModelType>,
}

impl TypeRegistry {
    /// Creates an empty registry under the given applications root.
    ///
    /// The root is the URL prefix every model path is appended to, for
    /// example `/slumber/`. A trailing slash is added when missing.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        let mut root = root.into();
        if !root.ends_with('/') {
            root.push('/');
        }
        Self {
            root,
            paths: HashMap::new(),
            models: HashMap::new(),
        }
    }

    /// Returns the applications root.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Associates a model type with a remote path.
    ///
    /// Registering the same pair again is a no-op. Registering the model at
    /// another path, or another model at the same path, fails.
    pub fn register(&mut self, model_type: ModelType, path: impl Into<String>) -> SlumberResult<()> {
        let path = normalize_path(path.into());

        if let Some(existing) = self.paths.get(&model_type) {
            if *existing == path {
                debug!(model = %model_type, path = %path, "Model already registered");
                return Ok(());
            }
            return Err(SlumberError::DuplicateRegistration {
                model: model_type.to_string(),
                existing: existing.clone(),
                requested: path,
            });
        }

        if let Some(owner) = self.models.get(&path) {
            return Err(SlumberError::DuplicateRegistration {
                model: model_type.to_string(),
                existing: format!("{path} (owned by {owner})"),
                requested: path,
            });
        }

        info!(model = %model_type, path = %path, "Registered remote model");
        self.models.insert(path.clone(), model_type.clone());
        self.paths.insert(model_type, path);
        Ok(())
    }

    /// Returns the path a model type is served under.
    pub fn lookup(&self, model_type: &ModelType) -> SlumberResult<&str> {
        self.paths
            .get(model_type)
            .map(String::as_str)
            .ok_or_else(|| SlumberError::UnmappedType(model_type.to_string()))
    }

    /// Returns the model type served under a path.
    #[must_use]
    pub fn model_for_path(&self, path: &str) -> Option<&ModelType> {
        self.models.get(path)
    }

    /// Returns true when the model type has a path.
    #[must_use]
    pub fn contains(&self, model_type: &ModelType) -> bool {
        self.paths.contains_key(model_type)
    }

    /// Root-prefixed URL of a model's schema endpoint.
    pub fn model_url(&self, model_type: &ModelType) -> SlumberResult<String> {
        Ok(format!("{}{}", self.root, self.lookup(model_type)?))
    }

    /// Root-prefixed URL of an instance's data endpoint.
    pub fn instance_url(&self, model_type: &ModelType, pk: &str) -> SlumberResult<String> {
        Ok(format!("{}data/{}/", self.model_url(model_type)?, pk))
    }

    /// Iterates over registered `(model type, path)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&ModelType, &str)> {
        self.paths.iter().map(|(model, path)| (model, path.as_str()))
    }

    /// Number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn normalize_path(path: String) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}
