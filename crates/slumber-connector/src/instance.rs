//! Lazily loaded proxies for remote instances.

use crate::{Connector, RemoteModel};
use serde_json::Value;
use slumber_core::{from_json_data, Decoded, SlumberError, SlumberResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

/// A decoded field of a remote instance.
pub type RemoteValue = Decoded<Arc<RemoteInstance>>;

/// Field data of a loaded remote instance.
#[derive(Debug, Clone, Default)]
pub struct InstanceData {
    /// Label reported by the instance document itself.
    pub display: Option<String>,
    /// Decoded fields by name.
    pub fields: BTreeMap<String, RemoteValue>,
}

impl InstanceData {
    /// Decodes an instance document.
    ///
    /// Relative URLs inside the document are resolved against `base_url`.
    pub fn from_document(connector: &Connector, base_url: &Url, document: &Value) -> SlumberResult<Self> {
        let fields = document
            .get("fields")
            .and_then(Value::as_object)
            .ok_or_else(|| SlumberError::malformed(format!("{base_url} has no 'fields' object")))?;

        let mut decoded = BTreeMap::new();
        for (name, field) in fields {
            decoded.insert(name.clone(), from_json_data(connector, base_url, field)?);
        }

        Ok(Self {
            display: document.get("display").and_then(Value::as_str).map(str::to_string),
            fields: decoded,
        })
    }

    /// Returns a decoded field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RemoteValue> {
        self.fields.get(name)
    }

    /// Returns a scalar field as a string slice.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Decoded::as_scalar).and_then(Value::as_str)
    }

    /// Returns a scalar field as a boolean.
    #[must_use]
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Decoded::as_scalar).and_then(Value::as_bool)
    }

    /// Returns a relational field's proxy.
    #[must_use]
    pub fn remote_field(&self, name: &str) -> Option<&Arc<RemoteInstance>> {
        self.get(name).and_then(Decoded::as_remote)
    }
}

/// Observable state of a [`RemoteInstance`].
#[derive(Debug, Clone, Copy)]
pub enum InstanceState<'a> {
    /// Only the reference is known.
    Unloaded { url: &'a Url, display: &'a str },
    /// The data document has been fetched and decoded.
    Loaded { fields: &'a InstanceData },
}

/// Client-side proxy for a remote instance.
///
/// Created unloaded from a remote object reference; the data endpoint is
/// fetched by [`RemoteInstance::ensure_loaded`] at most once.
#[derive(Debug)]
pub struct RemoteInstance {
    model: Arc<RemoteModel>,
    data_url: Url,
    display: String,
    data: OnceCell<InstanceData>,
}

impl RemoteInstance {
    pub(crate) fn new(model: Arc<RemoteModel>, data_url: Url, display: String) -> Self {
        Self {
            model,
            data_url,
            display,
            data: OnceCell::new(),
        }
    }

    /// The instance's model.
    #[must_use]
    pub fn model(&self) -> &Arc<RemoteModel> {
        &self.model
    }

    /// The data endpoint.
    #[must_use]
    pub const fn data_url(&self) -> &Url {
        &self.data_url
    }

    /// The label carried by the reference, available without loading.
    #[must_use]
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Returns true once the data has been fetched.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.data.initialized()
    }

    /// Current state without triggering a fetch.
    #[must_use]
    pub fn state(&self) -> InstanceState<'_> {
        match self.data.get() {
            Some(fields) => InstanceState::Loaded { fields },
            None => InstanceState::Unloaded {
                url: &self.data_url,
                display: &self.display,
            },
        }
    }

    /// Fetches and decodes the data endpoint on first call, then returns the
    /// memoized data. Concurrent callers share one fetch; a failed fetch
    /// leaves the instance unloaded.
    pub async fn ensure_loaded(&self, connector: &Connector) -> SlumberResult<&InstanceData> {
        self.data
            .get_or_try_init(|| async {
                debug!(url = %self.data_url, "Loading remote instance");
                let document = connector.client().get_json(&self.data_url).await?;
                InstanceData::from_document(connector, &self.data_url, &document)
            })
            .await
    }

    /// Stores data obtained elsewhere, such as a `get/` lookup.
    ///
    /// Returns false when the instance was already loaded.
    pub(crate) fn preload(&self, data: InstanceData) -> bool {
        self.data.set(data).is_ok()
    }
}
