//! Client-side view of a remote model.

use crate::{Connector, InstanceData, RemoteInstance};
use serde::Deserialize;
use serde_json::Value;
use slumber_core::{FieldMeta, SlumberError, SlumberResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

/// Schema document served at a model's URL.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub module: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldMeta>,
    #[serde(default)]
    pub operations: BTreeMap<String, String>,
}

/// A remote model, identified by the URL of its schema endpoint.
#[derive(Debug)]
pub struct RemoteModel {
    url: Url,
    metadata: OnceCell<ModelMetadata>,
}

impl RemoteModel {
    pub(crate) fn new(url: Url) -> Self {
        Self {
            url,
            metadata: OnceCell::new(),
        }
    }

    /// The schema endpoint.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Fetches the schema document on first call.
    pub async fn ensure_loaded(&self, connector: &Connector) -> SlumberResult<&ModelMetadata> {
        self.metadata
            .get_or_try_init(|| async {
                debug!(url = %self.url, "Loading remote model");
                let document = connector.client().get_json(&self.url).await?;
                serde_json::from_value::<ModelMetadata>(document)
                    .map_err(|e| SlumberError::malformed(format!("{} is not a model: {e}", self.url)))
            })
            .await
    }

    /// URL of an operation below this model, e.g. `has-permission/alice/app.add_x/`.
    ///
    /// Each argument becomes one percent-encoded path segment.
    pub fn operation_url(&self, operation: &str, args: &[&str]) -> SlumberResult<Url> {
        let mut url = self.url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| SlumberError::malformed(format!("{} cannot have a path", self.url)))?;
            segments.pop_if_empty().push(operation).extend(args).push("");
        }
        Ok(url)
    }

    /// URL of the instance with the given primary key.
    pub fn instance_url(&self, pk: &str) -> SlumberResult<Url> {
        self.operation_url("data", &[pk])
    }

    /// Looks up the single instance matching `query` through the `get/`
    /// operation. Returns `None` when the service reports no match.
    ///
    /// The returned proxy is the cached one for its data URL. The returned
    /// data is always decoded from the document this lookup fetched, even when
    /// the proxy was loaded by an earlier call.
    pub async fn get(
        self: &Arc<Self>,
        connector: &Connector,
        query: &[(&str, &str)],
    ) -> SlumberResult<Option<Lookup>> {
        let mut url = self.operation_url("get", &[])?;
        url.query_pairs_mut().extend_pairs(query);

        let document = match connector.client().get_json(&url).await {
            Ok(document) => document,
            Err(SlumberError::NotFound { .. }) => {
                debug!(url = %url, "No remote instance matched");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let identity = document
            .get("identity")
            .and_then(Value::as_str)
            .ok_or_else(|| SlumberError::malformed(format!("{url} returned no 'identity'")))?;
        let data_url = url.join(identity)?;
        let display = document
            .get("display")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let data = InstanceData::from_document(connector, &data_url, &document)?;
        let instance = connector.get_instance(self.clone(), data_url, display);
        if !instance.is_loaded() {
            instance.preload(data.clone());
        }
        Ok(Some(Lookup { instance, data }))
    }
}

/// Result of a `get/` lookup.
#[derive(Debug, Clone)]
pub struct Lookup {
    /// Cached proxy for the matched instance.
    pub instance: Arc<RemoteInstance>,
    /// Fields decoded from the lookup response.
    pub data: InstanceData,
}
