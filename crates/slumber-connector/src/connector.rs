//! The connector: service directory plus model and instance caches.

use crate::{HttpClient, RemoteInstance, RemoteModel, ReqwestHttpClient};
use parking_lot::RwLock;
use slumber_config::ConnectorConfig;
use slumber_core::{InstanceResolver, SlumberError, SlumberResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

type InstanceKey = (Url, Url);

/// Entry point for talking to remote Slumber services.
///
/// Remote models are cached per schema URL and remote instances per
/// `(model URL, data URL)`, so resolving the same reference twice yields the
/// same proxy. Both caches live as long as the connector.
pub struct Connector {
    client: Arc<dyn HttpClient>,
    services: BTreeMap<String, Url>,
    models: RwLock<HashMap<Url, Arc<RemoteModel>>>,
    instances: RwLock<HashMap<InstanceKey, Arc<RemoteInstance>>>,
}

impl Connector {
    /// Creates a connector over an HTTP client and a service directory.
    pub fn new(client: Arc<dyn HttpClient>, services: impl IntoIterator<Item = (String, Url)>) -> Self {
        Self {
            client,
            services: services.into_iter().collect(),
            models: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Builds a `reqwest`-backed connector from configuration.
    pub fn from_config(config: &ConnectorConfig) -> SlumberResult<Self> {
        let client = ReqwestHttpClient::new(config.timeout())?;
        let mut services = BTreeMap::new();
        for (name, base) in &config.services {
            let mut url = Url::parse(base)
                .map_err(|e| SlumberError::Configuration(format!("service {name}: {e}")))?;
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            services.insert(name.clone(), url);
        }
        info!(services = services.len(), "Connector configured");
        Ok(Self::new(Arc::new(client), services))
    }

    /// The HTTP client collaborator.
    #[must_use]
    pub fn client(&self) -> &dyn HttpClient {
        self.client.as_ref()
    }

    /// Applications root of a named service.
    #[must_use]
    pub fn service_url(&self, service: &str) -> Option<&Url> {
        self.services.get(service)
    }

    /// The model at `path` within a named service, or `None` when the
    /// service is not configured.
    pub fn service_model(&self, service: &str, path: &str) -> SlumberResult<Option<Arc<RemoteModel>>> {
        let Some(base) = self.service_url(service) else {
            return Ok(None);
        };
        let url = base.join(path.trim_start_matches('/'))?;
        Ok(Some(self.get_model(url)))
    }

    /// Returns the cached remote model for a schema URL.
    pub fn get_model(&self, url: Url) -> Arc<RemoteModel> {
        if let Some(model) = self.models.read().get(&url) {
            return model.clone();
        }
        self.models
            .write()
            .entry(url)
            .or_insert_with_key(|url| {
                debug!(url = %url, "New remote model");
                Arc::new(RemoteModel::new(url.clone()))
            })
            .clone()
    }

    /// Returns the cached proxy for `(model, data_url)`, creating an
    /// unloaded one carrying `display` on first sight.
    pub fn get_instance(&self, model: Arc<RemoteModel>, data_url: Url, display: String) -> Arc<RemoteInstance> {
        let key = (model.url().clone(), data_url);
        if let Some(instance) = self.instances.read().get(&key) {
            debug!(url = %key.1, "Remote instance cache hit");
            return instance.clone();
        }
        self.instances
            .write()
            .entry(key)
            .or_insert_with_key(|(_, data_url)| {
                debug!(url = %data_url, "Remote instance cache miss");
                Arc::new(RemoteInstance::new(model, data_url.clone(), display))
            })
            .clone()
    }

    /// Number of cached instance proxies.
    #[must_use]
    pub fn cached_instances(&self) -> usize {
        self.instances.read().len()
    }
}

impl InstanceResolver for Connector {
    type Instance = Arc<RemoteInstance>;

    fn resolve(&self, model_url: Url, data_url: Url, display: String) -> SlumberResult<Self::Instance> {
        let model = self.get_model(model_url);
        Ok(self.get_instance(model, data_url, display))
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("services", &self.services)
            .field("models", &self.models.read().len())
            .field("instances", &self.instances.read().len())
            .finish_non_exhaustive()
    }
}
