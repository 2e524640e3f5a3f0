//! Application builder.

use crate::startup::{print_startup_info, shutdown_signal};
use axum::Router;
use slumber_config::AppConfig;
use slumber_connector::{Connector, HttpUserService, InMemoryShadowUserStore, RemoteUserBackend};
use slumber_core::{ModelSchema, ModelType, SlumberError, SlumberResult, TypeRegistry};
use slumber_rest::{
    controllers::{ModelStore, PermissionSource},
    create_router,
    middleware::RemoteUserState,
    AppState, ExposedModel,
};
use std::sync::Arc;
use tracing::info;

/// Builder for a Slumber server.
///
/// Every exposed model is registered under its default path below the
/// configured applications root. Models that are only referenced (served by
/// another application) can be registered with [`SlumberApp::reference`].
pub struct SlumberApp {
    config: AppConfig,
    exposed: Vec<ExposedModel>,
    references: Vec<(ModelType, String)>,
    backend: Option<RemoteUserBackend>,
}

impl SlumberApp {
    /// Creates a builder for the given configuration.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            exposed: Vec::new(),
            references: Vec::new(),
            backend: None,
        }
    }

    /// Serves a model from a store.
    #[must_use]
    pub fn expose(mut self, schema: ModelSchema, store: Arc<dyn ModelStore>) -> Self {
        self.exposed.push(ExposedModel::new(schema, store));
        self
    }

    /// Serves a model together with the user permission operations.
    #[must_use]
    pub fn expose_with_permissions(
        mut self,
        schema: ModelSchema,
        store: Arc<dyn ModelStore>,
        permissions: Arc<dyn PermissionSource>,
    ) -> Self {
        self.exposed
            .push(ExposedModel::new(schema, store).with_permissions(permissions));
        self
    }

    /// Registers a model that fields may refer to without serving it.
    #[must_use]
    pub fn reference(mut self, model_type: ModelType, path: impl Into<String>) -> Self {
        self.references.push((model_type, path.into()));
        self
    }

    /// Uses a custom authentication backend instead of the configured one.
    #[must_use]
    pub fn with_authentication(mut self, backend: RemoteUserBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// The configuration the application runs with.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Builds the registry.
    pub fn registry(&self) -> SlumberResult<TypeRegistry> {
        let mut registry = TypeRegistry::new(self.config.server.root.clone());
        for model in &self.exposed {
            registry.register(model.model_type().clone(), model.schema.default_path())?;
        }
        for (model_type, path) in &self.references {
            registry.register(model_type.clone(), path.clone())?;
        }
        Ok(registry)
    }

    /// Builds the router.
    pub fn build(self) -> SlumberResult<Router> {
        let registry = Arc::new(self.registry()?);
        let state = AppState::new(registry, self.exposed, self.config.server.debug)?;

        let auth = if self.config.authentication.enabled {
            let backend = match self.backend {
                Some(backend) => backend,
                None => default_backend(&self.config)?,
            };
            Some(RemoteUserState::new(backend, &self.config.authentication.header)?)
        } else {
            None
        };

        Ok(create_router(state, &self.config.server, auth))
    }

    /// Binds the configured address and serves until shutdown is signalled.
    pub async fn serve(self) -> SlumberResult<()> {
        let config = self.config.clone();
        let models = self.exposed.len();
        let router = self.build()?;

        let addr = config.server.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| SlumberError::Internal(format!("Failed to bind {addr}: {e}")))?;

        info!("Starting server on http://{}", addr);
        print_startup_info(&config, models);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| SlumberError::Internal(format!("Server error: {e}")))?;

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Authentication backend talking to the configured remote user service,
/// with shadow users kept in memory.
pub fn default_backend(config: &AppConfig) -> SlumberResult<RemoteUserBackend> {
    let connector = Arc::new(Connector::from_config(&config.connector)?);
    let service = HttpUserService::new(
        connector,
        config.authentication.service.clone(),
        config.authentication.user_model.clone(),
    );
    Ok(RemoteUserBackend::new(
        Arc::new(service),
        Arc::new(InMemoryShadowUserStore::new()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use slumber_core::{FieldMeta, FieldType, Record};
    use slumber_rest::controllers::InMemoryModelStore;
    use tower::ServiceExt;

    fn pizza() -> ModelType {
        ModelType::new("slumber_test", "Pizza")
    }

    fn shop() -> ModelType {
        ModelType::new("slumber_test", "Shop")
    }

    fn app(config: AppConfig) -> SlumberApp {
        let schema = ModelSchema::new(pizza()).field("name", FieldMeta::value(FieldType::char_field()));
        let store = InMemoryModelStore::new().with(Record::new(pizza(), 1i64, "Margherita").with("name", "Margherita"));
        SlumberApp::new(config).expose(schema, Arc::new(store))
    }

    async fn get(router: Router, request: Request<Body>) -> Response {
        router.oneshot(request).await.unwrap()
    }

    async fn document(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_registry_uses_default_paths() {
        let registry = app(AppConfig::default())
            .reference(shop(), "shops/Shop/")
            .registry()
            .unwrap();

        assert_eq!(registry.root(), "/slumber/");
        assert_eq!(registry.lookup(&pizza()).unwrap(), "slumber_test/Pizza/");
        assert_eq!(registry.lookup(&shop()).unwrap(), "shops/Shop/");
    }

    #[test]
    fn test_conflicting_reference_fails_build() {
        let result = app(AppConfig::default())
            .reference(pizza(), "elsewhere/Pizza/")
            .build();
        assert!(matches!(result, Err(SlumberError::DuplicateRegistration { .. })));
    }

    #[tokio::test]
    async fn test_built_router_serves_instances() {
        let router = app(AppConfig::default()).build().unwrap();
        let request = Request::builder()
            .uri("/slumber/slumber_test/Pizza/data/1/")
            .body(Body::empty())
            .unwrap();

        let response = get(router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(document(response).await["display"], "Margherita");
    }

    #[tokio::test]
    async fn test_custom_root() {
        let mut config = AppConfig::default();
        config.server.root = "/api/".to_string();
        let router = app(config).build().unwrap();

        let request = Request::builder().uri("/api/").body(Body::empty()).unwrap();
        let doc = document(get(router, request).await).await;
        assert_eq!(doc["apps"]["slumber_test"], "/api/slumber_test/");
    }

    #[tokio::test]
    async fn test_unconfigured_auth_service_is_fatal_per_request() {
        let mut config = AppConfig::default();
        config.authentication.enabled = true;
        let router = app(config).build().unwrap();

        let anonymous = Request::builder().uri("/slumber/").body(Body::empty()).unwrap();
        assert_eq!(get(router.clone(), anonymous).await.status(), StatusCode::OK);

        let asserted = Request::builder()
            .uri("/slumber/")
            .header("X-FOST-USER", "testuser")
            .body(Body::empty())
            .unwrap();
        let response = get(router, asserted).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(document(response).await["error"]["code"], "IMPROPERLY_CONFIGURED");
    }
}
