//! Main application router.

use crate::{
    controllers,
    middleware::{logging_middleware, remote_user_middleware, RemoteUserState},
    state::AppState,
};
use axum::{http::HeaderValue, middleware, routing::get, Json, Router};
use serde::Serialize;
use slumber_config::ServerConfig;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Creates the application router.
///
/// Resource views are mounted below the registry's applications root. When
/// `auth` is given, the remote-user middleware runs in front of them.
pub fn create_router(state: AppState, server_config: &ServerConfig, auth: Option<RemoteUserState>) -> Router {
    let root = state.registry.root().to_string();

    let mut resources = Router::new()
        .route(&root, get(controllers::applications))
        .route(&format!("{root}*path"), get(controllers::resource))
        .with_state(state);

    if let Some(auth) = auth {
        info!(header = %auth.header, "Remote-user authentication enabled");
        resources = resources.layer(middleware::from_fn_with_state(auth, remote_user_middleware));
    }

    let router = Router::new()
        .route("/health", get(health_check))
        .merge(resources)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(logging_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(server_config))
                .layer(TimeoutLayer::new(server_config.request_timeout())),
        );

    info!(root = %root, "Router created");
    router
}

/// Creates a CORS layer based on server configuration.
fn create_cors_layer(server_config: &ServerConfig) -> CorsLayer {
    if !server_config.cors_enabled {
        return CorsLayer::new();
    }
    if server_config.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = server_config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        controllers::{InMemoryModelStore, InMemoryPermissionSource, UserPermissions},
        state::ExposedModel,
    };
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use slumber_connector::{
        InMemoryShadowUserStore, RemoteUser, RemoteUserBackend, RemoteUserService,
    };
    use slumber_core::{
        FieldMeta, FieldType, ModelSchema, ModelType, Record, SlumberError, SlumberResult, TypeRegistry,
    };
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn shop() -> ModelType {
        ModelType::new("slumber_test", "Shop")
    }

    fn pizza() -> ModelType {
        ModelType::new("slumber_test", "Pizza")
    }

    fn user() -> ModelType {
        ModelType::new("django.contrib.auth", "User")
    }

    fn state(debug: bool) -> AppState {
        let mut registry = TypeRegistry::new("/slumber/");
        for model in [shop(), pizza(), user()] {
            registry.register(model.clone(), model.default_path()).unwrap();
        }

        let tony = Arc::new(Record::new(shop(), 1i64, "Tony's").with("name", "Tony's"));
        let pizzas = InMemoryModelStore::new()
            .with(
                Record::new(pizza(), 1i64, "Margherita")
                    .with("name", "Margherita")
                    .with("for_sale", true)
                    .with_object("exclusive_to", tony.clone()),
            )
            .with(
                Record::new(pizza(), 2i64, "Hawaiian")
                    .with("name", "Hawaiian")
                    .with("for_sale", false)
                    .with("exclusive_to", Option::<i64>::None),
            );
        let pizza_schema = ModelSchema::new(pizza())
            .field("id", FieldMeta::value(FieldType::AutoField))
            .field("name", FieldMeta::value(FieldType::char_field()))
            .field("for_sale", FieldMeta::value(FieldType::BooleanField))
            .field("exclusive_to", FieldMeta::object(FieldType::ForeignKey));

        let users = InMemoryModelStore::new().with(
            Record::new(user(), 2i64, "testuser")
                .with("username", "testuser")
                .with("is_active", true),
        );
        let user_schema = ModelSchema::new(user())
            .field("username", FieldMeta::value(FieldType::char_field()))
            .field("is_active", FieldMeta::value(FieldType::BooleanField));
        let permissions = InMemoryPermissionSource::new();
        permissions.insert(
            "testuser",
            UserPermissions::active()
                .with_permission("slumber_test.add_pizza")
                .with_group_permission("slumber_test.change_pizza"),
        );
        permissions.insert(
            "team/ann",
            UserPermissions::active().with_permission("slumber_test/kitchen.add_pizza"),
        );

        AppState::new(
            Arc::new(registry),
            [
                ExposedModel::new(pizza_schema, Arc::new(pizzas)),
                ExposedModel::new(user_schema, Arc::new(users)).with_permissions(Arc::new(permissions)),
            ],
            debug,
        )
        .unwrap()
    }

    fn app() -> Router {
        create_router(state(false), &ServerConfig::default(), None)
    }

    async fn get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn document(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = get(app(), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_applications() {
        let response = get(app(), "/slumber/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/plain");

        let doc = document(response).await;
        assert_eq!(doc["_meta"]["status"], 200);
        assert_eq!(doc["apps"]["slumber_test"], "/slumber/slumber_test/");
        assert_eq!(doc["apps"]["django.contrib.auth"], "/slumber/django/contrib/auth/");
    }

    #[tokio::test]
    async fn test_application_lists_models() {
        let doc = document(get(app(), "/slumber/slumber_test/").await).await;
        assert_eq!(doc["models"]["Pizza"], "/slumber/slumber_test/Pizza/");
        assert_eq!(doc["models"]["Shop"], "/slumber/slumber_test/Shop/");
    }

    #[tokio::test]
    async fn test_model_schema() {
        let doc = document(get(app(), "/slumber/slumber_test/Pizza/").await).await;
        assert_eq!(doc["name"], "Pizza");
        assert_eq!(doc["module"], "slumber_test.models");
        assert_eq!(doc["fields"]["for_sale"]["kind"], "django.db.models.fields.BooleanField");
        assert_eq!(doc["fields"]["exclusive_to"]["kind"], "object");
        assert_eq!(doc["operations"]["data"], "/slumber/slumber_test/Pizza/data/");
        assert!(doc["operations"].get("has-permission").is_none());
    }

    #[tokio::test]
    async fn test_instance_document() {
        let doc = document(get(app(), "/slumber/slumber_test/Pizza/data/1/").await).await;
        assert_eq!(doc["type"], "/slumber/slumber_test/Pizza/");
        assert_eq!(doc["identity"], "/slumber/slumber_test/Pizza/data/1/");
        assert_eq!(doc["display"], "Margherita");
        assert_eq!(doc["fields"]["for_sale"]["data"], true);
        assert_eq!(
            doc["fields"]["exclusive_to"]["data"]["data"],
            "/slumber/slumber_test/Shop/data/1/"
        );
        assert_eq!(doc["fields"]["exclusive_to"]["data"]["display"], "Tony's");
    }

    #[tokio::test]
    async fn test_null_reference_is_null() {
        let doc = document(get(app(), "/slumber/slumber_test/Pizza/data/2/").await).await;
        assert_eq!(doc["fields"]["exclusive_to"]["kind"], "object");
        assert!(doc["fields"]["exclusive_to"]["data"].is_null());
    }

    #[tokio::test]
    async fn test_missing_instance_is_404() {
        let response = get(app(), "/slumber/slumber_test/Pizza/data/99/").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let doc = document(response).await;
        assert_eq!(doc["_meta"]["status"], 404);
        assert_eq!(doc["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_get_lookup() {
        let doc = document(get(app(), "/slumber/django/contrib/auth/User/get/?username=testuser").await).await;
        assert_eq!(doc["identity"], "/slumber/django/contrib/auth/User/data/2/");
        assert_eq!(doc["fields"]["username"]["data"], "testuser");

        let response = get(app(), "/slumber/django/contrib/auth/User/get/?username=nobody").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_permission_operations() {
        let base = "/slumber/django/contrib/auth/User";

        let doc = document(get(app(), &format!("{base}/get-permissions/testuser/")).await).await;
        assert_eq!(doc["permissions"].as_array().unwrap().len(), 2);

        let doc = document(get(app(), &format!("{base}/get-group-permissions/testuser/")).await).await;
        assert_eq!(doc["group_permissions"][0], "slumber_test.change_pizza");

        let doc = document(get(app(), &format!("{base}/has-permission/testuser/slumber_test.add_pizza/")).await).await;
        assert_eq!(doc["is_allowed"], true);

        let doc = document(get(app(), &format!("{base}/module-permissions/testuser/billing/")).await).await;
        assert_eq!(doc["has_module_perms"], false);

        let response = get(app(), &format!("{base}/get-permissions/nobody/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get(app(), "/slumber/slumber_test/Pizza/get-permissions/testuser/").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_encoded_slash_in_operation_argument() {
        let uri = "/slumber/django/contrib/auth/User/has-permission/team%2Fann/slumber_test%2Fkitchen.add_pizza/";
        let response = get(app(), uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(document(response).await["is_allowed"], true);
    }

    #[tokio::test]
    async fn test_debug_output_is_pretty() {
        let router = create_router(state(true), &ServerConfig::default(), None);
        let response = get(router, "/slumber/").await;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("{\n    \""));
    }

    /// Remote user service knowing a single user, or failing every call.
    struct StubUserService {
        user: Option<RemoteUser>,
        broken: bool,
    }

    #[async_trait]
    impl RemoteUserService for StubUserService {
        async fn find_user(&self, username: &str) -> SlumberResult<Option<RemoteUser>> {
            if self.broken {
                return Err(SlumberError::improperly_configured("auth service missing"));
            }
            Ok(self.user.clone().filter(|user| user.username == username))
        }

        async fn get_group_permissions(&self, _user: &RemoteUser) -> SlumberResult<BTreeSet<String>> {
            Ok(BTreeSet::new())
        }

        async fn get_all_permissions(&self, _user: &RemoteUser) -> SlumberResult<BTreeSet<String>> {
            Ok(BTreeSet::new())
        }

        async fn has_perm(&self, _user: &RemoteUser, _perm: &str) -> SlumberResult<bool> {
            Ok(false)
        }

        async fn has_module_perms(&self, _user: &RemoteUser, _module: &str) -> SlumberResult<bool> {
            Ok(false)
        }
    }

    fn authenticated_app(service: StubUserService) -> Router {
        let backend = RemoteUserBackend::new(Arc::new(service), Arc::new(InMemoryShadowUserStore::new()));
        let auth = RemoteUserState::new(backend, "X-FOST-USER").unwrap();
        create_router(state(false), &ServerConfig::default(), Some(auth))
    }

    fn remote_testuser() -> RemoteUser {
        RemoteUser {
            instance: None,
            username: "testuser".to_string(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            date_joined: chrono::Utc::now(),
        }
    }

    async fn get_as(router: Router, uri: &str, username: &str) -> Response {
        router
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header("X-FOST-USER", username)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_remote_user_is_reported() {
        let router = authenticated_app(StubUserService {
            user: Some(remote_testuser()),
            broken: false,
        });
        let doc = document(get_as(router, "/slumber/", "testuser").await).await;
        assert_eq!(doc["_meta"]["username"], "testuser");
    }

    #[tokio::test]
    async fn test_unknown_remote_user_stays_anonymous() {
        let router = authenticated_app(StubUserService {
            user: Some(remote_testuser()),
            broken: false,
        });
        let response = get_as(router, "/slumber/", "mallory").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(document(response).await["_meta"].get("username").is_none());
    }

    #[tokio::test]
    async fn test_misconfigured_backend_aborts_request() {
        let router = authenticated_app(StubUserService {
            user: None,
            broken: true,
        });
        let response = get_as(router, "/slumber/", "testuser").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(document(response).await["error"]["code"], "IMPROPERLY_CONFIGURED");
    }
}
