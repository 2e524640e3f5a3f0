//! Remote user records and the service that serves them.

use crate::{Connector, InstanceData, RemoteInstance, RemoteModel};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use slumber_core::{SlumberError, SlumberResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// A user record fetched from the remote authentication service.
#[derive(Debug, Clone)]
pub struct RemoteUser {
    /// Proxy of the remote instance the record was read from.
    pub instance: Option<Arc<RemoteInstance>>,
    pub username: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_joined: DateTime<Utc>,
}

impl RemoteUser {
    /// Reads the shadow-user field set out of a loaded remote instance.
    ///
    /// `username` is required; other fields default to false, empty or now.
    pub fn from_instance_data(instance: Option<Arc<RemoteInstance>>, data: &InstanceData) -> SlumberResult<Self> {
        let username = data
            .str_field("username")
            .ok_or_else(|| SlumberError::malformed("remote user has no username"))?
            .to_string();
        let date_joined = match data.str_field("date_joined") {
            Some(text) => parse_timestamp(text)?,
            None => Utc::now(),
        };

        Ok(Self {
            instance,
            username,
            is_active: data.bool_field("is_active").unwrap_or(false),
            is_staff: data.bool_field("is_staff").unwrap_or(false),
            is_superuser: data.bool_field("is_superuser").unwrap_or(false),
            first_name: data.str_field("first_name").unwrap_or_default().to_string(),
            last_name: data.str_field("last_name").unwrap_or_default().to_string(),
            email: data.str_field("email").unwrap_or_default().to_string(),
            date_joined,
        })
    }
}

/// Accepts `2012-05-01 10:30:00[.ffffff]` as well as RFC 3339.
fn parse_timestamp(text: &str) -> SlumberResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| SlumberError::malformed(format!("invalid timestamp {text:?}: {e}")))
}

/// The remote user and permission service.
#[async_trait]
pub trait RemoteUserService: Send + Sync {
    /// Finds the user with this username; `None` when there is none.
    ///
    /// Fails with `ImproperlyConfigured` when the service cannot be reached.
    async fn find_user(&self, username: &str) -> SlumberResult<Option<RemoteUser>>;

    /// Permissions the user has through groups.
    async fn get_group_permissions(&self, user: &RemoteUser) -> SlumberResult<BTreeSet<String>>;

    /// All permissions of the user.
    async fn get_all_permissions(&self, user: &RemoteUser) -> SlumberResult<BTreeSet<String>>;

    /// Checks one `app_label.codename` permission.
    async fn has_perm(&self, user: &RemoteUser, perm: &str) -> SlumberResult<bool>;

    /// Checks whether the user has any permission in an app.
    async fn has_module_perms(&self, user: &RemoteUser, module: &str) -> SlumberResult<bool>;
}

/// [`RemoteUserService`] talking to a Slumber service through the connector.
pub struct HttpUserService {
    connector: Arc<Connector>,
    service: String,
    user_model: String,
}

impl HttpUserService {
    /// Uses the model at `user_model` in the connector service `service`.
    pub fn new(connector: Arc<Connector>, service: impl Into<String>, user_model: impl Into<String>) -> Self {
        Self {
            connector,
            service: service.into(),
            user_model: user_model.into(),
        }
    }

    /// Resolves the user model and checks it answers.
    async fn model(&self) -> SlumberResult<Arc<RemoteModel>> {
        let model = self
            .connector
            .service_model(&self.service, &self.user_model)?
            .ok_or_else(|| {
                SlumberError::improperly_configured(format!(
                    "no '{}' service is configured for remote authentication",
                    self.service
                ))
            })?;

        model.ensure_loaded(&self.connector).await.map_err(|e| {
            warn!(url = %model.url(), error = %e, "Remote user model unavailable");
            SlumberError::improperly_configured(format!(
                "remote user model {} is unavailable: {e}",
                model.url()
            ))
        })?;
        Ok(model)
    }

    async fn operation(&self, operation: &str, args: &[&str]) -> SlumberResult<Value> {
        let model = self.model().await?;
        let url = model.operation_url(operation, args)?;
        debug!(url = %url, "Remote permission query");
        self.connector.client().get_json(&url).await
    }

    async fn permission_set(&self, operation: &str, key: &str, user: &RemoteUser) -> SlumberResult<BTreeSet<String>> {
        let document = self.operation(operation, &[user.username.as_str()]).await?;
        let permissions = document
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| SlumberError::malformed(format!("{operation} returned no '{key}'")))?;
        Ok(permissions
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    async fn flag(&self, operation: &str, key: &str, args: &[&str]) -> SlumberResult<bool> {
        let document = self.operation(operation, args).await?;
        document
            .get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| SlumberError::malformed(format!("{operation} returned no '{key}'")))
    }
}

#[async_trait]
impl RemoteUserService for HttpUserService {
    async fn find_user(&self, username: &str) -> SlumberResult<Option<RemoteUser>> {
        let model = self.model().await?;
        let Some(lookup) = model.get(&self.connector, &[("username", username)]).await? else {
            return Ok(None);
        };
        RemoteUser::from_instance_data(Some(lookup.instance), &lookup.data).map(Some)
    }

    async fn get_group_permissions(&self, user: &RemoteUser) -> SlumberResult<BTreeSet<String>> {
        self.permission_set("get-group-permissions", "group_permissions", user)
            .await
    }

    async fn get_all_permissions(&self, user: &RemoteUser) -> SlumberResult<BTreeSet<String>> {
        self.permission_set("get-permissions", "permissions", user).await
    }

    async fn has_perm(&self, user: &RemoteUser, perm: &str) -> SlumberResult<bool> {
        self.flag("has-permission", "is_allowed", &[user.username.as_str(), perm])
            .await
    }

    async fn has_module_perms(&self, user: &RemoteUser, module: &str) -> SlumberResult<bool> {
        self.flag("module-permissions", "has_module_perms", &[user.username.as_str(), module])
            .await
    }
}
