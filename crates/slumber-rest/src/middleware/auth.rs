//! Remote-user authentication middleware.

use crate::responses::AppError;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware::Next,
    response::Response,
};
use slumber_connector::{RemoteUserBackend, ShadowUser};
use slumber_core::{SlumberError, SlumberResult};
use tracing::debug;

/// The authenticated user of a request, stored in its extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub ShadowUser);

/// Authentication middleware state.
#[derive(Clone)]
pub struct RemoteUserState {
    pub backend: RemoteUserBackend,
    pub header: HeaderName,
}

impl RemoteUserState {
    /// Creates the state; `header` names the header carrying the username.
    pub fn new(backend: RemoteUserBackend, header: &str) -> SlumberResult<Self> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| SlumberError::Configuration(format!("invalid header name {header:?}: {e}")))?;
        Ok(Self { backend, header })
    }
}

/// Authenticates the username asserted by the trusted upstream.
///
/// Requests without the header, or naming a user the remote service does not
/// know, continue anonymously. Failures to reach the remote service abort
/// the request.
pub async fn remote_user_middleware(
    State(state): State<RemoteUserState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let asserted = request
        .headers()
        .get(&state.header)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let Some(asserted) = asserted else {
        return Ok(next.run(request).await);
    };

    let user = state.backend.authenticate(&asserted).await?;
    let Some(user) = user else {
        debug!(username = %asserted, "Asserted user unknown, continuing anonymously");
        return Ok(next.run(request).await);
    };

    debug!("Authenticated user: {}", user.username);
    let current = CurrentUser(user);
    request.extensions_mut().insert(current.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(current);
    Ok(response)
}
