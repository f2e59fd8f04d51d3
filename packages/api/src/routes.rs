//! # HTTP routes
//!
//! [`router`] builds every route this crate serves. The caller layers a
//! `tower_sessions::SessionManagerLayer` on top; every handler extracts the
//! request's `Session` and wraps it in a [`SessionStore`].
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/auth/callback` | OAuth / email-confirmation callback, always a redirect |
//! | POST | `/api/auth/authorize` | Start an OAuth flow, returns the authorization URL |
//! | GET | `/api/auth/me` | Current user or `null` |
//! | POST | `/api/auth/logout` | Sign out |
//! | POST | `/api/auth/login-password` | Credential sign-in |
//! | POST | `/api/auth/register` | Credential sign-up |
//! | GET | `/api/accounts` | Connected accounts of the current user |
//! | DELETE | `/api/accounts/{id}` | Disconnect an account (idempotent) |
//! | GET | `/api/providers` | Static provider roster |

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::{AuthConfig, AuthService, SessionStore, CALLBACK_PATH, FLOW_PARAM};
use crate::callback::{handle_callback, sanitize_next};
use crate::error::ApiError;
use crate::models::{
    AuthUser, AuthorizeRequest, AuthorizeResponse, PasswordCredentials, ProviderAccountInfo,
    ProviderInfo, RegisterResponse, UserInfo,
};
use crate::providers::{scopes_for, PROVIDERS};
use crate::registry::ProviderAccountRegistry;

/// Shared state of the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub config: Arc<AuthConfig>,
    pub registry: ProviderAccountRegistry,
}

impl AppState {
    pub fn new(
        auth: impl AuthService + 'static,
        config: AuthConfig,
        registry: ProviderAccountRegistry,
    ) -> Self {
        Self {
            auth: Arc::new(auth),
            config: Arc::new(config),
            registry,
        }
    }

    fn sessions(&self, session: Session) -> SessionStore {
        SessionStore::new(session, self.auth.clone(), self.config.clone())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(auth_callback))
        .route("/api/auth/authorize", post(authorize))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/login-password", post(login_password))
        .route("/api/auth/register", post(register))
        .route("/api/accounts", get(list_accounts))
        .route("/api/accounts/{id}", delete(unlink_account))
        .route("/api/providers", get(list_providers))
        .with_state(state)
}

async fn require_user(sessions: &SessionStore) -> Result<AuthUser, ApiError> {
    sessions
        .current_user()
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))
}

/// GET /auth/callback?code=...&flow=...&next=...
async fn auth_callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<HashMap<String, String>>,
) -> Redirect {
    let sessions = state.sessions(session);
    let result = handle_callback(
        &sessions,
        &state.registry,
        params.get("code").map(String::as_str),
        params.get(FLOW_PARAM).map(String::as_str),
        params.get("next").map(String::as_str),
    )
    .await;

    Redirect::to(result.redirect_target())
}

/// POST /api/auth/authorize
async fn authorize(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AuthorizeRequest>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
    let next = sanitize_next(request.next.as_deref());
    let scopes = scopes_for(request.provider.as_str());
    let url = state
        .sessions(session)
        .begin_oauth(request.provider, scopes, &next)
        .await?;

    Ok(Json(AuthorizeResponse {
        url: url.to_string(),
    }))
}

/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Option<UserInfo>>, ApiError> {
    let user = state.sessions(session).current_user().await?;
    Ok(Json(user.map(|u| u.to_info())))
}

/// POST /api/auth/logout
async fn logout(State(state): State<AppState>, session: Session) -> Result<StatusCode, ApiError> {
    state.sessions(session).sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/login-password
async fn login_password(
    State(state): State<AppState>,
    session: Session,
    Json(credentials): Json<PasswordCredentials>,
) -> Result<Json<UserInfo>, ApiError> {
    let email = credentials.email.trim().to_lowercase();

    let user = state
        .sessions(session)
        .sign_in_with_password(&email, &credentials.password)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Unauthorized(_) => {
                ApiError::Unauthorized("Invalid email or password".to_string())
            }
            other => other,
        })?;

    Ok(Json(user))
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(credentials): Json<PasswordCredentials>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let email = credentials.email.trim().to_lowercase();

    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }
    if credentials.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let response = state
        .sessions(session)
        .sign_up(&email, &credentials.password)
        .await?;
    Ok(Json(response))
}

/// GET /api/accounts
async fn list_accounts(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<ProviderAccountInfo>>, ApiError> {
    let user = require_user(&state.sessions(session)).await?;
    let accounts = state.registry.list_for_user(user.id).await?;
    Ok(Json(accounts.iter().map(|a| a.to_info()).collect()))
}

/// DELETE /api/accounts/{id}
async fn unlink_account(
    State(state): State<AppState>,
    session: Session,
    account_id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let user = require_user(&state.sessions(session)).await?;
    let Path(account_id) = account_id?;
    state.registry.unlink_for_user(user.id, account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/providers
async fn list_providers() -> Json<Vec<ProviderInfo>> {
    Json(PROVIDERS.iter().map(ProviderInfo::from).collect())
}
