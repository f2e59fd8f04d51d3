//! Authentication: hosted auth service client and request-scoped sessions.

#[cfg(feature = "server")]
mod config;
#[cfg(feature = "server")]
mod error;
#[cfg(feature = "server")]
mod gotrue;
#[cfg(feature = "server")]
mod service;
#[cfg(feature = "server")]
mod session;

#[cfg(feature = "server")]
pub use config::{AuthConfig, CALLBACK_PATH, FLOW_PARAM};
#[cfg(feature = "server")]
pub use error::AuthError;
#[cfg(feature = "server")]
pub use gotrue::GoTrueClient;
#[cfg(feature = "server")]
pub use service::{AuthService, AuthSession, OAuthRequest, SignUpResponse};
#[cfg(feature = "server")]
pub use session::{
    EstablishedSession, PendingAuth, SessionData, SessionStore, MAX_PENDING_FLOWS, PENDING_AUTH_KEY,
    SESSION_KEY,
};
