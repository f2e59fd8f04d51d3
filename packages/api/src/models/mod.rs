//! Data models for the application.

mod account;
mod requests;
mod user;

#[cfg(feature = "server")]
pub use account::ProviderAccount;
pub use account::ProviderAccountInfo;
pub use requests::{
    AuthorizeRequest, AuthorizeResponse, PasswordCredentials, ProviderInfo, RegisterResponse,
};
#[cfg(feature = "server")]
pub use user::{AppMetadata, AuthUser};
pub use user::UserInfo;
