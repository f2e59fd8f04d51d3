//! Hosted auth service configuration.

use reqwest::Url;

use super::AuthError;

/// Path of the OAuth / email-confirmation callback route.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Callback query parameter naming the pending flow.
pub const FLOW_PARAM: &str = "flow";

/// Where the hosted auth service lives and how this site is reached.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL of the hosted auth service, e.g. `https://project.supabase.co`.
    pub url: Url,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    /// Public origin of this site; callback URLs are built from it.
    pub site_url: Url,
}

impl AuthConfig {
    pub fn new(url: &str, anon_key: &str, site_url: &str) -> Result<Self, AuthError> {
        if anon_key.is_empty() {
            return Err(AuthError::Config("anon key not set".to_string()));
        }

        Ok(Self {
            url: Url::parse(url).map_err(|e| AuthError::Config(format!("auth url: {}", e)))?,
            anon_key: anon_key.to_string(),
            site_url: Url::parse(site_url)
                .map_err(|e| AuthError::Config(format!("site url: {}", e)))?,
        })
    }

    /// Absolute URL of an auth service endpoint, e.g. `endpoint("token")`.
    pub fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        let base = self.url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/auth/v1/{}", base, path))
            .map_err(|e| AuthError::Config(e.to_string()))
    }

    /// Callback URL carrying the post-login destination and the id of the
    /// pending flow it completes.
    pub fn callback_url(&self, next: &str, flow_id: &str) -> Result<Url, AuthError> {
        let mut url = self
            .site_url
            .join(CALLBACK_PATH)
            .map_err(|e| AuthError::Config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("next", next)
            .append_pair(FLOW_PARAM, flow_id);
        Ok(url)
    }
}
