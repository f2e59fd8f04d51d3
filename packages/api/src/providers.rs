//! # Provider roster and scope resolution
//!
//! The dashboard supports a closed set of social integrations. Each one is
//! identified by an application-facing [`ProviderKey`] and is authorised through
//! an underlying OAuth identity provider that the hosted auth service knows by
//! name. Several keys can share one OAuth provider (Instagram and Facebook both
//! go through `facebook`); they are still linked and tracked independently.
//!
//! The whole table is a `const` slice: it is built into the binary, never
//! mutated, and safe to read from any thread.
//!
//! | Key | OAuth provider | Scopes |
//! |-----|----------------|--------|
//! | `instagram` | `facebook` | Pages engagement / posting |
//! | `facebook` | `facebook` | Pages engagement / posting |
//! | `twitter` | `twitter` | Tweet read/write, users |
//! | `linkedin` | `linkedin_oidc` | Lite profile, email, member social |
//! | `youtube` | `google` | YouTube upload |
//!
//! [`scopes_for`] is the string-keyed resolver used at the edges. It fails open:
//! an unknown key resolves to the empty scope string instead of an error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const META_PAGES_SCOPES: &str = "pages_read_engagement,pages_manage_posts,pages_read_user_content";

/// Application-facing identifier of a supported integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKey {
    Instagram,
    Facebook,
    Twitter,
    Linkedin,
    Youtube,
}

/// Static description of one integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSpec {
    pub key: ProviderKey,
    pub oauth_provider: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub scopes: &'static str,
}

/// Every supported integration, in display order.
pub const PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        key: ProviderKey::Instagram,
        oauth_provider: "facebook",
        name: "Instagram",
        description: "Feed, reels, comments, analytics",
        scopes: META_PAGES_SCOPES,
    },
    ProviderSpec {
        key: ProviderKey::Facebook,
        oauth_provider: "facebook",
        name: "Facebook",
        description: "Pages, messages, insights",
        scopes: META_PAGES_SCOPES,
    },
    ProviderSpec {
        key: ProviderKey::Twitter,
        oauth_provider: "twitter",
        name: "Twitter / X",
        description: "Tweets, mentions, DMs",
        scopes: "tweet.read,tweet.write,users.read",
    },
    ProviderSpec {
        key: ProviderKey::Linkedin,
        oauth_provider: "linkedin_oidc",
        name: "LinkedIn",
        description: "Company page posts, analytics",
        scopes: "r_liteprofile,r_emailaddress,w_member_social",
    },
    ProviderSpec {
        key: ProviderKey::Youtube,
        oauth_provider: "google",
        name: "YouTube",
        description: "Uploads, shorts, engagement",
        scopes: "https://www.googleapis.com/auth/youtube.upload",
    },
];

impl ProviderKey {
    pub const ALL: [ProviderKey; 5] = [
        ProviderKey::Instagram,
        ProviderKey::Facebook,
        ProviderKey::Twitter,
        ProviderKey::Linkedin,
        ProviderKey::Youtube,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKey::Instagram => "instagram",
            ProviderKey::Facebook => "facebook",
            ProviderKey::Twitter => "twitter",
            ProviderKey::Linkedin => "linkedin",
            ProviderKey::Youtube => "youtube",
        }
    }

    pub fn spec(&self) -> &'static ProviderSpec {
        // The table covers every variant; the index mirrors declaration order.
        &PROVIDERS[*self as usize]
    }

    /// Name of the OAuth identity provider used for the handshake.
    pub fn oauth_provider(&self) -> &'static str {
        self.spec().oauth_provider
    }

    /// OAuth scope string requested when connecting this provider.
    pub fn scopes(&self) -> &'static str {
        self.spec().scopes
    }

    /// Map an OAuth provider name back to a provider key.
    ///
    /// Prefers a key with the same name (`facebook` → [`ProviderKey::Facebook`]),
    /// otherwise the only key routed through that OAuth provider. Ambiguous or
    /// unknown names yield `None`.
    pub fn for_oauth_provider(oauth_provider: &str) -> Option<ProviderKey> {
        if let Ok(key) = oauth_provider.parse::<ProviderKey>() {
            if key.oauth_provider() == oauth_provider {
                return Some(key);
            }
        }

        let mut matches = PROVIDERS
            .iter()
            .filter(|spec| spec.oauth_provider == oauth_provider);
        match (matches.next(), matches.next()) {
            (Some(spec), None) => Some(spec.key),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a supported provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKey {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

impl TryFrom<String> for ProviderKey {
    type Error = UnknownProvider;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Resolve the OAuth scope string for a provider key.
///
/// Unknown keys resolve to `""` so the flow requests no elevated permissions.
pub fn scopes_for(key: &str) -> &'static str {
    key.parse::<ProviderKey>()
        .map(|key| key.scopes())
        .unwrap_or("")
}
