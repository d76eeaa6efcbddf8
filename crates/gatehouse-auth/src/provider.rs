//! Identity provider registry and user identity mapping.
//!
//! Providers are registered up front with their endpoint defaults; deployment
//! configuration supplies credentials. A provider with empty credentials stays
//! registered but is filtered out of every "available" listing.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AuthError;

// ============================================================================
// Provider configuration
// ============================================================================

/// Configuration for a single OAuth2 identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// Unique provider key, e.g. `github`.
    pub name: String,

    /// Human-readable name shown in login UIs.
    pub display_name: String,

    /// Authorization endpoint the user agent is redirected to.
    pub authorize_url: String,

    /// Token endpoint the authorization code is exchanged at.
    pub token_url: String,

    /// User-info endpoint queried with the access token.
    pub user_api_url: String,

    /// Space-separated scopes requested at authorization.
    pub scope: String,

    /// OAuth2 client id. Empty means the provider is unconfigured.
    pub client_id: String,

    /// OAuth2 client secret. Empty means the provider is unconfigured.
    pub client_secret: String,

    /// Icon identifier for login UIs.
    pub icon: String,

    /// Brand color for login UIs.
    pub color: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            display_name: String::new(),
            authorize_url: String::new(),
            token_url: String::new(),
            user_api_url: String::new(),
            scope: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            icon: String::new(),
            color: String::new(),
        }
    }
}

impl ProviderConfig {
    /// Creates a new provider configuration with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Sets the authorization endpoint.
    #[must_use]
    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    /// Sets the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the user-info endpoint.
    #[must_use]
    pub fn with_user_api_url(mut self, url: impl Into<String>) -> Self {
        self.user_api_url = url.into();
        self
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the OAuth2 client credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    /// Sets the icon identifier.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Sets the brand color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Returns `true` if both client credentials are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Returns all configuration problems for this provider.
    ///
    /// An empty list means the provider is fully usable.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.client_id.is_empty() {
            errors.push("client_id is empty".to_string());
        }
        if self.client_secret.is_empty() {
            errors.push("client_secret is empty".to_string());
        }

        for (field, value) in [
            ("authorize_url", &self.authorize_url),
            ("token_url", &self.token_url),
            ("user_api_url", &self.user_api_url),
        ] {
            match Url::parse(value) {
                Ok(url) if url.scheme() != "https" => {
                    errors.push(format!("{field} is not an https URL"));
                }
                Ok(_) => {}
                Err(e) => errors.push(format!("{field} is not a valid URL: {e}")),
            }
        }

        errors
    }
}

// ============================================================================
// Provider registry
// ============================================================================

/// Registry of known identity providers.
///
/// Lookup is by provider name; registration order is preserved so listings
/// stay deterministic.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in providers registered.
    ///
    /// GitHub, Google, and Discord are registered with their public endpoint
    /// defaults and empty credentials.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            ProviderConfig::new("github")
                .with_display_name("GitHub")
                .with_authorize_url("https://github.com/login/oauth/authorize")
                .with_token_url("https://github.com/login/oauth/access_token")
                .with_user_api_url("https://api.github.com/user")
                .with_scope("read:user user:email")
                .with_icon("github")
                .with_color("#24292e"),
        );
        registry.register(
            ProviderConfig::new("google")
                .with_display_name("Google")
                .with_authorize_url("https://accounts.google.com/o/oauth2/v2/auth")
                .with_token_url("https://oauth2.googleapis.com/token")
                .with_user_api_url("https://www.googleapis.com/oauth2/v3/userinfo")
                .with_scope("openid email profile")
                .with_icon("google")
                .with_color("#4285f4"),
        );
        registry.register(
            ProviderConfig::new("discord")
                .with_display_name("Discord")
                .with_authorize_url("https://discord.com/api/oauth2/authorize")
                .with_token_url("https://discord.com/api/oauth2/token")
                .with_user_api_url("https://discord.com/api/users/@me")
                .with_scope("identify email")
                .with_icon("discord")
                .with_color("#5865f2"),
        );
        registry
    }

    /// Registers a provider, replacing any existing entry with the same name.
    pub fn register(&mut self, config: ProviderConfig) {
        if let Some(existing) = self
            .providers
            .iter_mut()
            .find(|p| p.name == config.name)
        {
            *existing = config;
        } else {
            self.providers.push(config);
        }
    }

    /// Looks up a provider by name.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownProvider`] if no provider with that name
    /// is registered.
    pub fn get(&self, name: &str) -> Result<&ProviderConfig, AuthError> {
        self.providers
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| AuthError::unknown_provider(name))
    }

    /// Returns the names of all registered providers.
    #[must_use]
    pub fn list_supported(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    /// Returns the providers that have credentials configured.
    #[must_use]
    pub fn list_configured(&self) -> Vec<&ProviderConfig> {
        self.providers.iter().filter(|p| p.is_configured()).collect()
    }

    /// Returns all configuration problems for the named provider.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownProvider`] if no provider with that name
    /// is registered.
    pub fn validate(&self, name: &str) -> Result<Vec<String>, AuthError> {
        Ok(self.get(name)?.validation_errors())
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` if no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

// ============================================================================
// User identity mapping
// ============================================================================

/// Canonical application user derived from a provider profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    /// Stable identity, `<provider>:<external id>`.
    pub id: String,

    /// Email address, empty if the provider did not return one.
    pub email: String,

    /// Display name, empty if the provider did not return one.
    pub display_name: String,

    /// Avatar URL, empty if the provider did not return one.
    pub avatar_url: String,

    /// Provider this identity came from.
    pub provider: String,
}

impl AppUser {
    /// Maps a raw provider profile to a canonical user.
    ///
    /// The mapping is total: every field falls back to an empty string when
    /// the provider omits it, so callers never see partial users.
    #[must_use]
    pub fn from_provider_profile(provider: &str, raw: &serde_json::Value) -> Self {
        match provider {
            "github" => {
                let external_id = json_str(raw, "id");
                let display_name = match json_str(raw, "name") {
                    name if name.is_empty() => json_str(raw, "login"),
                    name => name,
                };
                Self {
                    id: format!("{provider}:{external_id}"),
                    email: json_str(raw, "email"),
                    display_name,
                    avatar_url: json_str(raw, "avatar_url"),
                    provider: provider.to_string(),
                }
            }
            "google" => {
                let external_id = json_str(raw, "sub");
                Self {
                    id: format!("{provider}:{external_id}"),
                    email: json_str(raw, "email"),
                    display_name: json_str(raw, "name"),
                    avatar_url: json_str(raw, "picture"),
                    provider: provider.to_string(),
                }
            }
            "discord" => {
                let external_id = json_str(raw, "id");
                let display_name = match json_str(raw, "global_name") {
                    name if name.is_empty() => json_str(raw, "username"),
                    name => name,
                };
                // Discord returns an avatar hash, not a URL
                let avatar_hash = json_str(raw, "avatar");
                let avatar_url = if external_id.is_empty() || avatar_hash.is_empty() {
                    String::new()
                } else {
                    format!("https://cdn.discordapp.com/avatars/{external_id}/{avatar_hash}.png")
                };
                Self {
                    id: format!("{provider}:{external_id}"),
                    email: json_str(raw, "email"),
                    display_name,
                    avatar_url,
                    provider: provider.to_string(),
                }
            }
            _ => {
                let external_id = match json_str(raw, "id") {
                    id if id.is_empty() => json_str(raw, "sub"),
                    id => id,
                };
                let display_name = ["name", "login", "username"]
                    .iter()
                    .map(|key| json_str(raw, key))
                    .find(|v| !v.is_empty())
                    .unwrap_or_default();
                let avatar_url = match json_str(raw, "avatar_url") {
                    url if url.is_empty() => json_str(raw, "picture"),
                    url => url,
                };
                Self {
                    id: format!("{provider}:{external_id}"),
                    email: json_str(raw, "email"),
                    display_name,
                    avatar_url,
                    provider: provider.to_string(),
                }
            }
        }
    }
}

/// Extracts a JSON field as a string, accepting both string and numeric
/// values. Absent, null, or other-typed fields map to an empty string.
fn json_str(raw: &serde_json::Value, key: &str) -> String {
    match raw.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
