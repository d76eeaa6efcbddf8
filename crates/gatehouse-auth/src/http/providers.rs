//! Provider listing endpoint.
//!
//! `GET /auth/providers` feeds login UIs. Only configured providers appear;
//! registered-but-unconfigured ones show up in the counters alone. The
//! listing changes only on redeploy, so it is cacheable for a short window.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::AuthState;

/// One provider entry in the listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderListing {
    /// Provider key used in `/auth/{provider}`.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Icon identifier.
    pub icon: String,
    /// Brand color.
    pub color: String,
    /// Always true here; unconfigured providers are filtered out.
    pub configured: bool,
}

/// Response from the provider listing endpoint.
#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    /// Whether the listing succeeded.
    pub success: bool,
    /// Configured providers, in registration order.
    pub providers: Vec<ProviderListing>,
    /// Number of registered providers, configured or not.
    pub total: usize,
    /// Number of providers a login can actually be started with.
    pub available: usize,
    /// Number of providers with complete credentials.
    pub configured: usize,
}

/// GET /auth/providers handler.
pub async fn list_providers(State(state): State<AuthState>) -> Response {
    let registry = state.orchestrator.providers();

    let providers: Vec<ProviderListing> = registry
        .list_configured()
        .into_iter()
        .map(|provider| ProviderListing {
            name: provider.name.clone(),
            display_name: provider.display_name.clone(),
            icon: provider.icon.clone(),
            color: provider.color.clone(),
            configured: true,
        })
        .collect();

    let response = ProvidersResponse {
        success: true,
        total: registry.len(),
        available: providers.len(),
        configured: providers.len(),
        providers,
    };

    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "public, max-age=300")],
        Json(response),
    )
        .into_response()
}
