//! Cookie construction and parsing for the auth endpoints.
//!
//! Two families live here: the three short-lived transient cookies that
//! round-trip login state through the provider redirect, and the long-lived
//! auth session cookie whose attributes come from [`CookieConfig`].
//!
//! Values pass through the jar percent-encoded, so redirect targets such as
//! `/dashboard` travel as `oauth_redirect=%2Fdashboard` and come back
//! decoded.

use std::time::Duration;

use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};

use crate::config::CookieConfig;
use crate::oauth::{StateToken, TransientLoginState};

/// CSRF state token carried across the provider round trip.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Provider the round trip was started for.
pub const OAUTH_PROVIDER_COOKIE: &str = "oauth_provider";

/// Post-login redirect target.
pub const OAUTH_REDIRECT_COOKIE: &str = "oauth_redirect";

/// Challenge token for a login held on a pending MFA factor.
pub const MFA_CHALLENGE_COOKIE: &str = "gatehouse_mfa";

/// Builds one transient login-state cookie.
///
/// All three share the same attributes: `HttpOnly; Path=/; SameSite=Lax`
/// plus a short `Max-Age` so abandoned flows leave nothing behind.
fn transient_cookie(
    name: &'static str,
    value: String,
    ttl: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(ttl.as_secs() as i64))
        .build()
}

/// Adds the three transient login-state cookies to the jar.
#[must_use]
pub fn add_transient_cookies(
    jar: CookieJar,
    transient: &TransientLoginState,
    ttl: Duration,
    secure: bool,
) -> CookieJar {
    jar.add(transient_cookie(
        OAUTH_STATE_COOKIE,
        transient.state.as_str().to_string(),
        ttl,
        secure,
    ))
    .add(transient_cookie(
        OAUTH_PROVIDER_COOKIE,
        transient.provider.clone(),
        ttl,
        secure,
    ))
    .add(transient_cookie(
        OAUTH_REDIRECT_COOKIE,
        transient.redirect.clone(),
        ttl,
        secure,
    ))
}

/// Clears the three transient login-state cookies.
///
/// The removal cookies must carry the same `Path` as the originals or user
/// agents will keep the stale copies.
#[must_use]
pub fn clear_transient_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((OAUTH_STATE_COOKIE, "")).path("/").build())
        .remove(Cookie::build((OAUTH_PROVIDER_COOKIE, "")).path("/").build())
        .remove(Cookie::build((OAUTH_REDIRECT_COOKIE, "")).path("/").build())
}

/// Reconstructs the carried login state from request cookies.
///
/// Returns `None` only when the state cookie is absent. A missing provider
/// or redirect cookie degrades to an empty or default value so the callback
/// state machine reports the precise failure instead of a blanket mismatch.
#[must_use]
pub fn read_transient_state(jar: &CookieJar) -> Option<TransientLoginState> {
    let state = jar.get(OAUTH_STATE_COOKIE)?.value().to_string();
    let provider = jar
        .get(OAUTH_PROVIDER_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .unwrap_or_default();
    let redirect = jar
        .get(OAUTH_REDIRECT_COOKIE)
        .map_or_else(|| "/".to_string(), |cookie| cookie.value().to_string());

    Some(TransientLoginState {
        state: StateToken::from_value(state),
        provider,
        redirect,
    })
}

/// Builds the auth session cookie from configuration.
#[must_use]
pub fn session_cookie(config: &CookieConfig, token: &str, max_age: Duration) -> Cookie<'static> {
    let mut builder = Cookie::build((config.name.clone(), token.to_string()))
        .http_only(config.http_only)
        .secure(config.secure)
        .same_site(parse_same_site(&config.same_site))
        .path(config.path.clone())
        .max_age(time::Duration::seconds(max_age.as_secs() as i64));

    if let Some(domain) = &config.domain {
        builder = builder.domain(domain.clone());
    }

    builder.build()
}

/// Builds a removal cookie for the auth session cookie.
///
/// Added with `CookieJar::add` so the clearing `Set-Cookie` goes out even
/// when the request carried no session cookie; logout always clears. The
/// attributes besides `Max-Age` must match the issued cookie.
#[must_use]
pub fn clear_session_cookie(config: &CookieConfig) -> Cookie<'static> {
    let mut builder = Cookie::build((config.name.clone(), ""))
        .http_only(config.http_only)
        .secure(config.secure)
        .same_site(parse_same_site(&config.same_site))
        .path(config.path.clone());

    if let Some(domain) = &config.domain {
        builder = builder.domain(domain.clone());
    }

    let mut cookie = builder.build();
    cookie.make_removal();
    cookie
}

/// Builds the MFA challenge cookie.
#[must_use]
pub fn challenge_cookie(token: &str, ttl: Duration, secure: bool) -> Cookie<'static> {
    transient_cookie(MFA_CHALLENGE_COOKIE, token.to_string(), ttl, secure)
}

/// Builds a removal cookie for the MFA challenge cookie.
#[must_use]
pub fn clear_challenge_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((MFA_CHALLENGE_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}

fn parse_same_site(value: &str) -> SameSite {
    if value.eq_ignore_ascii_case("strict") {
        SameSite::Strict
    } else if value.eq_ignore_ascii_case("none") {
        SameSite::None
    } else {
        SameSite::Lax
    }
}
