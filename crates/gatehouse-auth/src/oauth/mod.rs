//! OAuth2 authorization-code flow.
//!
//! The pre-auth phase is fully stateless on the server: [`state`] defines the
//! client-carried transient triple and [`flow`] drives the provider round
//! trip.

pub mod flow;
pub mod state;

pub use flow::{CallbackOutcome, CallbackParams, InitiatedLogin, OAuthFlowCoordinator};
pub use state::{StateToken, TransientLoginState, sanitize_redirect};
