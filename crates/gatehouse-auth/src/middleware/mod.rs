//! Request authentication middleware.
//!
//! This module provides:
//! - [`CurrentUser`]: an extractor that authenticates the request from its
//!   bearer token or session cookie, rejecting with a uniform `401` when the
//!   token fails verification or its session no longer exists
//! - `IntoResponse` for [`crate::error::AuthError`], mapping every error to
//!   a JSON body and status code

pub mod auth;
pub mod error;

pub use auth::CurrentUser;
