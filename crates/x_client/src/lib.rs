//! X (Twitter) API client library.
//!
//! Provides OAuth 1.0a signed access to the v2 post-creation endpoint.

pub mod auth;
pub mod rest;

pub use auth::OAuth1Signer;
pub use rest::XClient;
