//! # openid-rp
//! An OpenID Connect Relying Party for axum/tower servers.
//!
//! The library discovers provider metadata, drives the authorization code
//! redirect dance, verifies ID tokens against the provider's JWKS, fetches
//! the user profile and offers token refresh, RP-initiated logout and token
//! revocation.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::FutureExt;
//! use openid_rp::{Config, OidcLayer, Provider, RelyingParty};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), openid_rp::Error> {
//!     let rp = RelyingParty::new(Config::new("/auth/o8").verbose())
//!         .with_user_callback(|token, user| {
//!             async move {
//!                 axum::response::IntoResponse::into_response(format!(
//!                     "signed in as {} via {}",
//!                     user.email, token.provider
//!                 ))
//!             }
//!             .boxed()
//!         });
//!
//!     rp.register(Provider::google().with_credential("client-id", "client-secret")?)
//!         .await?;
//!
//!     let rp = Arc::new(rp);
//!     let app = axum::Router::new()
//!         .route("/", axum::routing::get(|| async { "hello" }))
//!         .layer(OidcLayer::new(rp));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//!     Ok(())
//! }
//! ```

#[cfg(test)]
#[path = "tests/common.rs"]
mod test_common;

mod discovery;
mod helpers;
mod http;
mod middleware;
mod provider;
mod rp;
mod state;
mod types;
mod verifier;

pub use helpers::{base64_url_decode, base64_url_encode, random_token, EcCurve};
pub use middleware::{OidcLayer, OidcMiddleware};
pub use provider::{AuthQueryFn, Provider};
pub use rp::{RelyingParty, UserCallback};
pub use state::StateRegistry;
pub use types::{Config, Endpoint, Error, Jwk, JwkSet, Token, User, WellKnown};
