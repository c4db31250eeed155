//! # Types Module
//! Public values and wire documents: config, tokens, users, provider
//! metadata and errors.

mod config;
mod errors;
mod token;
mod user;
mod well_known;

pub use config::Config;
pub use errors::Error;
pub(crate) use errors::upstream_error_from_body;
pub use token::Token;
pub use user::User;
pub use well_known::{Endpoint, Jwk, JwkSet, WellKnown};
