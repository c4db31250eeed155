use serde::Deserialize;
use serde_json::{Map, Value};

use super::errors::Error;

/// # User
/// Profile data from the provider's userinfo endpoint, or synthesized from
/// verified ID-token claims when the provider publishes no such endpoint.
///
/// Userinfo retrieval failures are non-fatal: they are embedded in `error`
/// and the user callback is expected to inspect it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    /// End-user email address.
    #[serde(default)]
    pub email: String,
    /// Whether the provider verified `email`.
    #[serde(default)]
    pub email_verified: bool,
    /// Full display name.
    #[serde(default)]
    pub name: String,
    /// Given name.
    #[serde(default)]
    pub given_name: String,
    /// Family name.
    #[serde(default)]
    pub family_name: String,
    /// Profile picture URL.
    #[serde(default)]
    pub picture: String,
    /// End-user locale.
    #[serde(default)]
    pub locale: String,
    /// Subject identifier, the provider-stable user id.
    #[serde(default, rename = "sub")]
    pub subject: String,
    /// Set when userinfo retrieval failed; profile fields are then empty or
    /// claim-derived.
    #[serde(skip)]
    pub error: Option<Error>,
}

impl User {
    pub(crate) fn from_error(error: Error) -> Self {
        User {
            error: Some(error),
            ..User::default()
        }
    }

    /// Builds a user from verified ID-token claims, for providers without a
    /// userinfo endpoint.
    pub(crate) fn from_claims(claims: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            claims
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        User {
            email: text("email"),
            email_verified: claims
                .get("email_verified")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            name: text("name"),
            given_name: text("given_name"),
            family_name: text("family_name"),
            picture: text("picture"),
            locale: text("locale"),
            subject: text("sub"),
            error: None,
        }
    }
}
