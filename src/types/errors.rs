use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// # Error
/// Every failure the library can surface to the embedding application.
///
/// The variants are deliberately string-carrying so the type stays [`Clone`]
/// and can travel inside a [`crate::User`] for non-fatal userinfo failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// The request named a provider that was never registered.
    #[error("unsupported provider '{0}'")]
    ProviderSupport(String),

    /// Provider credentialing was attempted with an empty id or secret.
    #[error("client ID and client secret may not be empty")]
    Credentials,

    /// Fetching or decoding the well-known configuration or JWKS failed.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// The callback carried a `state` that is malformed, expired or already
    /// consumed.
    #[error("invalid request state")]
    InvalidState,

    /// The token endpoint answered without an `id_token`.
    #[error("empty id_token")]
    EmptyToken,

    /// The `id_token` is not a three-segment compact JWS.
    #[error("invalid id_token: {0}")]
    InvalidToken(String),

    /// The JWS payload did not decode into a claims object, or a standard
    /// claim failed validation.
    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    /// The `nonce` claim is missing or does not match the one issued for
    /// this session.
    #[error("invalid nonce")]
    InvalidNonce,

    /// The `aud` claim does not include our `client_id`.
    #[error("invalid audience")]
    InvalidAudience,

    /// The JWS header carries a signing algorithm outside the HS/RS/ES
    /// families.
    #[error("unsupported signing algo '{0}'")]
    UnsupportedAlgo(String),

    /// No JWKS entry is usable for the token's `kid`/`alg` pair.
    #[error("can't determine signing key")]
    UnknownKey,

    /// The signature does not verify under the selected key.
    #[error("invalid signature")]
    InvalidSignature,

    /// An operation needed an access token the [`crate::Token`] does not
    /// carry.
    #[error("invalid access_token")]
    InvalidAccessToken,

    /// Refresh was requested without a refresh token.
    #[error("invalid refresh_token")]
    InvalidRefreshToken,

    /// Sign-out is unavailable or the post-logout redirect is not allowed.
    #[error("invalid sign-out redirect: {0}")]
    InvalidSignOutRedirect(String),

    /// The provider's metadata exposes no revocation endpoint.
    #[error("provider does not support revocation")]
    RevocationUnsupported,

    /// Network failure, timeout or an unexpected upstream status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with an OAuth error document.
    #[error("{}", display_upstream(.error, .description))]
    Upstream {
        /// Short error code, e.g. `invalid_grant`.
        error: String,
        /// Optional human readable detail.
        description: Option<String>,
    },
}

fn display_upstream(error: &str, description: &Option<String>) -> String {
    match description {
        Some(description) => format!("{error}: {description}"),
        None => error.to_string(),
    }
}

impl Error {
    pub(crate) fn upstream(error: impl Into<String>, description: Option<String>) -> Self {
        Error::Upstream {
            error: error.into(),
            description,
        }
    }
}

/// Error document returned by OIDC servers.
/// [Error Response](https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1)
#[derive(Debug, Deserialize)]
pub(crate) struct StandardBodyError {
    pub error: String,
    pub error_description: Option<String>,
}

/// Pulls an OAuth error out of a response body, accepting both the RFC 6749
/// shape (`{"error": "...", "error_description": "..."}`) and the nested
/// `{"error": {"message": "..."}}` convention some providers use on their
/// revocation endpoints.
pub(crate) fn upstream_error_from_body(body: &str) -> Option<Error> {
    if let Ok(standard) = serde_json::from_str::<StandardBodyError>(body) {
        return Some(Error::upstream(standard.error, standard.error_description));
    }

    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .as_object()?
        .get("message")?
        .as_str()
        .map(|message| Error::upstream(message.to_string(), None))
}
