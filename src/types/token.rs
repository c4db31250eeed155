use serde::Deserialize;
use serde_json::{Map, Value};

use crate::helpers::base64_url_decode;

/// # Token
/// The token material produced by an authorization code exchange, an
/// implicit callback or a refresh grant.
///
/// `claims` is only populated once the `id_token` passed verification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Token {
    /// The raw compact-JWS ID token.
    #[serde(default)]
    pub id_token: String,
    /// Bearer token for the userinfo endpoint.
    pub access_token: Option<String>,
    /// Long-lived token for [`crate::RelyingParty::refresh_token`].
    pub refresh_token: Option<String>,
    /// Name of the registered provider that issued this token.
    #[serde(skip)]
    pub provider: String,
    /// Verified ID-token claims.
    #[serde(skip)]
    pub claims: Map<String, Value>,
    /// OAuth error code when the provider rejected the grant.
    pub error: Option<String>,
    /// Detail accompanying `error`.
    pub error_description: Option<String>,
}

impl Token {
    /// A token holding only a provider name and an access token, enough for
    /// [`crate::RelyingParty::sign_out`] and
    /// [`crate::RelyingParty::revoke_token`].
    pub fn for_provider(provider: impl Into<String>, access_token: impl Into<String>) -> Self {
        Token {
            provider: provider.into(),
            access_token: Some(access_token.into()),
            ..Token::default()
        }
    }

    /// Decodes the ID-token payload without any verification. Useful for
    /// logging and debugging only.
    pub fn unverified_claims(&self) -> Option<Map<String, Value>> {
        let payload = self.id_token.split('.').nth(1)?;
        let decoded = base64_url_decode(payload).ok()?;
        serde_json::from_slice(&decoded).ok()
    }
}
