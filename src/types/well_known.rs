use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// Endpoint actions a [`WellKnown`] snapshot can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `authorization_endpoint`
    Auth,
    /// `token_endpoint`
    Token,
    /// `userinfo_endpoint`
    UserInfo,
    /// `jwks_uri`
    Keys,
    /// `end_session_endpoint`
    SignOut,
    /// `revocation_endpoint`
    Revoke,
}

/// # WellKnown
/// The provider metadata discovered from
/// `/.well-known/openid-configuration`, plus the JWKS fetched from its
/// `jwks_uri`. [OIDC Discovery](https://openid.net/specs/openid-connect-discovery-1_0.html#ProviderConfigurationResponse)
///
/// A snapshot is immutable once published; refresh replaces the whole value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WellKnown {
    /// Issuer identifier the document was served for.
    #[serde(default)]
    pub issuer: String,
    /// [Authorization Endpoint](https://openid.net/specs/openid-connect-core-1_0.html#AuthorizationEndpoint)
    pub authorization_endpoint: Option<String>,
    /// [Token Endpoint](https://openid.net/specs/openid-connect-core-1_0.html#TokenEndpoint)
    pub token_endpoint: Option<String>,
    /// [Userinfo Endpoint](https://openid.net/specs/openid-connect-core-1_0.html#UserInfo)
    pub userinfo_endpoint: Option<String>,
    /// URL of the provider's JWK Set.
    pub jwks_uri: Option<String>,
    /// RP-initiated logout endpoint.
    pub end_session_endpoint: Option<String>,
    /// [Token revocation](https://www.rfc-editor.org/rfc/rfc7009) endpoint.
    pub revocation_endpoint: Option<String>,
    /// Non-standard alias some providers publish instead of
    /// `revocation_endpoint`.
    pub token_revocation_endpoint: Option<String>,
    /// JWS algorithms the provider signs ID tokens with.
    pub id_token_signing_alg_values_supported: Option<Vec<String>>,
    /// Any remaining metadata fields.
    #[serde(flatten)]
    pub other_fields: HashMap<String, Value>,
    /// Keys fetched from `jwks_uri`. Not part of the discovery document.
    #[serde(skip)]
    pub jwks: JwkSet,
}

impl WellKnown {
    /// Resolves the URI serving `endpoint`, if the provider published one.
    pub fn endpoint(&self, endpoint: Endpoint) -> Option<&str> {
        match endpoint {
            Endpoint::Auth => self.authorization_endpoint.as_deref(),
            Endpoint::Token => self.token_endpoint.as_deref(),
            Endpoint::UserInfo => self.userinfo_endpoint.as_deref(),
            Endpoint::Keys => self.jwks_uri.as_deref(),
            Endpoint::SignOut => self.end_session_endpoint.as_deref(),
            Endpoint::Revoke => self.revocation_endpoint.as_deref(),
        }
    }

    /// Providers that only publish `token_revocation_endpoint` still get a
    /// working revocation endpoint.
    pub(crate) fn apply_revocation_alias(&mut self) {
        if self.revocation_endpoint.is_none() {
            self.revocation_endpoint = self.token_revocation_endpoint.clone();
        }
    }
}

/// A single key of the provider's JWKS.
/// [JSON Web Key](https://www.rfc-editor.org/rfc/rfc7517)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jwk {
    /// Key id the JWS header points at.
    #[serde(default)]
    pub kid: String,
    /// Key type, `RSA` or `EC` for the supported families.
    #[serde(default)]
    pub kty: String,
    /// Intended signing algorithm.
    pub alg: Option<String>,
    /// Key use, usually `sig`.
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// Curve name for EC keys.
    pub crv: Option<String>,
    /// RSA modulus, base64url big-endian.
    pub n: Option<String>,
    /// RSA exponent, base64url big-endian.
    pub e: Option<String>,
    /// EC x coordinate, base64url big-endian.
    pub x: Option<String>,
    /// EC y coordinate, base64url big-endian.
    pub y: Option<String>,
}

/// The provider's published key set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwkSet {
    /// Keys in publication order.
    #[serde(default)]
    pub keys: Vec<Jwk>,
}
