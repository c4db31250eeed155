//! OpenID Connect provider: identity, credentials, scope and the discovered
//! metadata snapshot.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::helpers::{base64_url_encode, path_escape, query_escape};
use crate::types::{Endpoint, Error, WellKnown};

/// Hook appending provider-specific query parameters to the authorization
/// redirect.
pub type AuthQueryFn = Box<dyn Fn(&mut Vec<(String, String)>) + Send + Sync>;

/// # Provider
/// A single OpenID Connect provider registered with a
/// [`crate::RelyingParty`].
///
/// Providers are configured through the consuming `with_*` builders before
/// registration; afterwards only the discovery path mutates the metadata
/// snapshot (by pointer swap) and the error slot.
pub struct Provider {
    name: String,
    url: String,
    scope: String,
    client_id: String,
    client_secret: String,
    response_type: String,
    auth_query: Option<AuthQueryFn>,
    post_logout_host: Option<String>,
    require_nonce: bool,
    skip_discovery: bool,

    well_known: RwLock<Option<Arc<WellKnown>>>,
    discovered: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl Provider {
    /// Creates a provider rooted at `url`, which must serve
    /// `/.well-known/openid-configuration`. The scope starts as `openid`.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Provider {
            name: name.into(),
            url: url.into(),
            scope: "openid".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            response_type: "code".to_string(),
            auth_query: None,
            post_logout_host: None,
            require_nonce: true,
            skip_discovery: false,
            well_known: RwLock::new(None),
            discovered: AtomicBool::new(false),
            last_error: RwLock::new(None),
        }
    }

    /// Google preset.
    pub fn google() -> Self {
        Provider::new("google", "https://accounts.google.com").with_scope("openid email profile")
    }

    /// Microsoft preset (common tenant).
    pub fn microsoft() -> Self {
        Provider::new("microsoft", "https://login.microsoftonline.com/common/v2.0")
            .with_scope("openid email profile offline_access")
    }

    /// Yahoo preset.
    pub fn yahoo() -> Self {
        Provider::new("yahoo", "https://login.yahoo.com").with_scope("openid openid2 email profile")
    }

    /// Paypal live preset.
    pub fn paypal() -> Self {
        Provider::new("paypal", "https://www.paypalobjects.com")
            .with_scope("openid email profile")
    }

    /// Paypal sandbox preset.
    pub fn paypal_sandbox() -> Self {
        Provider::new("paypal_sb", "https://www.paypalobjects.com")
            .with_scope("openid email profile")
    }

    /// Facebook preset. Facebook serves no discovery document, so the
    /// endpoints are preconfigured and remote discovery is skipped.
    pub fn facebook() -> Self {
        let stub = WellKnown {
            issuer: "https://www.facebook.com".to_string(),
            authorization_endpoint: Some("https://www.facebook.com/v18.0/dialog/oauth".to_string()),
            token_endpoint: Some("https://graph.facebook.com/v18.0/oauth/access_token".to_string()),
            userinfo_endpoint: Some(
                "https://graph.facebook.com/me?fields=id,name,email,picture".to_string(),
            ),
            jwks_uri: Some("https://www.facebook.com/.well-known/oauth/openid/jwks/".to_string()),
            ..WellKnown::default()
        };

        let provider =
            Provider::new("facebook", "https://www.facebook.com").with_scope("openid email public_profile");
        provider.install_stub(stub)
    }

    fn install_stub(self, stub: WellKnown) -> Self {
        *self.well_known.write().expect("well-known slot poisoned") = Some(Arc::new(stub));
        self.discovered.store(true, Ordering::Release);
        Provider {
            skip_discovery: true,
            ..self
        }
    }

    /// Sets the OAuth client credentials. Both values must be non-empty.
    pub fn with_credential(
        mut self,
        id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, Error> {
        let id = id.into();
        let secret = secret.into();

        if id.is_empty() || secret.is_empty() {
            return Err(Error::Credentials);
        }

        self.client_id = id;
        self.client_secret = secret;
        Ok(self)
    }

    /// Replaces the scope, ensuring `openid` stays a member. Membership is
    /// tested per whitespace-delimited token, so `openid2` alone still gains
    /// `openid`.
    pub fn with_scope(mut self, scope: &str) -> Self {
        let mut parts: Vec<&str> = scope.split_whitespace().collect();
        if !parts.iter().any(|p| *p == "openid") {
            parts.push("openid");
        }

        self.scope = parts.join(" ");
        self
    }

    /// Overrides `response_type=code`, switching to an implicit or hybrid
    /// flow when `code` is absent from the value.
    pub fn with_response_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_type = response_type.into();
        self
    }

    /// Installs a hook that appends extra query parameters to the
    /// authorization redirect.
    pub fn with_query<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Vec<(String, String)>) + Send + Sync + 'static,
    {
        self.auth_query = Some(Box::new(f));
        self
    }

    /// Restricts `post_logout_redirect_uri` values passed to
    /// [`crate::RelyingParty::sign_out`] to this host.
    pub fn with_post_logout_host(mut self, host: impl Into<String>) -> Self {
        self.post_logout_host = Some(host.into());
        self
    }

    /// Controls whether a missing `nonce` claim fails verification.
    /// Defaults to `true`; disable only for providers that never echo the
    /// nonce.
    pub fn with_require_nonce(mut self, require: bool) -> Self {
        self.require_nonce = require;
        self
    }

    /// Provider name used in the mount path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Issuer base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Space-delimited scope, always containing `openid`.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// OAuth client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// The `response_type` sent on the authorization redirect.
    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    pub(crate) fn auth_query(&self) -> Option<&AuthQueryFn> {
        self.auth_query.as_ref()
    }

    pub(crate) fn post_logout_host(&self) -> Option<&str> {
        self.post_logout_host.as_deref()
    }

    pub(crate) fn require_nonce(&self) -> bool {
        self.require_nonce
    }

    pub(crate) fn skip_discovery(&self) -> bool {
        self.skip_discovery
    }

    /// Whether the provider drives an authorization code flow. Implicit and
    /// hybrid-without-code providers skip the token exchange.
    pub fn is_code_flow(&self) -> bool {
        self.response_type.split_whitespace().any(|t| t == "code")
    }

    /// The current metadata snapshot. Fails while discovery has not yet
    /// succeeded, carrying the deferred registration error when one was
    /// recorded.
    pub fn well_known(&self) -> Result<Arc<WellKnown>, Error> {
        let slot = self.well_known.read().expect("well-known slot poisoned");

        match slot.as_ref() {
            Some(snapshot) => Ok(Arc::clone(snapshot)),
            None => {
                let reason = self
                    .last_error()
                    .unwrap_or_else(|| "provider metadata not discovered".to_string());
                Err(Error::Discovery(reason))
            }
        }
    }

    /// Resolves an endpoint URI by action, with the error kind matching the
    /// operation that needed it.
    pub fn endpoint(&self, endpoint: Endpoint) -> Result<String, Error> {
        let snapshot = self.well_known()?;

        match snapshot.endpoint(endpoint) {
            Some(uri) => Ok(uri.to_string()),
            None => Err(match endpoint {
                Endpoint::SignOut => Error::InvalidSignOutRedirect(
                    "provider has no end_session_endpoint".to_string(),
                ),
                Endpoint::Revoke => Error::RevocationUnsupported,
                Endpoint::Auth => {
                    Error::Discovery("provider has no authorization_endpoint".to_string())
                }
                Endpoint::Token => Error::Discovery("provider has no token_endpoint".to_string()),
                Endpoint::UserInfo => {
                    Error::Discovery("provider has no userinfo_endpoint".to_string())
                }
                Endpoint::Keys => Error::Discovery("provider has no jwks_uri".to_string()),
            }),
        }
    }

    /// Whether the provider published a revocation endpoint.
    pub fn can_revoke(&self) -> bool {
        self.endpoint(Endpoint::Revoke).is_ok()
    }

    /// Whether the provider published an end-session endpoint.
    pub fn can_sign_out(&self) -> bool {
        self.endpoint(Endpoint::SignOut).is_ok()
    }

    /// Whether initial discovery (or the preset stub) completed.
    pub fn discovered(&self) -> bool {
        self.discovered.load(Ordering::Acquire)
    }

    /// The most recent discovery failure, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().expect("error slot poisoned").clone()
    }

    /// `Authorization` header value for endpoints using HTTP Basic client
    /// authentication, with the escaped `client_id:client_secret` pair.
    pub fn auth_basic_header(&self) -> String {
        let id = path_escape(&query_escape(&self.client_id));
        let secret = path_escape(&query_escape(&self.client_secret));

        format!("Basic {}", base64_url_encode(format!("{id}:{secret}").as_bytes()))
    }

    pub(crate) fn apply_snapshot(&self, well_known: WellKnown) {
        *self.well_known.write().expect("well-known slot poisoned") = Some(Arc::new(well_known));
        self.discovered.store(true, Ordering::Release);
        *self.last_error.write().expect("error slot poisoned") = None;
    }

    pub(crate) fn record_error(&self, message: String) {
        *self.last_error.write().expect("error slot poisoned") = Some(message);
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("scope", &self.scope)
            .field("client_id", &self.client_id)
            .field("response_type", &self.response_type)
            .field("require_nonce", &self.require_nonce)
            .field("skip_discovery", &self.skip_discovery)
            .field("discovered", &self.discovered())
            .field("last_error", &self.last_error())
            .finish()
    }
}

#[cfg(test)]
#[path = "./tests/provider_tests.rs"]
mod provider_tests;
