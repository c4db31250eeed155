//! The relying-party façade: provider registry, state registry, user
//! callback and the per-request authentication flow.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, RwLock};

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use futures::FutureExt;
use http::{header, Request, StatusCode};
use tokio::task::JoinHandle;
use tracing::error;
use url::{form_urlencoded, Url};

use crate::discovery::{discover_into, refresh_loop};
use crate::http::{get_json, post_form, Auth};
use crate::provider::Provider;
use crate::state::StateRegistry;
use crate::types::{upstream_error_from_body, Config, Endpoint, Error, Token, User};
use crate::verifier::verify_id_token;

/// Application hook invoked at the end of a successful flow. Receives the
/// verified token and the user profile and produces the HTTP response for
/// the callback request.
pub type UserCallback = Box<dyn Fn(Token, User) -> BoxFuture<'static, Response> + Send + Sync>;

/// # RelyingParty
/// The root object of the library. Owns the registered providers, the
/// one-time state registry and the user callback, and drives a request
/// through redirect → callback → token exchange → verification → userinfo.
///
/// ```no_run
/// # use openid_rp::{Config, Provider, RelyingParty};
/// # async fn setup() -> Result<(), openid_rp::Error> {
/// let rp = RelyingParty::new(Config::new("/auth/o8"));
/// rp.register(Provider::google().with_credential("id", "secret")?)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct RelyingParty {
    config: Config,
    http: reqwest::Client,
    providers: RwLock<HashMap<String, Arc<Provider>>>,
    states: StateRegistry,
    user_callback: Option<UserCallback>,
    refresh_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RelyingParty {
    /// Creates a relying party intercepting requests under
    /// `config.uri_prefix`.
    pub fn new(config: Config) -> Self {
        RelyingParty {
            config,
            http: reqwest::Client::new(),
            providers: RwLock::new(HashMap::new()),
            states: StateRegistry::new(),
            user_callback: None,
            refresh_tasks: Mutex::new(Vec::new()),
        }
    }

    /// Installs the callback invoked with the verified [`Token`] and
    /// [`User`] at the end of a successful flow.
    pub fn with_user_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Token, User) -> BoxFuture<'static, Response> + Send + Sync + 'static,
    {
        self.user_callback = Some(Box::new(callback));
        self
    }

    /// The path prefix this instance intercepts.
    pub fn uri_prefix(&self) -> &str {
        &self.config.uri_prefix
    }

    /// # Register a provider
    /// Runs initial discovery (unless the provider carries a preset
    /// metadata stub) and schedules the daily background refresh.
    ///
    /// Registering an already-registered name is a no-op returning the
    /// existing provider. A discovery failure leaves the provider
    /// unregistered and is returned to the caller; see
    /// [`RelyingParty::register_deferred`] for the non-blocking variant.
    pub async fn register(&self, provider: Provider) -> Result<Arc<Provider>, Error> {
        if let Some(existing) = self.provider(provider.name()) {
            return Ok(existing);
        }

        discover_into(&self.http, &provider).await?;

        let provider = Arc::new(provider);
        let registered = {
            let mut providers = self.providers.write().expect("provider map poisoned");
            Arc::clone(
                providers
                    .entry(provider.name().to_string())
                    .or_insert_with(|| Arc::clone(&provider)),
            )
        };

        if !registered.skip_discovery() {
            self.keep_task(tokio::spawn(refresh_loop(
                self.http.clone(),
                Arc::clone(&registered),
            )));
        }

        Ok(registered)
    }

    /// # Register a provider without blocking on discovery
    /// The provider becomes visible immediately; initial discovery runs in
    /// the background and failures land in [`Provider::last_error`] instead
    /// of aborting startup. Flow requests fail until discovery succeeds.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register_deferred(&self, provider: Provider) -> Arc<Provider> {
        if let Some(existing) = self.provider(provider.name()) {
            return existing;
        }

        let provider = Arc::new(provider);
        let registered = {
            let mut providers = self.providers.write().expect("provider map poisoned");
            Arc::clone(
                providers
                    .entry(provider.name().to_string())
                    .or_insert_with(|| Arc::clone(&provider)),
            )
        };

        let client = self.http.clone();
        let task_provider = Arc::clone(&registered);
        self.keep_task(tokio::spawn(async move {
            if discover_into(&client, &task_provider).await.is_ok() {
                refresh_loop(client, task_provider).await;
            }
        }));

        registered
    }

    fn keep_task(&self, handle: JoinHandle<()>) {
        self.refresh_tasks
            .lock()
            .expect("task list poisoned")
            .push(handle);
    }

    /// Whether `name` is a registered provider.
    pub fn supports(&self, name: &str) -> bool {
        self.providers
            .read()
            .expect("provider map poisoned")
            .contains_key(name)
    }

    /// Looks up a registered provider.
    pub fn provider(&self, name: &str) -> Option<Arc<Provider>> {
        self.providers
            .read()
            .expect("provider map poisoned")
            .get(name)
            .cloned()
    }

    /// Drops a pending `state` without claiming it.
    pub fn unset_state(&self, state: &str) {
        self.states.unset(state);
    }

    /// # Start an authentication flow
    /// Issues a fresh `(state, nonce)` pair and returns the 302 redirect to
    /// the provider's authorization endpoint. `redirect_uri` must be the
    /// URL the provider will call back, normally the current request URL
    /// with its query stripped.
    pub fn request_auth(&self, name: &str, redirect_uri: &str) -> Result<Response, Error> {
        let provider = self
            .provider(name)
            .ok_or_else(|| Error::ProviderSupport(name.to_string()))?;

        let auth_uri = provider.endpoint(Endpoint::Auth)?;
        let mut url = Url::parse(&auth_uri)
            .map_err(|e| Error::Discovery(format!("invalid authorization_endpoint: {e}")))?;

        let (state, nonce) = self.states.issue();

        let mut params: Vec<(String, String)> = vec![
            ("response_type".to_string(), provider.response_type().to_string()),
            ("redirect_uri".to_string(), redirect_uri.to_string()),
            ("client_id".to_string(), provider.client_id().to_string()),
            ("scope".to_string(), provider.scope().to_string()),
            ("state".to_string(), state),
            ("nonce".to_string(), nonce),
        ];

        if let Some(extend) = provider.auth_query() {
            extend(&mut params);
        }

        for (key, value) in &params {
            url.query_pairs_mut().append_pair(key, value);
        }

        Ok(redirect_found(url.as_str()))
    }

    /// # Complete the callback leg
    /// Exchanges the authorization `code` at the token endpoint (or, for
    /// implicit/hybrid providers, parses `code_or_token` as the raw token
    /// response JSON) and verifies the ID token against `nonce`.
    pub async fn authenticate(
        &self,
        name: &str,
        code_or_token: &str,
        nonce: &str,
        redirect_uri: &str,
    ) -> Result<Token, Error> {
        let provider = self
            .provider(name)
            .ok_or_else(|| Error::ProviderSupport(name.to_string()))?;

        let mut token = if provider.is_code_flow() {
            self.exchange_code(&provider, code_or_token, redirect_uri)
                .await?
        } else {
            serde_json::from_str::<Token>(code_or_token)
                .map_err(|e| Error::InvalidToken(format!("invalid token response: {e}")))?
        };

        token.provider = name.to_string();

        if let Some(code) = token.error.clone() {
            return Err(Error::upstream(code, token.error_description.clone()));
        }

        if token.id_token.is_empty() {
            return Err(Error::EmptyToken);
        }

        let well_known = provider.well_known()?;
        verify_id_token(&provider, &well_known.jwks, &mut token, Some(nonce))?;

        Ok(token)
    }

    async fn exchange_code(
        &self,
        provider: &Provider,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Token, Error> {
        let token_uri = provider.endpoint(Endpoint::Token)?;

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", provider.client_id()),
            ("client_secret", provider.client_secret()),
        ];

        let body = post_form(&self.http, &token_uri, &form, Auth::None).await?;

        serde_json::from_str(&body)
            .map_err(|e| Error::Transport(format!("invalid token response: {e}")))
    }

    /// # Fetch the user profile
    /// GETs the userinfo endpoint with the token's bearer access token, or
    /// synthesizes the [`User`] from verified ID-token claims when the
    /// provider publishes no userinfo endpoint. Failures are embedded in
    /// [`User::error`]; the callback must inspect it.
    pub async fn user_info(&self, token: &Token) -> User {
        let provider = match self.provider(&token.provider) {
            Some(p) => p,
            None => return User::from_error(Error::ProviderSupport(token.provider.clone())),
        };

        let well_known = match provider.well_known() {
            Ok(snapshot) => snapshot,
            Err(err) => return User::from_error(err),
        };

        let userinfo_uri = match well_known.endpoint(Endpoint::UserInfo) {
            Some(uri) => uri.to_string(),
            None => return User::from_claims(&token.claims),
        };

        let access_token = match token.access_token.as_deref().filter(|t| !t.is_empty()) {
            Some(t) => t,
            None => return User::from_error(Error::InvalidAccessToken),
        };

        let body = match get_json(&self.http, &userinfo_uri, Auth::Bearer(access_token)).await {
            Ok(body) => body,
            Err(err) => return User::from_error(err),
        };

        match serde_json::from_str::<User>(&body) {
            Ok(user) => user,
            Err(e) => User::from_error(Error::Transport(format!("invalid userinfo body: {e}"))),
        }
    }

    /// # Refresh a token
    /// Runs a `refresh_token` grant. Providers may answer without a new
    /// `id_token`; that is tolerated. A returned `id_token` is verified,
    /// with the nonce check skipped.
    pub async fn refresh_token(&self, token: &Token) -> Result<Token, Error> {
        let provider = self
            .provider(&token.provider)
            .ok_or_else(|| Error::ProviderSupport(token.provider.clone()))?;

        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(Error::InvalidRefreshToken)?;

        let token_uri = provider.endpoint(Endpoint::Token)?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", provider.client_id()),
            ("client_secret", provider.client_secret()),
        ];

        let body = post_form(&self.http, &token_uri, &form, Auth::None).await?;

        let mut refreshed: Token = serde_json::from_str(&body)
            .map_err(|e| Error::Transport(format!("invalid token response: {e}")))?;
        refreshed.provider = token.provider.clone();

        if let Some(code) = refreshed.error.clone() {
            return Err(Error::upstream(code, refreshed.error_description.clone()));
        }

        if !refreshed.id_token.is_empty() {
            let well_known = provider.well_known()?;
            verify_id_token(&provider, &well_known.jwks, &mut refreshed, None)?;
        }

        Ok(refreshed)
    }

    /// # Build the RP-initiated logout URL
    /// Requires the provider's end-session endpoint. The token's access
    /// token (falling back to its refresh token) becomes `id_token_hint`;
    /// `post_logout_redirect` is appended when given and allowed by the
    /// provider's post-logout host restriction.
    pub fn sign_out_url(
        &self,
        token: &Token,
        post_logout_redirect: Option<&str>,
    ) -> Result<Url, Error> {
        let provider = self
            .provider(&token.provider)
            .ok_or_else(|| Error::ProviderSupport(token.provider.clone()))?;

        let sign_out_uri = provider.endpoint(Endpoint::SignOut)?;

        let hint = token
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| token.refresh_token.as_deref().filter(|t| !t.is_empty()))
            .ok_or(Error::InvalidAccessToken)?;

        let mut url = Url::parse(&sign_out_uri).map_err(|e| {
            Error::InvalidSignOutRedirect(format!("invalid end_session_endpoint: {e}"))
        })?;

        url.query_pairs_mut().append_pair("id_token_hint", hint);

        if let Some(redirect) = post_logout_redirect.filter(|r| !r.is_empty()) {
            if let Some(allowed) = provider.post_logout_host() {
                let parsed = Url::parse(redirect).map_err(|_| {
                    Error::InvalidSignOutRedirect(
                        "post-logout redirect is not a valid URL".to_string(),
                    )
                })?;

                if parsed.host_str() != Some(allowed) {
                    return Err(Error::InvalidSignOutRedirect(format!(
                        "host '{}' is not allowed",
                        parsed.host_str().unwrap_or_default()
                    )));
                }
            }

            url.query_pairs_mut()
                .append_pair("post_logout_redirect_uri", redirect);
        }

        Ok(url)
    }

    /// Like [`RelyingParty::sign_out_url`], shaped as the 302 redirect
    /// response.
    pub fn sign_out(
        &self,
        token: &Token,
        post_logout_redirect: Option<&str>,
    ) -> Result<Response, Error> {
        let url = self.sign_out_url(token, post_logout_redirect)?;
        Ok(redirect_found(url.as_str()))
    }

    /// # Revoke a token
    /// POSTs the token (access preferred, refresh as fallback) to the
    /// provider's revocation endpoint with HTTP Basic client
    /// authentication. A body carrying `error.message` becomes the returned
    /// error.
    pub async fn revoke_token(&self, token: &Token) -> Result<(), Error> {
        let provider = self
            .provider(&token.provider)
            .ok_or_else(|| Error::ProviderSupport(token.provider.clone()))?;

        let revoke_uri = provider.endpoint(Endpoint::Revoke)?;

        let (value, hint) = match (
            token.access_token.as_deref().filter(|t| !t.is_empty()),
            token.refresh_token.as_deref().filter(|t| !t.is_empty()),
        ) {
            (Some(access), _) => (access, "access_token"),
            (None, Some(refresh)) => (refresh, "refresh_token"),
            (None, None) => return Err(Error::InvalidAccessToken),
        };

        let form = [("token", value), ("token_type_hint", hint)];

        let body = post_form(
            &self.http,
            &revoke_uri,
            &form,
            Auth::Header(provider.auth_basic_header()),
        )
        .await?;

        if let Some(err) = upstream_error_from_body(&body) {
            return Err(err);
        }

        Ok(())
    }

    /// # Handle an intercepted request
    /// The per-request state machine behind the middleware. Panics inside
    /// the flow are trapped and rendered as a plain 500.
    pub async fn process(&self, req: Request<Body>) -> Response {
        match AssertUnwindSafe(self.process_inner(req)).catch_unwind().await {
            Ok(response) => response,
            Err(_) => {
                if self.config.verbose {
                    error!("panic while processing authentication request");
                }
                html_page(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
        }
    }

    async fn process_inner(&self, req: Request<Body>) -> Response {
        let name = provider_name(req.uri().path(), &self.config.uri_prefix);
        let current = current_url(&req);

        if !self.supports(&name) {
            return self.render_error(&Error::ProviderSupport(name), &current);
        }

        let query: HashMap<String, String> =
            form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
                .into_owned()
                .collect();

        // The provider aborted the flow upstream.
        if let Some(code) = query.get("error").filter(|e| !e.is_empty()) {
            let err = Error::upstream(code.clone(), query.get("error_description").cloned());
            return self.render_error(&err, &current);
        }

        let code = match query.get("code").filter(|c| !c.is_empty()) {
            None => {
                return match self.request_auth(&name, &current) {
                    Ok(response) => response,
                    Err(err) => self.render_error(&err, &current),
                };
            }
            Some(code) => code,
        };

        let state = query.get("state").map(String::as_str).unwrap_or("");
        let nonce = match self.states.claim(state) {
            Ok(nonce) => nonce,
            Err(err) => return self.render_error(&err, &current),
        };

        let token = match self.authenticate(&name, code, &nonce, &current).await {
            Ok(token) => token,
            Err(err) => return self.render_error(&err, &current),
        };

        let user = self.user_info(&token).await;

        match &self.user_callback {
            Some(callback) => callback(token, user).await,
            None => html_page(
                StatusCode::OK,
                "OK, the auth flow is complete. However, no user callback is installed",
            ),
        }
    }

    fn render_error(&self, err: &Error, restart_uri: &str) -> Response {
        if self.config.verbose {
            error!(error = %err, "authentication flow failed");
        }

        let body = format!(
            "{}<br><br><a href=\"{}\">Restart auth flow</a>",
            html_escape(&err.to_string()),
            restart_uri
        );
        html_page(StatusCode::INTERNAL_SERVER_ERROR, &body)
    }
}

impl Drop for RelyingParty {
    fn drop(&mut self) {
        for task in self.refresh_tasks.lock().expect("task list poisoned").drain(..) {
            task.abort();
        }
    }
}

/// The provider name is whatever follows the mount prefix.
fn provider_name(path: &str, prefix: &str) -> String {
    path.strip_prefix(prefix)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or("")
        .to_string()
}

/// Reconstructs the externally visible request URL with the query stripped.
/// The scheme defaults to `https`; the host falls back to the `Host`
/// header when the request URI is in origin form.
pub(crate) fn current_url<B>(req: &Request<B>) -> String {
    let uri = req.uri();
    let scheme = uri.scheme_str().unwrap_or("https");

    let host = uri
        .authority()
        .map(|a| a.to_string())
        .or_else(|| {
            req.headers()
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_default();

    format!("{scheme}://{host}{}", uri.path())
}

pub(crate) fn redirect_found(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
        (),
    )
        .into_response()
}

pub(crate) fn html_page(status: StatusCode, body: &str) -> Response {
    (
        status,
        [
            (
                header::CONTENT_TYPE,
                "text/html; charset=utf-8".to_string(),
            ),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        body.to_string(),
    )
        .into_response()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
#[path = "./tests/flow_tests.rs"]
mod flow_tests;
