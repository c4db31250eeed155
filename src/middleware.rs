//! Mounting the authentication flow into an axum/tower server, either as a
//! layer wrapping an existing service or as a dedicated router.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::future::BoxFuture;
use http::Request;
use tower::{Layer, Service};

use crate::rp::RelyingParty;

/// # OidcLayer
/// A [`tower::Layer`] that intercepts every request under the relying
/// party's URI prefix and hands it to the flow engine; all other requests
/// pass through to the wrapped service.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use openid_rp::{Config, OidcLayer, RelyingParty};
/// # fn mount(rp: Arc<RelyingParty>) -> axum::Router {
/// axum::Router::new()
///     .route("/", axum::routing::get(|| async { "hello" }))
///     .layer(OidcLayer::new(rp))
/// # }
/// ```
#[derive(Clone)]
pub struct OidcLayer {
    rp: Arc<RelyingParty>,
}

impl OidcLayer {
    /// Wraps the given relying party into a layer.
    pub fn new(rp: Arc<RelyingParty>) -> Self {
        OidcLayer { rp }
    }
}

impl<S> Layer<S> for OidcLayer {
    type Service = OidcMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OidcMiddleware {
            inner,
            rp: Arc::clone(&self.rp),
        }
    }
}

/// The service produced by [`OidcLayer`].
#[derive(Clone)]
pub struct OidcMiddleware<S> {
    inner: S,
    rp: Arc<RelyingParty>,
}

impl<S> Service<Request<Body>> for OidcMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        if !req.uri().path().starts_with(self.rp.uri_prefix()) {
            return Box::pin(self.inner.call(req));
        }

        let rp = Arc::clone(&self.rp);
        Box::pin(async move { Ok(rp.process(req).await) })
    }
}

impl RelyingParty {
    /// The route-mounting shape of the middleware: a router serving
    /// `GET <prefix>/:provider` with the flow engine.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route(
                &format!("{}/:provider", self.uri_prefix()),
                get(process_handler),
            )
            .with_state(Arc::clone(self))
    }
}

async fn process_handler(
    State(rp): State<Arc<RelyingParty>>,
    req: Request<Body>,
) -> Response {
    rp.process(req).await
}

#[cfg(test)]
#[path = "./tests/middleware_tests.rs"]
mod middleware_tests;
