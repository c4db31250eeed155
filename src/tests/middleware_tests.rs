use std::convert::Infallible;

use axum::response::IntoResponse;
use http::StatusCode;
use tower::{Layer as _, ServiceExt};

use super::*;
use crate::provider::Provider;
use crate::types::Config;

fn rp() -> Arc<RelyingParty> {
    Arc::new(RelyingParty::new(Config::new("/auth/o8")))
}

fn inner_handler(
    _req: Request<Body>,
) -> futures::future::Ready<Result<Response, Infallible>> {
    futures::future::ready(Ok("inner".into_response()))
}

fn inner() -> tower::util::ServiceFn<
    fn(Request<Body>) -> futures::future::Ready<Result<Response, Infallible>>,
> {
    tower::service_fn(inner_handler)
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).to_string()
}

fn request(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(http::header::HOST, "rp.example.com")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn non_prefixed_requests_pass_through() {
    let service = OidcLayer::new(rp()).layer(inner());

    let response = service.oneshot(request("/somewhere/else")).await.unwrap();

    assert_eq!(StatusCode::OK, response.status());
    assert_eq!("inner", body_text(response).await);
}

#[tokio::test]
async fn prefixed_requests_are_intercepted() {
    let service = OidcLayer::new(rp()).layer(inner());

    let response = service.oneshot(request("/auth/o8/nope")).await.unwrap();

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
    assert!(body_text(response).await.contains("unsupported provider"));
}

#[tokio::test]
async fn the_router_shape_serves_the_flow() {
    let router = rp().router();

    let response = router.oneshot(request("/auth/o8/nope")).await.unwrap();

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
    assert!(body_text(response).await.contains("unsupported provider"));
}

#[tokio::test]
async fn panics_inside_the_flow_become_plain_500s() {
    // The Facebook preset skips discovery, so registration needs no mock
    // server; the query hook then panics mid-flow.
    let provider = Provider::facebook()
        .with_credential("id", "secret")
        .unwrap()
        .with_query(|_| panic!("boom"));

    let rp = Arc::new(RelyingParty::new(Config::new("/auth/o8")));
    rp.register(provider).await.unwrap();

    let service = OidcLayer::new(Arc::clone(&rp)).layer(inner());
    let response = service.oneshot(request("/auth/o8/facebook")).await.unwrap();

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
    assert_eq!(
        "Something went wrong",
        body_text(response).await
    );
}
