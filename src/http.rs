//! Outbound HTTP plumbing shared by discovery, token exchange, userinfo and
//! revocation.

use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use url::form_urlencoded;

use crate::types::{upstream_error_from_body, Error};

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra authentication applied to an outbound request.
pub(crate) enum Auth<'a> {
    None,
    /// `Authorization: Bearer <token>`
    Bearer(&'a str),
    /// A prebuilt `Authorization` header value, e.g. from
    /// [`crate::Provider::auth_basic_header`].
    Header(String),
}

/// GETs `url` expecting a JSON body, returning the raw text.
pub(crate) async fn get_json(
    client: &reqwest::Client,
    url: &str,
    auth: Auth<'_>,
) -> Result<String, Error> {
    let mut req = client
        .get(url)
        .timeout(REQUEST_TIMEOUT)
        .header(ACCEPT, HeaderValue::from_static("application/json"));

    req = apply_auth(req, auth)?;

    let res = req
        .send()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    read_response(res).await
}

/// POSTs a form-urlencoded body to `url`, returning the raw response text.
pub(crate) async fn post_form(
    client: &reqwest::Client,
    url: &str,
    form: &[(&str, &str)],
    auth: Auth<'_>,
) -> Result<String, Error> {
    let body = {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in form {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    };

    let mut req = client
        .post(url)
        .timeout(REQUEST_TIMEOUT)
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        )
        .body(body);

    req = apply_auth(req, auth)?;

    let res = req
        .send()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    read_response(res).await
}

fn apply_auth(
    req: reqwest::RequestBuilder,
    auth: Auth<'_>,
) -> Result<reqwest::RequestBuilder, Error> {
    match auth {
        Auth::None => Ok(req),
        Auth::Bearer(token) => Ok(req.header(AUTHORIZATION, format!("Bearer {token}"))),
        Auth::Header(value) => {
            let value = HeaderValue::from_str(&value)
                .map_err(|_| Error::Transport("invalid authorization header".to_string()))?;
            Ok(req.header(AUTHORIZATION, value))
        }
    }
}

/// Reads the body and converts unexpected statuses into errors, surfacing
/// any standard OAuth error document the provider sent along.
async fn read_response(res: reqwest::Response) -> Result<String, Error> {
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    if status.is_success() {
        return Ok(body);
    }

    if let Some(err) = upstream_error_from_body(&body) {
        return Err(err);
    }

    Err(Error::Transport(format!("unexpected status {status}")))
}
