//! Discovery engine: fetches the well-known configuration and JWKS, and
//! keeps each provider's snapshot fresh on a daily cadence.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::http::{get_json, Auth};
use crate::provider::Provider;
use crate::types::{Error, JwkSet, WellKnown};

/// Background refresh cadence after a successful initial discovery.
const REFRESH_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Fetches `<url>/.well-known/openid-configuration` and, when the document
/// advertises a `jwks_uri`, the key set behind it.
pub(crate) async fn discover(
    client: &reqwest::Client,
    provider: &Provider,
) -> Result<WellKnown, Error> {
    let config_url = format!(
        "{}/.well-known/openid-configuration",
        provider.url().trim_end_matches('/')
    );

    let body = get_json(client, &config_url, Auth::None).await?;
    let mut well_known: WellKnown = serde_json::from_str(&body)
        .map_err(|e| Error::Discovery(format!("invalid well-known document: {e}")))?;

    well_known.apply_revocation_alias();

    if let Some(jwks_uri) = well_known.jwks_uri.clone() {
        let body = get_json(client, &jwks_uri, Auth::None).await?;
        let jwks: JwkSet = serde_json::from_str(&body)
            .map_err(|e| Error::Discovery(format!("invalid jwks document: {e}")))?;
        well_known.jwks = jwks;
    }

    Ok(well_known)
}

/// Runs initial discovery for `provider` and installs the snapshot.
/// Providers carrying a preset stub are left untouched.
pub(crate) async fn discover_into(
    client: &reqwest::Client,
    provider: &Provider,
) -> Result<(), Error> {
    if provider.skip_discovery() {
        return Ok(());
    }

    match discover(client, provider).await {
        Ok(well_known) => {
            provider.apply_snapshot(well_known);
            Ok(())
        }
        Err(err) => {
            provider.record_error(err.to_string());
            Err(err)
        }
    }
}

/// Periodic re-discovery for a registered provider. On success the snapshot
/// is swapped; on failure the old snapshot keeps serving and the error slot
/// records the failure.
pub(crate) async fn refresh_loop(client: reqwest::Client, provider: Arc<Provider>) {
    if provider.skip_discovery() {
        return;
    }

    let mut ticker = tokio::time::interval(REFRESH_PERIOD);
    // The first tick completes immediately; discovery already ran.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match discover(&client, &provider).await {
            Ok(well_known) => {
                provider.apply_snapshot(well_known);
                debug!(provider = provider.name(), "refreshed provider metadata");
            }
            Err(err) => {
                provider.record_error(err.to_string());
                warn!(
                    provider = provider.name(),
                    error = %err,
                    "provider metadata refresh failed"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "./tests/discovery_tests.rs"]
mod discovery_tests;
