//! Auto-detect search service version via HTTP.
//!
//! The root endpoint (`GET /`) of a search node reports its release in
//! `version.number`. The release is mapped to a `ServiceVersion` profile so
//! the client can pick matching request and response shapes.

use reqwest::Client;
use search_client::ServiceVersion;
use semver::Version;
use serde_json::Value;

/// Auto-detect the service version via HTTP GET to the root endpoint.
///
/// # Arguments
///
/// * `host` - Base URL of the search node, e.g. `http://localhost:9200`
/// * `timeout` - Request timeout
///
/// # Example responses from /:
///
/// - `{"version": {"number": "0.90.13"}}` -> V0_90
/// - `{"version": {"number": "1.5.2"}}` -> V1
/// - `{"version": {"number": "7.17.9"}}` -> V7
pub async fn detect_server_version(
    host: &str,
    timeout: std::time::Duration,
) -> anyhow::Result<ServiceVersion> {
    let root_url = format!("{}/", host.trim_end_matches('/'));

    tracing::debug!("Detecting search service version at {root_url}");

    let client = Client::builder().timeout(timeout).build()?;

    let response = client
        .get(&root_url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to fetch service version from '{root_url}': {e}"))?;

    if !response.status().is_success() {
        let status = response.status();
        return Err(anyhow::anyhow!(
            "Version endpoint returned status {status}: {root_url}"
        ));
    }

    let body: Value = response.json().await.map_err(|e| {
        anyhow::anyhow!("Failed to read version response from '{root_url}': {e}")
    })?;

    parse_root_response(&body)
}

/// Extract the release number from a root endpoint response.
pub fn parse_root_response(body: &Value) -> anyhow::Result<ServiceVersion> {
    let number = body
        .get("version")
        .and_then(|v| v.get("number"))
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("Root response has no 'version.number' field: {body}"))?;

    parse_version_string(number)
}

/// Parse a release number like "1.5.2" or "8.0.0-SNAPSHOT".
///
/// Returns the version profile covering that release.
pub fn parse_version_string(version_string: &str) -> anyhow::Result<ServiceVersion> {
    let version_string = version_string.trim();

    tracing::debug!("Parsing service version string: '{version_string}'");

    let version = Version::parse(version_string).map_err(|e| {
        anyhow::anyhow!("Failed to parse service version '{version_string}': {e}")
    })?;

    let profile = ServiceVersion::from_release(version.major, version.minor)
        .map_err(|_| anyhow::anyhow!("Unsupported service version: {version}"))?;

    tracing::info!("Detected search service version {version} (profile {profile})");

    Ok(profile)
}
