use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// The release check must never hold up page rendering.
const FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// A published release, as exposed by a GitHub-style latest-release endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    /// Release version, e.g. `1.2.0` or `v1.2.0`.
    pub name: String,
    /// Link to the release page.
    pub html_url: String,
}

/// Best-effort check for a newer release.
///
/// One fetch, short timeout, no retry. Returns `Some` only when the endpoint
/// answered with a release whose version is strictly newer than
/// `current_version`; every failure mode (network, status, body shape, not
/// newer) collapses to `None`.
pub async fn check_latest(api_url: &str, current_version: &str) -> Option<ReleaseInfo> {
    match fetch_latest(api_url).await {
        Ok(release) if is_newer(&release.name, current_version) => {
            tracing::info!("New release available: {}", release.name);
            Some(release)
        }
        Ok(release) => {
            tracing::debug!(
                "No newer release ({} vs current {})",
                release.name,
                current_version
            );
            None
        }
        Err(err) => {
            tracing::debug!("Release check failed: {:#}", err);
            None
        }
    }
}

async fn fetch_latest(api_url: &str) -> Result<ReleaseInfo> {
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!("formgate/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let release: ReleaseInfo = client
        .get(api_url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    anyhow::ensure!(!release.name.is_empty(), "release has no version name");
    Ok(release)
}

/// Dotted-numeric version comparison, tolerant of a leading `v` and of
/// non-numeric components (which compare as 0).
fn is_newer(candidate: &str, current: &str) -> bool {
    fn components(version: &str) -> Vec<u64> {
        version
            .trim()
            .trim_start_matches('v')
            .split('.')
            .map(|part| part.trim().parse().unwrap_or(0))
            .collect()
    }
    components(candidate) > components(current)
}
