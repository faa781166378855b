use futures::StreamExt;
use std::time::Duration;

/// Outcome of probing one candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The response looked like a feed; holds the URL after redirects.
    Found(String),
    /// Transport failure, or content that does not look like a feed.
    NotFound,
}

/// Settings for a single probe.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    /// Bound on the whole probe: request, redirects and body sample.
    pub timeout: Duration,
    /// Number of leading body bytes handed to the content sniff.
    pub sample_bytes: usize,
    /// Skip the sniff for non-2xx responses.
    pub require_success_status: bool,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            sample_bytes: 512,
            require_success_status: false,
        }
    }
}

/// Joins a site base URL and a candidate path with exactly one `/`.
///
/// The empty candidate yields the site root with a trailing slash.
pub fn probe_url(base_url: &str, candidate: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), candidate)
}

/// Heuristic content sniff for RSS/Atom documents.
///
/// Matches samples mentioning `feed` or `xml`, except those mentioning
/// `xhtml`, which is how ordinary HTML pages with an XML doctype or
/// namespace show up.
pub fn looks_like_feed(sample: &[u8]) -> bool {
    let content = String::from_utf8_lossy(sample);
    !content.contains("xhtml") && (content.contains("feed") || content.contains("xml"))
}

/// Probes one candidate path below `base_url`.
///
/// Every failure mode collapses into [`ProbeOutcome::NotFound`]: the
/// candidate is simply assumed absent. The response is consumed or dropped
/// before returning, so its connection goes back to the client's pool.
pub async fn probe(
    client: &reqwest::Client,
    base_url: &str,
    candidate: &str,
    settings: ProbeSettings,
) -> ProbeOutcome {
    let url = probe_url(base_url, candidate);
    tracing::debug!(url = %url, "Trying path");

    match tokio::time::timeout(settings.timeout, fetch_sample(client, &url, settings)).await {
        Ok(Ok(Some((final_url, sample)))) => {
            if looks_like_feed(&sample) {
                ProbeOutcome::Found(final_url)
            } else {
                ProbeOutcome::NotFound
            }
        }
        Ok(Ok(None)) => ProbeOutcome::NotFound,
        Ok(Err(e)) => {
            tracing::debug!(url = %url, error = %e, "Probe failed");
            ProbeOutcome::NotFound
        }
        Err(_) => {
            tracing::debug!(
                url = %url,
                timeout_secs = settings.timeout.as_secs(),
                "Probe timed out"
            );
            ProbeOutcome::NotFound
        }
    }
}

/// Sends the GET and reads up to `sample_bytes` of the body.
///
/// Returns `Ok(None)` when the status check rejects the response.
async fn fetch_sample(
    client: &reqwest::Client,
    url: &str,
    settings: ProbeSettings,
) -> Result<Option<(String, Vec<u8>)>, reqwest::Error> {
    let response = client.get(url).send().await?;

    if settings.require_success_status && !response.status().is_success() {
        tracing::debug!(url = %url, status = %response.status(), "Skipping non-success response");
        return Ok(None);
    }

    let final_url = response.url().to_string();
    let limit = settings.sample_bytes;
    let mut sample = Vec::with_capacity(limit);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let remaining = limit - sample.len();
        sample.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
        if sample.len() >= limit {
            break;
        }
    }

    Ok(Some((final_url, sample)))
}
