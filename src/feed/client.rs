use crate::config::Config;
use reqwest::redirect::Policy;

/// Builds the HTTP client shared by every probe.
///
/// The client carries the per-request timeout and the redirect policy; the
/// connection pool inside it is reused across sites and candidates.
pub fn build_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy(config.max_redirects))
        .user_agent(config.user_agent.clone())
        .timeout(config.probe_timeout())
        .connect_timeout(config.probe_timeout())
        .pool_idle_timeout(std::time::Duration::from_secs(30)) // Close idle connections promptly
        .build()
}

/// Follows up to `max_hops` redirects and stops on loops.
///
/// The final URL of a probe is whatever this policy lands on, which is what
/// gets recorded as the site's feed.
fn create_redirect_policy(max_hops: usize) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= max_hops {
            return attempt.error(format!("Too many redirects (max {max_hops})"));
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}
