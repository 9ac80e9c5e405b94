//! Anti-bot challenge gate.
//!
//! The portal interposes a Cloudflare interstitial before the results page.
//! Nothing here tries to solve it: the gate only recognizes that the current
//! location denotes a challenge and waits for it to pass, giving up after a
//! bounded time.

use std::future::Future;
use std::time::{Duration, Instant};

use chromiumoxide::Page;
use tracing::{debug, info, warn};

use crate::browser::poll::poll_until;
use crate::error::ScraperError;

const CHALLENGE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Address fragments that mark a challenge interstitial.
const CHALLENGE_MARKERS: &[&str] = &[
    "__cf_chl",
    "cdn-cgi/challenge-platform",
    "challenges.cloudflare.com",
];

/// Whether `address` denotes an anti-bot challenge page.
pub fn is_challenge_address(address: &str) -> bool {
    let address = address.to_ascii_lowercase();
    CHALLENGE_MARKERS.iter().any(|m| address.contains(m))
}

/// Wait until the address reported by `probe` no longer denotes a challenge.
///
/// Returns immediately when the first reading is clear. A failed probe is
/// logged and treated as "still blocked" rather than fatal; only the overall
/// timeout ends the wait.
pub async fn wait_clear_with<F, Fut>(
    timeout: Duration,
    mut probe: F,
) -> Result<(), ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, ScraperError>>,
{
    let start = Instant::now();

    let cleared = poll_until(CHALLENGE_POLL_INTERVAL, timeout, || {
        let reading = probe();
        async move {
            match reading.await {
                Ok(address) if !is_challenge_address(&address) => true,
                Ok(address) => {
                    debug!("still behind challenge at {}", address);
                    false
                }
                Err(e) => {
                    // Transient read failures happen mid-interstitial reload.
                    debug!("challenge probe failed, retrying: {}", e);
                    false
                }
            }
        }
    })
    .await;

    if cleared {
        if start.elapsed() >= CHALLENGE_POLL_INTERVAL {
            info!("challenge cleared after {:?}", start.elapsed());
        }
        Ok(())
    } else {
        warn!("challenge still present after {:?}", timeout);
        Err(ScraperError::ChallengeTimeout(timeout))
    }
}

/// Gate the given page: suspend until its location stops denoting a
/// challenge or `timeout` elapses.
pub async fn wait_clear(page: &Page, timeout: Duration) -> Result<(), ScraperError> {
    wait_clear_with(timeout, || async move { current_address(page).await }).await
}

/// Read the page's current location from inside the page itself.
pub async fn current_address(page: &Page) -> Result<String, ScraperError> {
    page.evaluate("window.location.href")
        .await
        .map_err(|e| ScraperError::JavaScript(e.to_string()))?
        .into_value::<String>()
        .map_err(|e| ScraperError::JavaScript(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_detection() {
        assert!(is_challenge_address(
            "https://declaratii.integritate.eu/cdn-cgi/challenge-platform/h/b"
        ));
        assert!(is_challenge_address(
            "https://declaratii.integritate.eu/?__cf_chl_tk=abc"
        ));
        assert!(is_challenge_address("https://challenges.cloudflare.com/x"));
        assert!(!is_challenge_address("https://declaratii.integritate.eu/"));
        assert!(!is_challenge_address("about:blank"));
    }

    #[tokio::test]
    async fn test_clear_address_returns_immediately() {
        let mut polls = 0;
        let start = Instant::now();
        wait_clear_with(Duration::from_secs(30), || {
            polls += 1;
            async { Ok("https://declaratii.integritate.eu/".to_string()) }
        })
        .await
        .unwrap();

        assert_eq!(polls, 1);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_never_clearing_challenge_times_out() {
        let err = wait_clear_with(Duration::from_millis(0), || async {
            Ok("https://x/?__cf_chl_tk=1".to_string())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ScraperError::ChallengeTimeout(_)));
    }

    #[tokio::test]
    async fn test_transient_probe_errors_are_tolerated() {
        let mut polls = 0;
        wait_clear_with(Duration::from_secs(30), || {
            polls += 1;
            let current = polls;
            async move {
                if current == 1 {
                    Err(ScraperError::JavaScript("context destroyed".into()))
                } else {
                    Ok("https://declaratii.integritate.eu/".to_string())
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(polls, 2);
    }
}
