//! Poll-until-predicate primitive shared by the challenge gate and the
//! download watcher.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;

/// Repeatedly evaluate `probe` until it returns `true` or `timeout` elapses.
/// The probe runs once immediately, so an already-satisfied predicate never
/// waits. Returns whether the predicate was satisfied.
pub async fn poll_until<F, Fut>(interval: Duration, timeout: Duration, mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    loop {
        if probe().await {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_immediate_success_skips_waiting() {
        let start = Instant::now();
        let ok = poll_until(Duration::from_secs(5), Duration::from_secs(5), || async {
            true
        })
        .await;
        assert!(ok);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_eventual_success() {
        let mut calls = 0;
        let ok = poll_until(Duration::from_millis(1), Duration::from_secs(5), || {
            calls += 1;
            let done = calls >= 3;
            async move { done }
        })
        .await;
        assert!(ok);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_timeout() {
        let ok = poll_until(
            Duration::from_millis(5),
            Duration::from_millis(20),
            || async { false },
        )
        .await;
        assert!(!ok);
    }
}
