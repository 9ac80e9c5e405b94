//! Randomized pacing between browser actions.
//!
//! These pauses exist to keep the session's traffic profile close to a
//! single human user; none of them are needed for correctness.

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::debug;

/// Between rows and other page actions.
const INTER_ACTION_SECS: RangeInclusive<f64> = 4.0..=10.0;
/// Between distinct searched names.
const BETWEEN_NAMES_SECS: RangeInclusive<f64> = 10.0..=15.0;
/// Between injected keystrokes.
const KEYSTROKE_SECS: RangeInclusive<f64> = 0.1..=0.3;

pub async fn inter_action() {
    pause(INTER_ACTION_SECS).await;
}

pub async fn between_names() {
    pause(BETWEEN_NAMES_SECS).await;
}

pub async fn keystroke() {
    pause(KEYSTROKE_SECS).await;
}

async fn pause(range: RangeInclusive<f64>) {
    let secs = {
        let mut rng = rand::thread_rng();
        rng.gen_range(range)
    };
    debug!("pausing {:.1}s", secs);
    sleep(Duration::from_secs_f64(secs)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_keystroke_pause_stays_in_range() {
        let start = Instant::now();
        keystroke().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_secs(1));
    }
}
