use std::time::Duration;

use rand::Rng;

/// Human-ish pauses between page interactions.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    enabled: bool,
}

impl Pacer {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// A pacer that never sleeps.
    pub fn instant() -> Self {
        Self { enabled: false }
    }

    /// Sleep for a random duration in `[min_secs, max_secs]` seconds.
    pub async fn between(&self, min_secs: u64, max_secs: u64) {
        if !self.enabled {
            return;
        }
        let delay = pick_delay(min_secs, max_secs);
        tracing::trace!(?delay, "pause");
        tokio::time::sleep(delay).await;
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new()
    }
}

fn pick_delay(min_secs: u64, max_secs: u64) -> Duration {
    let lo = min_secs * 1000;
    let hi = max_secs.max(min_secs) * 1000;
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}
