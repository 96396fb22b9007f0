//! Download file names: `ai-song-<epoch-millis>.mid`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl<F> Clock for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn now_millis(&self) -> u64 {
        self()
    }
}

/// Hands out download names whose stamps never go backwards, even if the
/// clock does.
pub struct DownloadNamer {
    clock: Box<dyn Clock>,
    last: AtomicU64,
}

impl DownloadNamer {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            last: AtomicU64::new(0),
        }
    }

    pub fn next_name(&self) -> String {
        let now = self.clock.now_millis();
        let stamp = self.last.fetch_max(now, Ordering::SeqCst).max(now);
        format!("ai-song-{}.mid", stamp)
    }
}

impl Default for DownloadNamer {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

/// Extract the stamp from a name produced by [`DownloadNamer`].
pub fn parse_stamp(name: &str) -> Option<u64> {
    name.strip_prefix("ai-song-")?
        .strip_suffix(".mid")?
        .parse()
        .ok()
}
