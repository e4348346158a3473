//! Round-robin rotation over a fixed pool of YouTube Data API keys.
//!
//! Each key carries its own daily quota, so spreading requests across the pool lets the
//! browser keep working long after any single key would have run dry. The rotator does
//! not track quota itself: a key that was rejected is offered again on the next cycle,
//! and it is up to the caller (see [`crate::youtube_api::retry`]) to move past it.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum time between two consecutive key issuances.
pub const MIN_KEY_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug)]
struct RotatorState {
    /// Index of the key the next call to [`KeyRotator::issue`] hands out.
    next_index: usize,
    last_issued_index: Option<usize>,
    last_issued_at: Option<Instant>,
}

/// Hands out API keys from a fixed pool in a rotating order.
///
/// The pool is fixed at construction and is never empty. All mutable rotation state sits
/// behind an async mutex, so a rotator can be shared (typically through an `Arc`) between
/// concurrently running fetch tasks. Throttle waits only suspend the issuing task.
#[derive(Debug)]
pub struct KeyRotator {
    keys: Vec<String>,
    min_interval: Duration,
    state: Mutex<RotatorState>,
}

impl KeyRotator {
    /// Creates a rotator over `keys` with the default [`MIN_KEY_INTERVAL`].
    pub fn new(keys: Vec<String>) -> eyre::Result<Self> {
        Self::with_interval(keys, MIN_KEY_INTERVAL)
    }

    /// Creates a rotator over `keys` that waits at least `min_interval` between issuances.
    pub fn with_interval(keys: Vec<String>, min_interval: Duration) -> eyre::Result<Self> {
        if keys.is_empty() {
            eyre::bail!("API key pool must contain at least one key");
        }
        Ok(Self {
            keys,
            min_interval,
            state: Mutex::new(RotatorState {
                next_index: 0,
                last_issued_index: None,
                last_issued_at: None,
            }),
        })
    }

    /// Number of keys in the pool.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always `false`; a rotator cannot be built over an empty pool.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the key that the next [`Self::issue`] will hand out.
    pub async fn current_index(&self) -> usize {
        self.state.lock().await.next_index
    }

    /// Issues the next key in the rotation.
    ///
    /// If the previous issuance happened less than the minimum interval ago, this waits
    /// for the remainder of the interval before handing out the key. The key and its slot
    /// are claimed before waiting, so the wait does not hold up [`Self::force_advance`]
    /// or other callers.
    pub async fn issue(&self) -> String {
        let (index, wait) = {
            let mut state = self.state.lock().await;

            // a full cycle has come back around to the key we just handed out
            if state.last_issued_index == Some(state.next_index) {
                state.next_index = 0;
            }

            let now = Instant::now();
            let wait = state
                .last_issued_at
                .map(|last| (last + self.min_interval).saturating_duration_since(now))
                .unwrap_or(Duration::ZERO);

            let index = state.next_index;
            state.last_issued_index = Some(index);
            state.last_issued_at = Some(now + wait);
            state.next_index = (index + 1) % self.keys.len();
            (index, wait)
        };

        if !wait.is_zero() {
            tracing::trace!(?wait, "throttling API key issuance");
            tokio::time::sleep(wait).await;
        }

        tracing::debug!(
            key_index = index,
            key_count = self.keys.len(),
            "using API key"
        );
        self.keys[index].clone()
    }

    /// Skips ahead to the next key without waiting, and returns it.
    ///
    /// The returned key is the one the following [`Self::issue`] hands out.
    pub async fn force_advance(&self) -> String {
        let mut state = self.state.lock().await;
        state.next_index = (state.next_index + 1) % self.keys.len();
        tracing::debug!(key_index = state.next_index, "manually rotated API key");
        self.keys[state.next_index].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pool(n: usize) -> KeyRotator {
        KeyRotator::new((0..n).map(|i| format!("key-{i}")).collect()).unwrap()
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let err = KeyRotator::new(Vec::new()).unwrap_err();
        assert!(err.to_string().contains("at least one key"), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cycle_issues_every_key_once() {
        let keys = pool(3);
        let mut issued = Vec::new();
        for _ in 0..3 {
            issued.push(keys.issue().await);
        }
        assert_eq!(issued, vec!["key-0", "key-1", "key-2"]);

        // and the cycle starts over
        assert_eq!(keys.issue().await, "key-0");
        assert_eq!(keys.issue().await, "key-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_key_pool_keeps_issuing_it() {
        let keys = pool(1);
        for _ in 0..4 {
            assert_eq!(keys.issue().await, "key-0");
        }
        assert_eq!(keys.current_index().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_advance_moves_one_position() {
        let keys = pool(4);
        assert_eq!(keys.issue().await, "key-0");
        assert_eq!(keys.current_index().await, 1);

        assert_eq!(keys.force_advance().await, "key-2");
        assert_eq!(keys.current_index().await, 2);

        assert_eq!(keys.force_advance().await, "key-3");
        assert_eq!(keys.force_advance().await, "key-0");
        assert_eq!(keys.current_index().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_advance_onto_last_issued_restarts_cycle() {
        let keys = pool(3);
        assert_eq!(keys.issue().await, "key-0");
        assert_eq!(keys.issue().await, "key-1");
        keys.force_advance().await;
        keys.force_advance().await;
        // next index is now back on the key issued last
        assert_eq!(keys.current_index().await, 1);
        assert_eq!(keys.issue().await, "key-0");
        assert_eq!(keys.current_index().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_waits_out_min_interval() {
        let keys = pool(2);
        let start = Instant::now();
        keys.issue().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        keys.issue().await;
        assert!(start.elapsed() >= MIN_KEY_INTERVAL, "{:?}", start.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_only_waits_remaining_interval() {
        let keys = pool(2);
        keys.issue().await;
        tokio::time::advance(Duration::from_millis(150)).await;

        let before = Instant::now();
        keys.issue().await;
        let waited = before.elapsed();
        assert!(waited >= Duration::from_millis(50), "{waited:?}");
        assert!(waited < MIN_KEY_INTERVAL, "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_elapsed() {
        let keys = pool(2);
        keys.issue().await;
        tokio::time::advance(MIN_KEY_INTERVAL).await;

        let before = Instant::now();
        keys.issue().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_advance_does_not_wait_behind_throttled_issue() {
        let keys = std::sync::Arc::new(pool(3));
        assert_eq!(keys.issue().await, "key-0");

        let waiting = tokio::spawn({
            let keys = std::sync::Arc::clone(&keys);
            async move { keys.issue().await }
        });
        // let the spawned issue claim its key and start waiting out the interval
        tokio::task::yield_now().await;
        assert_eq!(keys.current_index().await, 2);

        let before = Instant::now();
        assert_eq!(keys.force_advance().await, "key-0");
        assert_eq!(before.elapsed(), Duration::ZERO);

        assert_eq!(waiting.await.unwrap(), "key-1");
        assert!(before.elapsed() >= MIN_KEY_INTERVAL, "{:?}", before.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_issues_are_spaced_out() {
        let keys = std::sync::Arc::new(pool(3));
        let start = Instant::now();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let keys = std::sync::Arc::clone(&keys);
                tokio::spawn(async move {
                    keys.issue().await;
                    Instant::now()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap() - start);
        }
        finished.sort();
        assert_eq!(finished[0], Duration::ZERO);
        assert!(finished[1] >= MIN_KEY_INTERVAL, "{finished:?}");
        assert!(finished[2] >= MIN_KEY_INTERVAL * 2, "{finished:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_advance_is_not_throttled() {
        let keys = pool(3);
        keys.issue().await;
        let before = Instant::now();
        keys.force_advance().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
