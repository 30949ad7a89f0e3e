//! Confirmation poller: bounded fixed-interval retry until a condition holds.
//!
//! Each attempt sleeps `interval` and then probes. The whole loop runs under one
//! `tokio::time::timeout`, so the deadline holds even in the middle of a sleep or a read.
//! Polls never overlap, and the loop only reads, so dropping it at any point is safe.

use crate::config::PollConfig;
use crate::fetcher::{StateFetcher, TowerState};
use crate::rpc::ContractReader;
use std::future::Future;
use tokio::time::{sleep, Duration, Instant};

/// Run `probe` every `interval` until it returns `Some`, or give up after `timeout`.
pub async fn poll_until<T, F, Fut>(interval: Duration, timeout: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let attempts = async {
        let mut attempt = 0u32;
        loop {
            sleep(interval).await;
            attempt += 1;
            if let Some(v) = probe().await {
                return v;
            }
            tracing::trace!(attempt, "poll condition not met");
        }
    };
    tokio::time::timeout(timeout, attempts).await.ok()
}

/// Wait until the fetched height is numerically above `baseline`.
///
/// `None` means the timeout elapsed without an observable increase ("still confirming"),
/// which is an expected outcome, not a failure.
pub async fn await_height_increase<R: ContractReader>(
    fetcher: &StateFetcher<R>,
    baseline: &str,
    poll: &PollConfig,
) -> Option<TowerState> {
    let started = Instant::now();
    let result = poll_until(poll.interval, poll.timeout, move || async move {
        let snapshot = fetcher.fetch_state().await;
        if snapshot.state.height_exceeds(baseline) {
            Some(snapshot.state)
        } else {
            None
        }
    })
    .await;
    match &result {
        Some(state) => tracing::info!(
            baseline,
            height = %state.height,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "height increase observed"
        ),
        None => tracing::info!(
            baseline,
            timeout_secs = poll.timeout.as_secs(),
            "no height increase before timeout"
        ),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clarity::RawValue;
    use crate::config::{ContractId, NetworkKind, TowerConfig};
    use crate::error::ReadError;
    use crate::fetcher::FN_GET_HEIGHT;
    use crate::rpc::ReadOnlyCall;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio_test::{assert_pending, assert_ready};

    /// Serves heights in order; the last one repeats.
    struct HeightSequence(Mutex<VecDeque<&'static str>>);

    #[async_trait]
    impl ContractReader for HeightSequence {
        async fn call_read_only(&self, call: &ReadOnlyCall) -> Result<RawValue, ReadError> {
            if call.function_name != FN_GET_HEIGHT {
                return Ok(RawValue::Optional(None));
            }
            let mut q = self.0.lock().unwrap();
            let h = if q.len() > 1 { q.pop_front() } else { q.front().copied() };
            Ok(RawValue::UInt(h.map(str::to_string)))
        }
    }

    fn fetcher(heights: &[&'static str]) -> StateFetcher<HeightSequence> {
        let config = TowerConfig::new(NetworkKind::Testnet, ContractId::new("ST1", "stacks-tower"));
        StateFetcher::new(HeightSequence(Mutex::new(heights.iter().copied().collect())), config)
    }

    fn poll(timeout_secs: u64) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(4),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_on_second_read_not_earlier() {
        let f = fetcher(&["5", "6"]);
        let cfg = poll(12);
        let mut task = tokio_test::task::spawn(await_height_increase(&f, "5", &cfg));
        assert_pending!(task.poll());
        tokio::time::advance(Duration::from_millis(4_001)).await;
        assert_pending!(task.poll());
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_pending!(task.poll());
        tokio::time::advance(Duration::from_secs(1)).await;
        let state = assert_ready!(task.poll()).expect("increase observed");
        assert_eq!(state.height, "6");
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_timeout_not_next_read() {
        let f = fetcher(&["5"]);
        let start = Instant::now();
        let out = await_height_increase(&f, "5", &poll(5)).await;
        assert!(out.is_none());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(6), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn compares_heights_numerically() {
        let f = fetcher(&["10"]);
        let out = await_height_increase(&f, "9", &poll(12)).await;
        assert_eq!(out.map(|s| s.height), Some("10".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_probes_sequentially() {
        let probes = AtomicUsize::new(0);
        let start = Instant::now();
        let out = poll_until(Duration::from_secs(1), Duration::from_secs(10), || {
            let n = probes.fetch_add(1, Ordering::SeqCst) + 1;
            async move { (n == 3).then_some(n) }
        })
        .await;
        assert_eq!(out, Some(3));
        assert_eq!(probes.load(Ordering::SeqCst), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(4), "elapsed {:?}", elapsed);
    }
}
