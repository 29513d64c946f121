//! Fixed-interval polling with a bounded attempt count.
//!
//! [`poll_until`] is the one polling loop in the crate. Callers supply a
//! probe that classifies each reading as done, failed, or still running;
//! the loop owns timing, the attempt ceiling, and cancellation.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Default delay between two probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of probes before giving up (a 5-minute ceiling at
/// the default interval).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Tunable parameters for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between the end of one probe and the start of the next.
    pub interval: Duration,
    /// Total number of probes, including the first.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    /// Worst-case wall time spent sleeping between probes.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Classification of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T, E> {
    /// Terminal success.
    Done(T),
    /// Terminal failure.
    Failed(E),
    /// Not terminal yet; probe again after the interval.
    Continue,
}

/// Why a polling loop ended without success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError<E> {
    /// The probe reported a terminal failure.
    Failed(E),
    /// `max_attempts` probes ran without a terminal result.
    Exhausted { attempts: u32 },
    /// The cancellation token fired between probes.
    Cancelled,
}

/// Run `probe` until it reports a terminal step.
///
/// The first probe runs immediately; later probes wait
/// `config.interval`. `probe` receives the 1-based attempt number.
/// Probes never overlap. Cancellation is checked before each probe and
/// while sleeping, but an in-flight probe is allowed to finish.
pub async fn poll_until<T, E, F, Fut>(
    config: &PollConfig,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = PollStep<T, E>>,
{
    for attempt in 1..=config.max_attempts {
        if attempt > 1 {
            tokio::select! {
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(config.interval) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }

        match probe(attempt).await {
            PollStep::Done(value) => return Ok(value),
            PollStep::Failed(err) => return Err(PollError::Failed(err)),
            PollStep::Continue => {}
        }
    }

    Err(PollError::Exhausted {
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;

    fn fast(max_attempts: u32) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    #[test]
    fn default_is_five_minutes() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 60);
        assert_eq!(config.ceiling(), Duration::from_secs(295));
    }

    #[tokio::test]
    async fn done_on_first_probe_does_not_sleep() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, PollError<()>> =
            poll_until(&PollConfig::default(), &CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { PollStep::Done("ok") }
            })
            .await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn done_after_several_probes() {
        let result: Result<u32, PollError<()>> =
            poll_until(&fast(10), &CancellationToken::new(), |attempt| async move {
                if attempt == 4 {
                    PollStep::Done(attempt)
                } else {
                    PollStep::Continue
                }
            })
            .await;
        assert_eq!(result, Ok(4));
    }

    #[tokio::test]
    async fn failure_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<(), PollError<&str>> =
            poll_until(&fast(10), &CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { PollStep::Failed("backend said no") }
            })
            .await;
        assert_eq!(result, Err(PollError::Failed("backend said no")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_after_exactly_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), PollError<()>> =
            poll_until(&fast(60), &CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { PollStep::Continue }
            })
            .await;
        assert_eq!(result, Err(PollError::Exhausted { attempts: 60 }));
        assert_eq!(calls.load(Ordering::SeqCst), 60);
    }

    #[tokio::test]
    async fn zero_attempts_never_probes() {
        let calls = AtomicU32::new(0);
        let result: Result<(), PollError<()>> =
            poll_until(&fast(0), &CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { PollStep::Continue }
            })
            .await;
        assert_eq!(result, Err(PollError::Exhausted { attempts: 0 }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_probe() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);
        let result: Result<(), PollError<()>> = poll_until(&fast(5), &cancel, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { PollStep::Continue }
        })
        .await;
        assert_eq!(result, Err(PollError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_sleep_stops_further_probes() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let task = {
            let cancel = cancel.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                poll_until::<(), (), _, _>(&PollConfig::default(), &cancel, |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { PollStep::Continue }
                })
                .await
            })
        };

        // Two probes: at t=0 and t=5s.
        tokio::time::sleep(Duration::from_secs(7)).await;
        cancel.cancel();

        let result = task.await.unwrap();
        assert_matches!(result, Err(PollError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn probes_are_spaced_by_the_interval() {
        let start = tokio::time::Instant::now();
        let result: Result<Duration, PollError<()>> =
            poll_until(&PollConfig::default(), &CancellationToken::new(), |attempt| async move {
                if attempt == 3 {
                    PollStep::Done(start.elapsed())
                } else {
                    PollStep::Continue
                }
            })
            .await;
        assert_eq!(result, Ok(Duration::from_secs(10)));
    }
}
