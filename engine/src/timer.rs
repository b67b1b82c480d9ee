//! Cancellable one-shot deadline behind every stage window and speaking turn.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// A single armed deadline.
///
/// The timer owns a background task racing the deadline against its
/// cancellation token. Cancelling (or dropping) the timer guarantees the
/// deadline future never runs afterwards; drivers additionally guard their
/// deadline handlers with an epoch check, so a handler that already started
/// when the cancel landed still no-ops.
pub struct StageTimer {
    token: CancellationToken,
}

impl StageTimer {
    /// Arm a deadline `duration` from now.
    pub fn spawn<F>(duration: Duration, deadline: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let armed = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = armed.cancelled() => {}
                _ = tokio::time::sleep(duration) => deadline.await,
            }
        });
        Self { token }
    }

    /// Arm a deadline with a warning fired `warn_before` ahead of it.
    ///
    /// When the window is too short to fit the warning (`warn_before` is zero
    /// or at least `duration`), only the deadline fires.
    pub fn spawn_with_warning<W, F>(
        duration: Duration,
        warn_before: Duration,
        warning: W,
        deadline: F,
    ) -> Self
    where
        W: Future<Output = ()> + Send + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let lead = duration.saturating_sub(warn_before);
        if lead.is_zero() || warn_before.is_zero() {
            return Self::spawn(duration, deadline);
        }

        let token = CancellationToken::new();
        let armed = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = armed.cancelled() => return,
                _ = tokio::time::sleep(lead) => warning.await,
            }
            tokio::select! {
                _ = armed.cancelled() => {}
                _ = tokio::time::sleep(warn_before) => deadline.await,
            }
        });
        Self { token }
    }

    /// Disarm. Idempotent; safe to call after the deadline already fired.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_once_after_the_duration() {
        let fired = Arc::new(AtomicU32::new(0));
        let seen = fired.clone();
        let _timer = StageTimer::spawn(Duration::from_secs(10), async move {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_the_deadline() {
        let fired = Arc::new(AtomicU32::new(0));
        let seen = fired.clone();
        let timer = StageTimer::spawn(Duration::from_secs(10), async move {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        timer.cancel();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn warning_precedes_the_deadline() {
        let warned = Arc::new(AtomicU32::new(0));
        let fired = Arc::new(AtomicU32::new(0));
        let w = warned.clone();
        let f = fired.clone();
        let _timer = StageTimer::spawn_with_warning(
            Duration::from_secs(30),
            Duration::from_secs(10),
            async move {
                w.fetch_add(1, Ordering::SeqCst);
            },
            async move {
                f.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(warned.load(Ordering::SeqCst), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn short_window_skips_the_warning() {
        let warned = Arc::new(AtomicU32::new(0));
        let fired = Arc::new(AtomicU32::new(0));
        let w = warned.clone();
        let f = fired.clone();
        let _timer = StageTimer::spawn_with_warning(
            Duration::from_secs(5),
            Duration::from_secs(10),
            async move {
                w.fetch_add(1, Ordering::SeqCst);
            },
            async move {
                f.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(warned.load(Ordering::SeqCst), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_disarms_it() {
        let fired = Arc::new(AtomicU32::new(0));
        let seen = fired.clone();
        let timer = StageTimer::spawn(Duration::from_secs(10), async move {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        drop(timer);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
