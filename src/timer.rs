//! Cancellable reconnect timer

use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep};

/// Single fixed-delay timer owned by the supervisor
///
/// At most one deadline is armed at a time. Awaiting [`ReconnectTimer::fired`]
/// on a disarmed timer never completes, which lets it sit in a `select!`
/// alongside the other event sources.
#[derive(Debug)]
pub struct ReconnectTimer {
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ReconnectTimer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, sleep: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm (or re-arm) the timer for one delay from now
    pub fn arm(&mut self) {
        self.sleep = Some(Box::pin(sleep(self.delay)));
    }

    /// Disarm without firing
    pub fn cancel(&mut self) {
        self.sleep = None;
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Deadline of the armed timer
    pub fn deadline(&self) -> Option<Instant> {
        self.sleep.as_ref().map(|sleep| sleep.deadline())
    }

    /// Wait for the armed deadline, then disarm
    ///
    /// Cancel safe: dropping the future before it completes leaves the timer
    /// armed with the same deadline.
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay_and_disarms() {
        let mut timer = ReconnectTimer::new(Duration::from_millis(3000));
        let start = Instant::now();

        timer.arm();
        assert!(timer.is_armed());
        timer.fired().await;

        assert!(start.elapsed() >= Duration::from_millis(3000));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let mut timer = ReconnectTimer::new(Duration::from_millis(3000));
        timer.arm();
        timer.cancel();

        let result = tokio::time::timeout(Duration::from_secs(10), timer.fired()).await;
        assert!(result.is_err());
        assert_eq!(timer.deadline(), None);
    }
}
