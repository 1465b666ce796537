use tokio::sync::watch;
use tokio::time::{interval, Duration};
use tokio_util::sync::{CancellationToken, DropGuard};

pub const RESEND_COOLDOWN_SECS: u64 = 30;

/// Countdown that gates the "resend code" action.
///
/// A background task ticks once per second and publishes the seconds left
/// on a watch channel. Dropping the cooldown (or restarting it) cancels the
/// task.
pub struct ResendCooldown {
    remaining: watch::Receiver<u64>,
    _guard: Option<DropGuard>,
}

impl ResendCooldown {
    /// A cooldown that has already elapsed.
    pub fn idle() -> Self {
        let (_tx, remaining) = watch::channel(0);
        Self {
            remaining,
            _guard: None,
        }
    }

    pub fn start() -> Self {
        Self::start_with(RESEND_COOLDOWN_SECS)
    }

    pub fn start_with(seconds: u64) -> Self {
        let (tx, remaining) = watch::channel(seconds);
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            // the first tick completes immediately
            ticker.tick().await;

            let mut left = seconds;
            while left > 0 {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => return,
                    _ = ticker.tick() => {
                        left -= 1;
                        if tx.send(left).is_err() {
                            return;
                        }
                    }
                }
            }
            log::debug!("Resend cooldown elapsed");
        });

        Self {
            remaining,
            _guard: Some(token.drop_guard()),
        }
    }

    pub fn remaining(&self) -> u64 {
        *self.remaining.borrow()
    }

    pub fn can_resend(&self) -> bool {
        self.remaining() == 0
    }

    pub fn restart(&mut self) {
        *self = Self::start();
    }

    /// Receiver for rendering the countdown as it changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }
}
