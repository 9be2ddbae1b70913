use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};

/// Source of scheduler ticks
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick. Returns false once no more ticks will come.
    async fn tick(&mut self) -> bool;
}

/// Wall-clock ticker; the first tick fires immediately
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticker driven by hand through a channel
pub struct ChannelTicker {
    rx: mpsc::Receiver<()>,
}

impl ChannelTicker {
    /// Create a ticker and the sender that fires it
    pub fn channel() -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(16);
        (tx, Self { rx })
    }
}

#[async_trait]
impl Ticker for ChannelTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_fires_immediately_then_every_period() {
        let start = Instant::now();
        let mut ticker = IntervalTicker::new(Duration::from_secs(300));

        assert!(ticker.tick().await);
        assert_eq!(start.elapsed(), Duration::ZERO);

        assert!(ticker.tick().await);
        assert_eq!(start.elapsed(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_channel_ticker_ends_when_sender_dropped() {
        let (tx, mut ticker) = ChannelTicker::channel();
        tx.send(()).await.unwrap();
        drop(tx);

        assert!(ticker.tick().await);
        assert!(!ticker.tick().await);
    }
}
