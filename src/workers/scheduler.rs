use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::market_updater::{CycleOutcome, MarketUpdater};
use super::ticker::Ticker;

/// Fires an update cycle on every tick until stopped
pub struct Scheduler<T> {
    updater: Arc<MarketUpdater>,
    ticker: T,
}

/// Running scheduler; stop it to shut the loop down cleanly
pub struct SchedulerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl<T: Ticker + 'static> Scheduler<T> {
    pub fn new(updater: Arc<MarketUpdater>, ticker: T) -> Self {
        Self { updater, ticker }
    }

    /// Spawn the scheduler loop
    pub fn start(self) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));

        SchedulerHandle { cancel, task }
    }

    /// Run the worker loop.
    ///
    /// Cycles run on their own task so tick handling never waits on a slow
    /// cycle; a tick that lands on a running cycle is skipped by the updater.
    async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Scheduler started ({} symbols)",
            self.updater.symbols().len()
        );

        let mut cycles: JoinSet<CycleOutcome> = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                more = self.ticker.tick() => {
                    if !more {
                        break;
                    }
                    let updater = Arc::clone(&self.updater);
                    cycles.spawn(async move { updater.run_cycle().await });

                    while let Some(result) = cycles.try_join_next() {
                        log_cycle_result(result);
                    }
                }
            }
        }

        while let Some(result) = cycles.join_next().await {
            log_cycle_result(result);
        }

        info!("Scheduler stopped");
    }
}

fn log_cycle_result(result: Result<CycleOutcome, tokio::task::JoinError>) {
    if let Err(e) = result {
        error!("Update cycle task failed: {}", e);
    }
}

impl SchedulerHandle {
    /// Stop ticking and wait for any in-progress cycle to finish
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!("Scheduler task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Broadcaster;
    use crate::workers::market_updater::tests::{updater, FakeSource};
    use crate::workers::ticker::ChannelTicker;

    #[tokio::test]
    async fn test_tick_runs_cycle_and_broadcasts() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.subscribe();
        let (updater, store) = updater(FakeSource::new(), broadcaster).await;

        let (tick_tx, ticker) = ChannelTicker::channel();
        let handle = Scheduler::new(Arc::new(updater), ticker).start();

        tick_tx.send(()).await.unwrap();

        let mut symbols = Vec::new();
        for _ in 0..3 {
            symbols.push(sub.recv().await.unwrap().quote.symbol.clone());
        }
        assert_eq!(symbols, vec!["^DJI", "^GSPC", "^IXIC"]);

        handle.stop().await;
        assert_eq!(store.quote_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_stop_without_ticks() {
        let (updater, store) = updater(FakeSource::new(), Broadcaster::new()).await;
        let (_tick_tx, ticker) = ChannelTicker::channel();

        let handle = Scheduler::new(Arc::new(updater), ticker).start();
        handle.stop().await;

        assert_eq!(store.quote_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_loop_ends_when_ticker_closes() {
        let (updater, store) = updater(FakeSource::new(), Broadcaster::new()).await;
        let (tick_tx, ticker) = ChannelTicker::channel();

        let handle = Scheduler::new(Arc::new(updater), ticker).start();
        tick_tx.send(()).await.unwrap();
        drop(tick_tx);

        // The loop drains the pending cycle before exiting
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
        handle.stop().await;

        assert_eq!(store.quote_count().await.unwrap(), 3);
    }
}
