pub mod market_updater;
pub mod scheduler;
pub mod ticker;

pub use market_updater::{CycleOutcome, CycleReport, MarketUpdater};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use ticker::{ChannelTicker, IntervalTicker, Ticker};
