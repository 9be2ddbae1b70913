pub mod analysis;
pub mod quote;
pub mod update;

pub use analysis::{Analysis, Recommendation};
pub use quote::Quote;
pub use update::{MarketSnapshot, MarketUpdate};
