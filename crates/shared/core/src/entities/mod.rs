mod fee;
mod level;
mod side;
mod snapshot;

pub use fee::{FeeSchedule, FeeTier};
pub use level::PriceLevel;
pub use side::Side;
pub use snapshot::OrderBookSnapshot;
