pub mod burn;
pub mod holders;
pub mod liquidity;
pub mod report;
pub mod volume;

pub use burn::BurnAggregator;
pub use holders::HolderAggregator;
pub use liquidity::LiquidityAggregator;
pub use volume::VolumeAggregator;
