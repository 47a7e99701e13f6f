pub mod burn;
pub mod holder;
pub mod pair;
pub mod token;
pub mod units;

pub use burn::{BurnRecord, BurnResult};
pub use holder::{Holder, HolderProgress, HolderResult};
pub use pair::{Liquidity, LiquidityResult, Pair, TokenRef, Volume, VolumeResult, VolumeShare};
pub use token::TokenIdentity;
