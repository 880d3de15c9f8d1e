pub mod types;

pub use types::{DexTrade, SubscribeMessage, TradeSide, WireNumber};
