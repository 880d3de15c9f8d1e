pub mod decoder;
pub mod pipeline;
pub mod ws_listener;

pub use decoder::{decode_message, decode_trade, DecodedBatch, FeedMessage};
pub use pipeline::Dispatcher;
pub use ws_listener::{run_ws_listener, FeedClock, FeedFrame};
