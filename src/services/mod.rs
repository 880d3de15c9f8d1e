pub mod file_sink;
pub mod sink;

pub use file_sink::FileSink;
pub use sink::{format_alert, format_trade_line, MemorySink, RecordSink};
