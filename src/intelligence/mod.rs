pub mod detector;
pub mod stats;
pub mod window;

pub use detector::{is_smart_wallet, AlertState, DetectionResult, Detector};
pub use stats::{attribute, compute_snapshot, snapshot};
pub use window::{WalletWindow, WindowStore};
