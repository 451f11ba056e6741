//! Transaction history
//!
//! - System instruction decoding
//! - Concurrent per-signature aggregation

mod aggregator;
mod decoder;

pub use aggregator::{HistoryAggregator, DEFAULT_MAX_CONCURRENCY, DEFAULT_TASK_TIMEOUT};
pub use decoder::{decode_system_transfers, SystemInstruction, TransferEvent};
