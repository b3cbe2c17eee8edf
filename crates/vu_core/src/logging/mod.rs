//! Run logging.
//!
//! Each pipeline run gets its own log file holding the full command and
//! tool-output transcript; messages are mirrored to `tracing` for the
//! console.

mod run_logger;
mod types;

pub use run_logger::RunLogger;
pub use types::{LogConfig, MessagePrefix};
