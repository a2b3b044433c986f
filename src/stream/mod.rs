//! Random-number stream: per-connection broadcaster plus its time-series log

pub mod broadcaster;
pub mod sample_log;

pub use broadcaster::{random_numbers_ws, Broadcaster, StreamParams};
pub use sample_log::{Sample, SampleLog};
