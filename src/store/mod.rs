//! Table Store
//! Mission: Serialize every mutation of the CSV table and keep a one-step backup

pub mod error;
pub mod gate;
pub mod record;
pub mod table;

pub use error::StoreError;
pub use gate::{Gate, GateGuard};
pub use record::{RecordPatch, TableRecord, TABLE_COLUMNS};
pub use table::TableStore;
