//! Async driver for the TI BQ25898S secondary battery charger

pub mod device;
pub mod regs;
pub mod types;

pub use device::{Bq25898s, WatchdogTimeout};
pub use types::{ChargeStatus, DpmStatus, Faults, PartNumber};
