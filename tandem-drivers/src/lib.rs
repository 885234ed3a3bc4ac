//! Hardware driver for the Tandem secondary charger
//!
//! Contains the async BQ25898S charger-IC driver. The driver is generic
//! over any `embedded-hal-async` I²C implementation; all scheduling and
//! session logic lives in `tandem-control`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub(crate) mod fmt;

pub mod bq25898s;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use bq25898s::Bq25898s;
