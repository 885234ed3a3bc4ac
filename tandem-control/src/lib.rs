//! Charge-session control for the Tandem secondary charger
//!
//! Ties the chip driver to a running system: adapter attach/detach entry
//! points, the periodic supervision task, and the deferred reaction to the
//! charger's interrupt line. The crate is executor-agnostic; the two task
//! bodies ([`ChargeController::run_monitor`] and
//! [`ChargeController::run_events`]) are plain `async fn`s the integrating
//! firmware spawns on its executor.
//!
//! All register access and all mutable session state are serialized through
//! one async mutex per controller, so the three execution contexts (adapter
//! events, monitor tick, interrupt reaction) can interleave freely.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub(crate) mod fmt;

pub mod controller;
pub mod events;
pub mod monitor;

#[cfg(test)]
pub(crate) mod testutil;

pub use controller::ChargeController;
