//! Charger interrupt handling
//!
//! The charger raises an edge on its interrupt line when charge status or
//! faults change. The edge context must not block, so
//! [`ChargeController::notify_event`] only latches a single-slot signal
//! (latest edge wins) and the long-lived [`ChargeController::run_events`]
//! task performs the actual register reads after a short settle delay.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c;

use tandem_core::state::ChargePhase;
use tandem_core::traits::FuelGauge;
use tandem_drivers::bq25898s::ChargeStatus;

use crate::controller::ChargeController;

/// Settle time between the interrupt edge and the status read, giving the
/// device time to latch a stable status after whatever caused the edge.
pub const EVENT_SETTLE: Duration = Duration::from_millis(5);

impl<M, I2C, E, G> ChargeController<M, I2C, G>
where
    M: RawMutex,
    I2C: I2c<Error = E>,
    G: FuelGauge,
{
    /// Interrupt-edge callback; safe to call from a non-blocking context.
    ///
    /// Only records that an edge happened. Consecutive edges before the
    /// deferred task runs collapse into one reaction, which is fine
    /// because only the latest status matters.
    pub fn notify_event(&self) {
        self.event.signal(());
    }

    /// Deferred interrupt-reaction task body; spawn once per controller.
    pub async fn run_events(&self) -> ! {
        loop {
            self.event.wait().await;
            Timer::after(EVENT_SETTLE).await;
            self.process_event().await;
        }
    }

    /// React to one status-change notification.
    ///
    /// Reads charge status and faults (a failed read abandons the
    /// reaction; the next edge will retry). Termination ("done") disables
    /// charging once and marks the session stopped so later monitor ticks
    /// leave the watchdog alone; the monitor task itself keeps running
    /// until the adapter handler cancels it.
    pub(crate) async fn process_event(&self) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let status = match inner.dev.charging_status().await {
            Ok(status) => status,
            Err(_) => {
                warn!("charge status read failed");
                return;
            }
        };
        let faults = match inner.dev.read_faults().await {
            Ok(faults) => faults,
            Err(_) => {
                warn!("fault register read failed");
                return;
            }
        };

        match status {
            ChargeStatus::NotCharging => info!("charger idle"),
            ChargeStatus::PreCharge => info!("charger precharging"),
            ChargeStatus::FastCharge => info!("charger fast charging"),
            ChargeStatus::Done => {
                info!("charge done");
                if inner.dev.disable_charger().await.is_err() {
                    warn!("failed to disable charger after termination");
                } else {
                    inner.session.phase = ChargePhase::Stopped;
                }
            }
        }

        if !faults.is_empty() {
            warn!("charge fault: {:02x}", faults.bits());
            inner.session.last_faults = faults;
        }
    }
}
