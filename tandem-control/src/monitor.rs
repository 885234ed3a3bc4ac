//! Periodic charge supervision
//!
//! While a session is active the monitor wakes every
//! [`MONITOR_INTERVAL`]: during precharge it polls the battery voltage
//! and lifts the gate once the threshold is crossed; during an active
//! charge it refreshes the hardware watchdog, samples telemetry and logs
//! when an input limit is regulating.
//!
//! The watchdog is a dead-man's switch: if the refresh ever stops while a
//! charge is enabled, the hardware disables charging on its own. The
//! refresh therefore happens first in every charging tick, and never in
//! any other phase.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c;

use tandem_core::charge;
use tandem_core::state::ChargePhase;
use tandem_core::traits::FuelGauge;

use crate::controller::{ChargeController, MonitorCommand, SESSION_WATCHDOG};

/// Delay between monitor ticks while a session is active.
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(10);

impl<M, I2C, E, G> ChargeController<M, I2C, G>
where
    M: RawMutex,
    I2C: I2c<Error = E>,
    G: FuelGauge,
{
    /// Monitor task body; spawn once per controller on the executor.
    ///
    /// Sessions are driven by the single-slot command signal: `Start`
    /// enters the periodic loop, `Stop` leaves it and acknowledges over
    /// the idle signal, which is what lets `adapter_disconnected` return
    /// only once no further tick can run.
    pub async fn run_monitor(&self) -> ! {
        loop {
            match self.monitor_cmd.wait().await {
                // A Stop can land here when it replaced a not-yet-consumed
                // Start; the disconnect path still deserves its ack.
                MonitorCommand::Stop => self.monitor_idle.signal(()),
                MonitorCommand::Start => {
                    loop {
                        match select(Timer::after(MONITOR_INTERVAL), self.monitor_cmd.wait()).await
                        {
                            Either::First(()) => self.monitor_tick().await,
                            Either::Second(MonitorCommand::Start) => {}
                            Either::Second(MonitorCommand::Stop) => break,
                        }
                    }
                    self.monitor_idle.signal(());
                }
            }
        }
    }

    /// One supervision pass over the session.
    pub(crate) async fn monitor_tick(&self) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        match inner.session.phase {
            // Session ended between the timer firing and the lock being
            // acquired; the Stop command is already latched for the loop.
            ChargePhase::Stopped => {}

            ChargePhase::PreCharge => {
                let vbat = match inner.dev.read_battery_voltage().await {
                    Ok(vbat) => vbat,
                    Err(_) => {
                        warn!("battery voltage read failed, staying in precharge");
                        return;
                    }
                };
                if !charge::precharge_complete(vbat) {
                    return;
                }

                if inner.dev.enable_charger().await.is_err() {
                    warn!("failed to enable charging, retrying next tick");
                    return;
                }
                info!("precharge complete at {} mV, secondary charge started", vbat);

                if inner.dev.set_watchdog(SESSION_WATCHDOG).await.is_err() {
                    warn!("failed to arm charge watchdog");
                }
                inner.session.phase = ChargePhase::Charging;
            }

            ChargePhase::Charging => {
                // Watchdog first; everything below is best-effort telemetry
                if inner.dev.reset_watchdog().await.is_err() {
                    warn!("watchdog refresh failed");
                }

                let vbus = inner.dev.read_vbus_voltage().await;
                let vbat = inner.dev.read_battery_voltage().await;
                let ichg = inner.dev.read_charge_current().await;
                match (vbus, vbat, ichg) {
                    (Ok(vbus), Ok(vbat), Ok(ichg)) => {
                        info!(
                            "vbus {} mV, vbat {} mV, charge current {} mA",
                            vbus, vbat, ichg
                        );
                    }
                    _ => warn!("telemetry sample failed"),
                }

                match inner.dev.dpm_status().await {
                    Ok(dpm) => {
                        if dpm.vindpm {
                            info!("input voltage limit active");
                        }
                        if dpm.iindpm {
                            info!("input current limit active, {} mA", dpm.input_limit_ma);
                        }
                    }
                    Err(_) => warn!("limit status read failed"),
                }
            }
        }
    }
}
