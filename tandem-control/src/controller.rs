//! Charge controller
//!
//! One [`ChargeController`] owns one charger IC for the life of the
//! device attachment. The device driver and every mutable session field
//! live behind a single async mutex: adapter entry points, monitor ticks
//! and the interrupt reaction all funnel their register traffic through
//! it, and a guard spans each whole read-modify-write (and each
//! multi-step sequence), released on every exit path.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embedded_hal_async::i2c::I2c;
use heapless::Vec;

use tandem_core::charge::{self, SessionStart};
use tandem_core::config::ChargeConfig;
use tandem_core::error::Error;
use tandem_core::state::ChargePhase;
use tandem_core::traits::FuelGauge;
use tandem_drivers::bq25898s::device::WatchdogTimeout;
use tandem_drivers::bq25898s::regs::REG_COUNT;
use tandem_drivers::bq25898s::{Bq25898s, Faults, PartNumber};

/// Watchdog timeout armed whenever a charge is enabled.
pub(crate) const SESSION_WATCHDOG: WatchdogTimeout = WatchdogTimeout::Secs40;

/// Commands consumed by the monitor task.
///
/// Delivered through a single-slot signal: only the latest command
/// matters, so a `Stop` arriving before a pending `Start` was consumed
/// simply replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MonitorCommand {
    Start,
    Stop,
}

/// Mutable state of the current charge session.
pub(crate) struct Session {
    pub phase: ChargePhase,
    /// Whether a monitor session is scheduled; only mutated under the
    /// controller mutex so the adapter paths and a concurrent tick cannot
    /// lose updates
    pub monitor_active: bool,
    /// Last state of charge obtained from the fuel gauge (or fallback)
    pub soc_percent: u8,
    /// Last nonzero fault byte reported by the interrupt path
    pub last_faults: Faults,
}

pub(crate) struct Inner<I2C, G> {
    pub dev: Bq25898s<I2C>,
    pub gauge: Option<G>,
    pub cfg: ChargeConfig,
    pub part: PartNumber,
    pub revision: u8,
    pub session: Session,
}

/// Control context for one charger instance.
///
/// `M` selects the raw-mutex flavor for the executor in use
/// (`CriticalSectionRawMutex` on real hardware, `NoopRawMutex` in
/// single-threaded tests).
pub struct ChargeController<M: RawMutex, I2C, G> {
    pub(crate) inner: Mutex<M, Inner<I2C, G>>,
    pub(crate) monitor_cmd: Signal<M, MonitorCommand>,
    pub(crate) monitor_idle: Signal<M, ()>,
    pub(crate) event: Signal<M, ()>,
}

impl<M, I2C, E, G> ChargeController<M, I2C, G>
where
    M: RawMutex,
    I2C: I2c<Error = E>,
    G: FuelGauge,
{
    /// Attach to the charger at device-arrival time.
    ///
    /// Validates the configuration, probes the part identity (any other
    /// family member is fatal) and runs the secondary-charger init
    /// sequence. The fuel gauge is optional; without one the
    /// state-of-charge gate uses the fallback value.
    pub async fn attach(
        mut dev: Bq25898s<I2C>,
        cfg: ChargeConfig,
        gauge: Option<G>,
    ) -> Result<Self, Error<E>> {
        cfg.validate().map_err(Error::Config)?;

        let revision = dev.probe().await?;
        info!("secondary charger detected, revision {}", revision);

        dev.init(&cfg).await?;

        Ok(Self {
            inner: Mutex::new(Inner {
                dev,
                gauge,
                cfg,
                part: PartNumber::Bq25898S,
                revision,
                session: Session {
                    phase: ChargePhase::Stopped,
                    monitor_active: false,
                    soc_percent: charge::SOC_FALLBACK_PERCENT,
                    last_faults: Faults::empty(),
                },
            }),
            monitor_cmd: Signal::new(),
            monitor_idle: Signal::new(),
            event: Signal::new(),
        })
    }

    /// Adapter plugged in: configure and (maybe) start a charge session.
    ///
    /// Applies the full charge profile first; a failure there aborts with
    /// the configuration partially applied (no rollback) and no session
    /// started. An unreadable battery voltage likewise aborts with no
    /// state change. Otherwise the battery voltage and state of charge
    /// decide between precharge gating, starting the charge, or leaving
    /// the secondary charger off because the battery is nearly full.
    pub async fn adapter_connected(&self) -> Result<(), Error<E>> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        inner.dev.apply_charge_profile(&inner.cfg).await?;

        let vbat = inner.dev.read_battery_voltage().await?;

        // The gauge is only consulted once the battery is past the
        // precharge threshold; below it the decision is made on voltage
        // alone.
        let soc = if charge::precharge_complete(vbat) {
            let soc = match inner.gauge.as_mut() {
                Some(gauge) => gauge
                    .capacity_percent()
                    .await
                    .unwrap_or(charge::SOC_FALLBACK_PERCENT),
                None => charge::SOC_FALLBACK_PERCENT,
            };
            inner.session.soc_percent = soc;
            soc
        } else {
            inner.session.soc_percent
        };

        match charge::session_start(vbat, soc) {
            SessionStart::Precharge => {
                info!("battery at {} mV, holding charge in precharge gate", vbat);
                inner.session.phase = ChargePhase::PreCharge;
            }
            SessionStart::NearFull => {
                info!("state of charge {} %, secondary charge not needed", soc);
                return Ok(());
            }
            SessionStart::Charge => {
                inner.dev.enable_charger().await?;
                info!("secondary charge started");
                if inner.dev.set_watchdog(SESSION_WATCHDOG).await.is_err() {
                    warn!("failed to arm charge watchdog");
                }
                inner.session.phase = ChargePhase::Charging;
            }
        }

        inner.session.monitor_active = true;
        drop(guard);

        self.monitor_idle.reset();
        self.monitor_cmd.signal(MonitorCommand::Start);
        Ok(())
    }

    /// Adapter removed: stop the session.
    ///
    /// Disables charging and the watchdog (failures are logged, the
    /// teardown continues), then cancels the monitor session and waits
    /// until the monitor task has acknowledged going idle. When this
    /// returns, no further monitor tick will run.
    pub async fn adapter_disconnected(&self) {
        let was_active = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;

            if inner.dev.disable_charger().await.is_err() {
                warn!("failed to disable charger on adapter removal");
            } else {
                info!("secondary charge stopped");
            }
            if inner.dev.disable_watchdog().await.is_err() {
                warn!("failed to disable charge watchdog");
            }

            inner.session.phase = ChargePhase::Stopped;
            let was_active = inner.session.monitor_active;
            inner.session.monitor_active = false;
            was_active
        };

        if was_active {
            self.monitor_idle.reset();
            self.monitor_cmd.signal(MonitorCommand::Stop);
            self.monitor_idle.wait().await;
        }
    }

    /// Current session phase.
    pub async fn phase(&self) -> ChargePhase {
        self.inner.lock().await.session.phase
    }

    /// Last state of charge used by the session logic.
    pub async fn state_of_charge(&self) -> u8 {
        self.inner.lock().await.session.soc_percent
    }

    /// Last nonzero fault byte seen by the interrupt path.
    pub async fn last_faults(&self) -> Faults {
        self.inner.lock().await.session.last_faults
    }

    /// Part number and silicon revision recorded at attach.
    pub async fn device_info(&self) -> (PartNumber, u8) {
        let inner = self.inner.lock().await;
        (inner.part, inner.revision)
    }

    /// Read the full register file for external introspection.
    ///
    /// Pure read path; serialized through the controller mutex like every
    /// other access.
    pub async fn dump_registers(&self) -> Result<Vec<(u8, u8), REG_COUNT>, Error<E>> {
        self.inner.lock().await.dev.dump_registers().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{attach_with, monitor_active, with_bus, FixedGauge, TestController};
    use embassy_futures::block_on;
    use embassy_futures::select::select;
    use tandem_drivers::bq25898s::regs::*;
    use tandem_drivers::sim::SimBus;

    fn ready_controller(soc: Option<u8>) -> TestController {
        attach_with(soc, |sim| {
            sim.set_battery_voltage(3504);
            sim.set_vbus_voltage(5000);
        })
    }

    #[test]
    fn test_attach_rejects_wrong_part() {
        let sim = SimBus::with_part(0x00, 1);
        let result = block_on(TestController::attach(
            Bq25898s::new(sim),
            ChargeConfig::default(),
            Some(FixedGauge(Some(50))),
        ));
        assert!(matches!(result, Err(Error::DeviceNotFound(0x00))));
    }

    #[test]
    fn test_attach_rejects_invalid_config() {
        let sim = SimBus::with_part(0x01, 1);
        let cfg = ChargeConfig {
            charge_voltage_mv: 3000,
            ..Default::default()
        };
        let result = block_on(TestController::attach(
            Bq25898s::new(sim),
            cfg,
            Some(FixedGauge(Some(50))),
        ));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_attach_leaves_device_in_baseline_state() {
        let ctrl = ready_controller(Some(50));
        block_on(async {
            let (part, revision) = ctrl.device_info().await;
            assert_eq!(part, PartNumber::Bq25898S);
            assert_eq!(revision, 1);
            with_bus(&ctrl, |bus| {
                assert_eq!(WATCHDOG.extract(bus.reg(REG07)), 0);
                assert_eq!(AUTO_DPDM_EN.extract(bus.reg(REG02)), 0);
                assert_eq!(FORCE_VINDPM.extract(bus.reg(REG0D)), 1);
                assert_eq!(CHG_CONFIG.extract(bus.reg(REG03)), 0);
                assert_eq!(CONV_START.extract(bus.reg(REG02)), 1);
            })
            .await;
        });
    }

    #[test]
    fn test_connect_starts_charge_when_battery_ready() {
        let ctrl = ready_controller(Some(50));
        block_on(async {
            ctrl.adapter_connected().await.unwrap();

            assert_eq!(ctrl.phase().await, ChargePhase::Charging);
            assert!(monitor_active(&ctrl).await);
            with_bus(&ctrl, |bus| {
                assert_eq!(CHG_CONFIG.extract(bus.reg(REG03)), 1);
                assert_eq!(WATCHDOG.extract(bus.reg(REG07)), 1); // 40 s
                assert_eq!(VINDPM.decode(bus.reg(REG0D)), 4400);
                assert_eq!(VREG.decode(bus.reg(REG06)), 4208);
            })
            .await;
        });
    }

    #[test]
    fn test_connect_gates_low_battery_in_precharge() {
        let ctrl = attach_with(Some(50), |sim| {
            sim.set_battery_voltage(3384);
            sim.set_vbus_voltage(5000);
        });
        block_on(async {
            ctrl.adapter_connected().await.unwrap();

            assert_eq!(ctrl.phase().await, ChargePhase::PreCharge);
            assert!(monitor_active(&ctrl).await);
            with_bus(&ctrl, |bus| {
                assert_eq!(CHG_CONFIG.extract(bus.reg(REG03)), 0);
                assert_eq!(WATCHDOG.extract(bus.reg(REG07)), 0);
            })
            .await;
        });
    }

    #[test]
    fn test_connect_skips_nearly_full_battery() {
        let ctrl = ready_controller(Some(96));
        block_on(async {
            ctrl.adapter_connected().await.unwrap();

            assert_eq!(ctrl.phase().await, ChargePhase::Stopped);
            assert_eq!(ctrl.state_of_charge().await, 96);
            assert!(!monitor_active(&ctrl).await);
            with_bus(&ctrl, |bus| {
                assert_eq!(CHG_CONFIG.extract(bus.reg(REG03)), 0);
            })
            .await;
        });
    }

    #[test]
    fn test_connect_falls_back_without_gauge_reading() {
        let ctrl = ready_controller(None);
        block_on(async {
            ctrl.adapter_connected().await.unwrap();

            assert_eq!(ctrl.state_of_charge().await, charge::SOC_FALLBACK_PERCENT);
            assert_eq!(ctrl.phase().await, ChargePhase::Charging);
        });
    }

    #[test]
    fn test_connect_aborts_on_profile_failure() {
        let ctrl = ready_controller(Some(50));
        block_on(async {
            with_bus(&ctrl, |bus| bus.fail_write = Some(REG04)).await;

            assert!(ctrl.adapter_connected().await.is_err());

            assert_eq!(ctrl.phase().await, ChargePhase::Stopped);
            assert!(!monitor_active(&ctrl).await);
            with_bus(&ctrl, |bus| {
                // Charge voltage landed before the failing step; no
                // rollback, and nothing after the failure was touched
                assert_eq!(VREG.decode(bus.reg(REG06)), 4208);
                assert_eq!(IINLIM.field.extract(bus.reg(REG00)), 0);
                assert_eq!(CHG_CONFIG.extract(bus.reg(REG03)), 0);
            })
            .await;
        });
    }

    #[test]
    fn test_connect_aborts_on_unreadable_battery_voltage() {
        let ctrl = ready_controller(Some(50));
        block_on(async {
            with_bus(&ctrl, |bus| bus.fail_read = Some(REG0E)).await;

            assert!(ctrl.adapter_connected().await.is_err());

            assert_eq!(ctrl.phase().await, ChargePhase::Stopped);
            assert!(!monitor_active(&ctrl).await);
        });
    }

    #[test]
    fn test_disconnect_without_session() {
        let ctrl = ready_controller(Some(50));
        block_on(async {
            // No session was started; must return without waiting for a
            // monitor acknowledgement
            ctrl.adapter_disconnected().await;

            assert_eq!(ctrl.phase().await, ChargePhase::Stopped);
            with_bus(&ctrl, |bus| {
                assert_eq!(CHG_CONFIG.extract(bus.reg(REG03)), 0);
                assert_eq!(WATCHDOG.extract(bus.reg(REG07)), 0);
            })
            .await;
        });
    }

    #[test]
    fn test_disconnect_cancels_monitor_session() {
        let ctrl = ready_controller(Some(50));
        block_on(select(ctrl.run_monitor(), async {
            ctrl.adapter_connected().await.unwrap();
            assert!(monitor_active(&ctrl).await);

            // Returns only after the monitor task acknowledged the stop
            ctrl.adapter_disconnected().await;

            assert_eq!(ctrl.phase().await, ChargePhase::Stopped);
            assert!(!monitor_active(&ctrl).await);

            // No further tick may touch the bus after disconnect returns
            let writes = with_bus(&ctrl, |bus| bus.writes.len()).await;
            ctrl.monitor_tick().await;
            assert_eq!(with_bus(&ctrl, |bus| bus.writes.len()).await, writes);

            with_bus(&ctrl, |bus| {
                assert_eq!(CHG_CONFIG.extract(bus.reg(REG03)), 0);
                assert_eq!(WATCHDOG.extract(bus.reg(REG07)), 0);
            })
            .await;
        }));
    }
}
