//! Shared fixtures for the session tests

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use tandem_core::config::ChargeConfig;
use tandem_core::traits::FuelGauge;
use tandem_drivers::bq25898s::Bq25898s;
use tandem_drivers::sim::SimBus;

use crate::controller::ChargeController;

/// Part code the simulator must report for a successful attach.
pub const SECONDARY_PART: u8 = 0x01;

/// Fuel gauge returning a scripted reading.
pub struct FixedGauge(pub Option<u8>);

impl FuelGauge for FixedGauge {
    async fn capacity_percent(&mut self) -> Option<u8> {
        self.0
    }
}

pub type TestController = ChargeController<NoopRawMutex, SimBus, FixedGauge>;

/// Attach a controller to a simulated charger.
///
/// `setup` runs against the simulator before the attach sequence, so
/// tests can preset ADC readings or inject failures.
pub fn attach_with(soc: Option<u8>, setup: impl FnOnce(&mut SimBus)) -> TestController {
    let mut sim = SimBus::with_part(SECONDARY_PART, 1);
    setup(&mut sim);
    embassy_futures::block_on(ChargeController::attach(
        Bq25898s::new(sim),
        ChargeConfig::default(),
        Some(FixedGauge(soc)),
    ))
    .unwrap()
}

/// Run a closure against the simulated bus inside the controller.
pub async fn with_bus<R>(ctrl: &TestController, f: impl FnOnce(&mut SimBus) -> R) -> R {
    let mut inner = ctrl.inner.lock().await;
    f(inner.dev.bus_mut())
}

/// Whether the controller believes a monitor session is scheduled.
pub async fn monitor_active(ctrl: &TestController) -> bool {
    ctrl.inner.lock().await.session.monitor_active
}
