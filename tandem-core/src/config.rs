//! Charge-parameter configuration
//!
//! The configuration collaborator supplies one [`ChargeConfig`] per device
//! before initialization; it is immutable afterwards. Validation bounds are
//! the encodable ranges of the corresponding setpoint registers, so a
//! config that validates can always be applied bit-exactly.

use crate::error::ConfigError;

/// Charge parameters for one charger instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeConfig {
    /// Battery regulation voltage in mV
    pub charge_voltage_mv: u16,
    /// Fast-charge current in mA
    pub charge_current_ma: u16,
    /// Termination current in mA
    pub term_current_ma: u16,
    /// Input current limit (IINDPM) in mA
    pub input_current_limit_ma: u16,
    /// Input voltage limit (VINDPM) in mV
    ///
    /// Carried for diagnostics; the controller always runs in absolute
    /// VINDPM mode with the limit recomputed from measured VBUS.
    pub input_voltage_limit_mv: u16,
    /// Whether the charger terminates on its own when the termination
    /// current is reached
    pub enable_term: bool,
    /// Absolute (true) vs relative (false) input-voltage-limit mode.
    ///
    /// Carried for diagnostics; initialization always forces absolute mode.
    pub use_absolute_vindpm: bool,
    /// Automatic input-source detection.
    ///
    /// Carried for diagnostics; a secondary charger must not autodetect,
    /// so initialization always forces this off.
    pub enable_auto_dpdm: bool,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            charge_voltage_mv: 4208,
            charge_current_ma: 2048,
            term_current_ma: 256,
            input_current_limit_ma: 2000,
            input_voltage_limit_mv: 4400,
            enable_term: true,
            use_absolute_vindpm: true,
            enable_auto_dpdm: false,
        }
    }
}

/// Encodable setpoint ranges, in the units of the corresponding fields.
/// These mirror the register scales in the chip driver.
pub mod limits {
    /// Charge voltage range in mV (6-bit field, 3840 mV base, 16 mV step)
    pub const CHARGE_VOLTAGE_MV: (u16, u16) = (3840, 3840 + 63 * 16);
    /// Charge current range in mA (7-bit field, 0 mA base, 64 mA step)
    pub const CHARGE_CURRENT_MA: (u16, u16) = (0, 127 * 64);
    /// Termination current range in mA (4-bit field, 64 mA base, 64 mA step)
    pub const TERM_CURRENT_MA: (u16, u16) = (64, 64 + 15 * 64);
    /// Input current limit range in mA (6-bit field, 100 mA base, 50 mA step)
    pub const INPUT_CURRENT_MA: (u16, u16) = (100, 100 + 63 * 50);
    /// Input voltage limit range in mV (7-bit field, 2600 mV base, 100 mV step)
    pub const INPUT_VOLTAGE_MV: (u16, u16) = (2600, 2600 + 127 * 100);
}

impl ChargeConfig {
    /// Check every parameter against its encodable register range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(value: u16, (min, max): (u16, u16), err: ConfigError) -> Result<(), ConfigError> {
            if value < min || value > max {
                Err(err)
            } else {
                Ok(())
            }
        }

        check(
            self.charge_voltage_mv,
            limits::CHARGE_VOLTAGE_MV,
            ConfigError::ChargeVoltage,
        )?;
        check(
            self.charge_current_ma,
            limits::CHARGE_CURRENT_MA,
            ConfigError::ChargeCurrent,
        )?;
        check(
            self.term_current_ma,
            limits::TERM_CURRENT_MA,
            ConfigError::TermCurrent,
        )?;
        check(
            self.input_current_limit_ma,
            limits::INPUT_CURRENT_MA,
            ConfigError::InputCurrentLimit,
        )?;
        check(
            self.input_voltage_limit_mv,
            limits::INPUT_VOLTAGE_MV,
            ConfigError::InputVoltageLimit,
        )?;
        Ok(())
    }
}
