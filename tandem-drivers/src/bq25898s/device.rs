//! Register-level driver for the BQ25898S
//!
//! The driver owns its I²C instance so the whole device can live inside an
//! async mutex; every method takes `&mut self`, which also guarantees at
//! most one outstanding bus transaction per device. Multi-step sequences
//! (initialization, charge-profile application) abort at the first failing
//! step and leave already-applied steps in place; callers may retry the
//! whole sequence.

use embedded_hal_async::i2c::I2c;
use heapless::Vec;

use tandem_core::charge;
use tandem_core::config::ChargeConfig;
use tandem_core::error::Error;
use tandem_core::field::{Field, LinearField};

use super::regs::*;
use super::types::{ChargeStatus, DpmStatus, Faults, PartNumber};

/// Watchdog timeout values accepted by the timer field.
///
/// The field is not linear at the top step, so the timeout is expressed as
/// an enum rather than a free number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogTimeout {
    Disabled,
    Secs40,
    Secs80,
    Secs160,
}

impl WatchdogTimeout {
    fn raw(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::Secs40 => 1,
            Self::Secs80 => 2,
            Self::Secs160 => 3,
        }
    }
}

/// BQ25898S async driver over I²C.
pub struct Bq25898s<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C, E> Bq25898s<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Create a driver instance using the default bus address.
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            addr: I2C_ADDR,
        }
    }

    /// Create a driver instance using an explicit 7-bit bus address.
    pub fn with_address(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }

    /// Consume the driver and return the owned bus instance.
    pub fn release(self) -> I2C {
        self.i2c
    }

    #[cfg(any(test, feature = "sim"))]
    pub fn bus_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// Read one register.
    pub async fn read_reg(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(self.addr, &[reg], &mut buf).await?;
        Ok(buf[0])
    }

    /// Write one register, replacing its whole content.
    pub async fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c.write(self.addr, &[reg, value]).await?;
        Ok(())
    }

    /// Read one field, already shifted down to bit 0.
    pub async fn read_field(&mut self, field: Field) -> Result<u8, Error<E>> {
        let raw = self.read_reg(field.reg).await?;
        Ok(field.extract(raw))
    }

    /// Read-modify-write one field, preserving every bit outside its mask.
    ///
    /// A failed read aborts the update without issuing the write.
    pub async fn update_field(&mut self, field: Field, value: u8) -> Result<(), Error<E>> {
        let current = self.read_reg(field.reg).await?;
        self.write_reg(field.reg, field.merge(current, value)).await
    }

    async fn write_scaled(&mut self, field: LinearField, value: u16) -> Result<(), Error<E>> {
        self.update_field(field.field, field.encode(value)).await
    }

    async fn read_scaled(&mut self, field: LinearField) -> Result<u16, Error<E>> {
        let raw = self.read_reg(field.field.reg).await?;
        Ok(field.decode(raw))
    }

    // ------------------ Identification ------------------

    /// Read the part number and silicon revision.
    pub async fn part_info(&mut self) -> Result<(PartNumber, u8), Error<E>> {
        let raw = self.read_reg(REG14).await?;
        Ok((PartNumber::from(PN.extract(raw)), DEV_REV.extract(raw)))
    }

    /// Probe the bus and verify the part is the secondary-charger variant.
    ///
    /// Returns the silicon revision on success; any other family member is
    /// reported as `DeviceNotFound` with the raw part code.
    pub async fn probe(&mut self) -> Result<u8, Error<E>> {
        let (part, revision) = self.part_info().await?;
        match part {
            PartNumber::Bq25898S => Ok(revision),
            other => Err(Error::DeviceNotFound(other.code())),
        }
    }

    // ------------------ Charger control ------------------

    pub async fn enable_charger(&mut self) -> Result<(), Error<E>> {
        self.update_field(CHG_CONFIG, 1).await
    }

    pub async fn disable_charger(&mut self) -> Result<(), Error<E>> {
        self.update_field(CHG_CONFIG, 0).await
    }

    pub async fn enable_termination(&mut self, enable: bool) -> Result<(), Error<E>> {
        self.update_field(EN_TERM, enable as u8).await
    }

    /// Select absolute (true) or VBUS-relative (false) input-voltage-limit
    /// mode.
    pub async fn force_absolute_vindpm(&mut self, absolute: bool) -> Result<(), Error<E>> {
        self.update_field(FORCE_VINDPM, absolute as u8).await
    }

    /// Enable or disable automatic input-source detection.
    pub async fn enable_auto_detect(&mut self, enable: bool) -> Result<(), Error<E>> {
        self.update_field(AUTO_DPDM_EN, enable as u8).await
    }

    // ------------------ Watchdog ------------------

    pub async fn set_watchdog(&mut self, timeout: WatchdogTimeout) -> Result<(), Error<E>> {
        self.update_field(WATCHDOG, timeout.raw()).await
    }

    pub async fn disable_watchdog(&mut self) -> Result<(), Error<E>> {
        self.set_watchdog(WatchdogTimeout::Disabled).await
    }

    /// Kick the watchdog so an enabled charge keeps running.
    pub async fn reset_watchdog(&mut self) -> Result<(), Error<E>> {
        self.update_field(WD_RST, 1).await
    }

    // ------------------ Setpoints ------------------

    pub async fn set_charge_voltage(&mut self, mv: u16) -> Result<(), Error<E>> {
        self.write_scaled(VREG, mv).await
    }

    pub async fn set_charge_current(&mut self, ma: u16) -> Result<(), Error<E>> {
        self.write_scaled(ICHG, ma).await
    }

    pub async fn set_term_current(&mut self, ma: u16) -> Result<(), Error<E>> {
        self.write_scaled(ITERM, ma).await
    }

    pub async fn set_precharge_current(&mut self, ma: u16) -> Result<(), Error<E>> {
        self.write_scaled(IPRECHG, ma).await
    }

    pub async fn set_input_current_limit(&mut self, ma: u16) -> Result<(), Error<E>> {
        self.write_scaled(IINLIM, ma).await
    }

    pub async fn set_input_voltage_limit(&mut self, mv: u16) -> Result<(), Error<E>> {
        self.write_scaled(VINDPM, mv).await
    }

    // ------------------ HIZ mode ------------------

    pub async fn enter_hiz(&mut self) -> Result<(), Error<E>> {
        self.update_field(EN_HIZ, 1).await
    }

    pub async fn exit_hiz(&mut self) -> Result<(), Error<E>> {
        self.update_field(EN_HIZ, 0).await
    }

    pub async fn is_hiz(&mut self) -> Result<bool, Error<E>> {
        Ok(self.read_field(EN_HIZ).await? != 0)
    }

    // ------------------ ADC ------------------

    /// Start an ADC conversion, one-shot or continuous.
    ///
    /// If a continuous scan is already running there is nothing to do.
    pub async fn adc_start(&mut self, oneshot: bool) -> Result<(), Error<E>> {
        let raw = self.read_reg(REG02).await?;
        if CONV_RATE.extract(raw) != 0 {
            return Ok(());
        }
        if oneshot {
            self.update_field(CONV_START, 1).await
        } else {
            self.update_field(CONV_RATE, 1).await
        }
    }

    /// Stop a continuous ADC scan.
    pub async fn adc_stop(&mut self) -> Result<(), Error<E>> {
        self.update_field(CONV_RATE, 0).await
    }

    pub async fn read_battery_voltage(&mut self) -> Result<u16, Error<E>> {
        self.read_scaled(BATV).await
    }

    pub async fn read_system_voltage(&mut self) -> Result<u16, Error<E>> {
        self.read_scaled(SYSV).await
    }

    pub async fn read_vbus_voltage(&mut self) -> Result<u16, Error<E>> {
        self.read_scaled(VBUSV).await
    }

    pub async fn read_charge_current(&mut self) -> Result<u16, Error<E>> {
        self.read_scaled(ICHGR).await
    }

    // ------------------ Status ------------------

    pub async fn charging_status(&mut self) -> Result<ChargeStatus, Error<E>> {
        let raw = self.read_field(CHRG_STAT).await?;
        Ok(ChargeStatus::from(raw))
    }

    pub async fn is_charge_done(&mut self) -> Result<bool, Error<E>> {
        Ok(self.charging_status().await? == ChargeStatus::Done)
    }

    pub async fn read_faults(&mut self) -> Result<Faults, Error<E>> {
        let raw = self.read_reg(REG0C).await?;
        Ok(Faults::from_bits_truncate(raw))
    }

    /// Read which input limits are actively regulating, plus the effective
    /// input current limit.
    pub async fn dpm_status(&mut self) -> Result<DpmStatus, Error<E>> {
        let raw = self.read_reg(REG13).await?;
        Ok(DpmStatus {
            vindpm: VDPM_STAT.is_set(raw),
            iindpm: IDPM_STAT.is_set(raw),
            input_limit_ma: IDPM_LIM.decode(raw),
        })
    }

    // ------------------ Reset ------------------

    /// Reset every register to its power-on default.
    pub async fn reset_registers(&mut self) -> Result<(), Error<E>> {
        self.update_field(REG_RST, 1).await
    }

    // ------------------ Sequences ------------------

    /// Bring the device into the secondary-charger baseline state.
    ///
    /// Order matters and each step's failure aborts the rest: watchdog off,
    /// input-source autodetect forced off (a secondary charger must never
    /// renegotiate the input), configured termination mode, absolute VINDPM
    /// mode, charging off, then a one-shot ADC conversion so the first
    /// voltage readings are fresh.
    pub async fn init(&mut self, cfg: &ChargeConfig) -> Result<(), Error<E>> {
        self.disable_watchdog().await?;
        self.enable_auto_detect(false).await?;
        self.enable_termination(cfg.enable_term).await?;
        self.force_absolute_vindpm(true).await?;
        self.disable_charger().await?;
        self.adc_start(true).await
    }

    /// Apply the full charge profile from the configuration.
    ///
    /// Aborts at the first failing step; already-applied setpoints stay in
    /// place and the caller may retry the whole sequence.
    pub async fn apply_charge_profile(&mut self, cfg: &ChargeConfig) -> Result<(), Error<E>> {
        self.set_charge_voltage(cfg.charge_voltage_mv).await?;
        self.set_charge_current(cfg.charge_current_ma).await?;
        self.set_term_current(cfg.term_current_ma).await?;
        self.set_input_current_limit(cfg.input_current_limit_ma)
            .await?;
        self.adjust_input_voltage_limit().await?;
        Ok(())
    }

    /// Recompute and apply the adaptive input-voltage limit from the
    /// measured VBUS voltage. Returns the applied limit.
    pub async fn adjust_input_voltage_limit(&mut self) -> Result<u16, Error<E>> {
        let vbus = self.read_vbus_voltage().await?;
        let target = charge::vindpm_target_mv(vbus);
        self.set_input_voltage_limit(target).await?;
        info!("vindpm set to {} mV for vbus {} mV", target, vbus);
        Ok(target)
    }

    // ------------------ Diagnostics ------------------

    /// Dump the full register file as (address, value) pairs.
    ///
    /// Pure read path with no side effects, intended for external
    /// introspection.
    pub async fn dump_registers(&mut self) -> Result<Vec<(u8, u8), REG_COUNT>, Error<E>> {
        let mut out = Vec::new();
        for addr in 0..REG_COUNT as u8 {
            let value = self.read_reg(addr).await?;
            // The Vec is sized for the whole map, the push cannot fail
            let _ = out.push((addr, value));
        }
        Ok(out)
    }
}
