//! BQ25898S register map
//!
//! Field addresses, masks, shifts and ADC scales for registers 0x00-0x14,
//! taken from the device datasheet. The scale constants (base + LSB) are
//! device calibration data and must stay bit-for-bit as specified there.

use tandem_core::field::{Field, LinearField};

/// Default 7-bit bus address of the charger.
pub const I2C_ADDR: u8 = 0x6B;

/// Number of registers in the map (0x00..=0x14).
pub const REG_COUNT: usize = 0x15;

// REG00 - input source control
pub const REG00: u8 = 0x00;
/// High-impedance input mode
pub const EN_HIZ: Field = Field::new(REG00, 0x80, 7);
/// Hardware ILIM pin enable
pub const EN_ILIM_PIN: Field = Field::new(REG00, 0x40, 6);
/// Input current limit, mA
pub const IINLIM: LinearField = LinearField::new(REG00, 0x3F, 0, 100, 50);

// REG02 - ADC and input-detection control
pub const REG02: u8 = 0x02;
/// One-shot ADC conversion start (self-clearing)
pub const CONV_START: Field = Field::new(REG02, 0x80, 7);
/// Continuous ADC conversion enable
pub const CONV_RATE: Field = Field::new(REG02, 0x40, 6);
/// Automatic input-source detection (D+/D-)
pub const AUTO_DPDM_EN: Field = Field::new(REG02, 0x01, 0);

// REG03 - charger control
pub const REG03: u8 = 0x03;
/// Watchdog reset (self-clearing)
pub const WD_RST: Field = Field::new(REG03, 0x40, 6);
/// Charging enable
pub const CHG_CONFIG: Field = Field::new(REG03, 0x10, 4);

// REG04 - fast charge current
pub const REG04: u8 = 0x04;
/// Fast-charge current limit, mA
pub const ICHG: LinearField = LinearField::new(REG04, 0x7F, 0, 0, 64);

// REG05 - precharge / termination current
pub const REG05: u8 = 0x05;
/// Precharge current limit, mA
pub const IPRECHG: LinearField = LinearField::new(REG05, 0xF0, 4, 64, 64);
/// Termination current threshold, mA
pub const ITERM: LinearField = LinearField::new(REG05, 0x0F, 0, 64, 64);

// REG06 - charge voltage
pub const REG06: u8 = 0x06;
/// Battery regulation voltage, mV
pub const VREG: LinearField = LinearField::new(REG06, 0xFC, 2, 3840, 16);

// REG07 - termination / watchdog control
pub const REG07: u8 = 0x07;
/// Charge termination enable
pub const EN_TERM: Field = Field::new(REG07, 0x80, 7);
/// Watchdog timeout selector (00 off, 01 40 s, 10 80 s, 11 160 s)
pub const WATCHDOG: Field = Field::new(REG07, 0x30, 4);

// REG0B - status
pub const REG0B: u8 = 0x0B;
/// Input source status
pub const VBUS_STAT: Field = Field::new(REG0B, 0xE0, 5);
/// Charging status (idle / precharge / fastcharge / done)
pub const CHRG_STAT: Field = Field::new(REG0B, 0x18, 3);
/// Power-good status
pub const PG_STAT: Field = Field::new(REG0B, 0x04, 2);

// REG0C - fault byte (read to decode; see types::Faults)
pub const REG0C: u8 = 0x0C;

// REG0D - input voltage limit
pub const REG0D: u8 = 0x0D;
/// Absolute (vs relative) VINDPM mode
pub const FORCE_VINDPM: Field = Field::new(REG0D, 0x80, 7);
/// Absolute input voltage limit, mV
pub const VINDPM: LinearField = LinearField::new(REG0D, 0x7F, 0, 2600, 100);

// REG0E..REG13 - ADC conversion results
pub const REG0E: u8 = 0x0E;
/// Battery voltage reading, mV
pub const BATV: LinearField = LinearField::new(REG0E, 0x7F, 0, 2304, 20);

pub const REG0F: u8 = 0x0F;
/// System voltage reading, mV
pub const SYSV: LinearField = LinearField::new(REG0F, 0x7F, 0, 2304, 20);

pub const REG11: u8 = 0x11;
/// VBUS present (good) flag
pub const VBUS_GD: Field = Field::new(REG11, 0x80, 7);
/// VBUS voltage reading, mV
pub const VBUSV: LinearField = LinearField::new(REG11, 0x7F, 0, 2600, 100);

pub const REG12: u8 = 0x12;
/// Charge current reading, mA
pub const ICHGR: LinearField = LinearField::new(REG12, 0x7F, 0, 0, 50);

// REG13 - DPM status and effective input current limit
pub const REG13: u8 = 0x13;
/// Input voltage regulation active
pub const VDPM_STAT: Field = Field::new(REG13, 0x80, 7);
/// Input current regulation active
pub const IDPM_STAT: Field = Field::new(REG13, 0x40, 6);
/// Effective input current limit, mA
pub const IDPM_LIM: LinearField = LinearField::new(REG13, 0x3F, 0, 100, 50);

// REG14 - part information / reset
pub const REG14: u8 = 0x14;
/// Register reset (self-clearing)
pub const REG_RST: Field = Field::new(REG14, 0x80, 7);
/// Part number code
pub const PN: Field = Field::new(REG14, 0x38, 3);
/// Silicon revision
pub const DEV_REV: Field = Field::new(REG14, 0x03, 0);
