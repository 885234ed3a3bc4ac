//! Register-file bus simulator
//!
//! Implements the async I²C trait over an in-memory copy of the charger's
//! register file, with per-register error injection and a write log. Used
//! by this crate's unit tests and by the control crate's session tests.

use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, Operation, SevenBitAddress};
use heapless::Vec;

use crate::bq25898s::regs::{self, REG_COUNT};

/// Injected bus failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

impl embedded_hal_async::i2c::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// In-memory charger with a scriptable register file.
pub struct SimBus {
    regs: [u8; REG_COUNT],
    ptr: usize,
    /// Every byte written, as (address, value), in order
    pub writes: Vec<(u8, u8), 128>,
    /// Reads touching this address fail
    pub fail_read: Option<u8>,
    /// Writes touching this address fail
    pub fail_write: Option<u8>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    pub fn new() -> Self {
        Self {
            regs: [0; REG_COUNT],
            ptr: 0,
            writes: Vec::new(),
            fail_read: None,
            fail_write: None,
        }
    }

    /// A simulator that identifies as the expected secondary-charger part.
    pub fn with_part(part_code: u8, revision: u8) -> Self {
        let mut sim = Self::new();
        sim.regs[regs::REG14 as usize] =
            regs::PN.encode(part_code) | regs::DEV_REV.encode(revision);
        sim
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.regs[addr as usize]
    }

    pub fn set_reg(&mut self, addr: u8, value: u8) {
        self.regs[addr as usize] = value;
    }

    /// Number of logged writes to one register.
    pub fn writes_to(&self, addr: u8) -> usize {
        self.writes.iter().filter(|(a, _)| *a == addr).count()
    }

    // ADC result helpers; values are quantized to the field's step size.

    pub fn set_battery_voltage(&mut self, mv: u16) {
        self.regs[regs::REG0E as usize] = regs::BATV.field.encode(regs::BATV.encode(mv));
    }

    pub fn set_vbus_voltage(&mut self, mv: u16) {
        self.regs[regs::REG11 as usize] = regs::VBUSV.field.encode(regs::VBUSV.encode(mv));
    }

    pub fn set_charge_current(&mut self, ma: u16) {
        self.regs[regs::REG12 as usize] = regs::ICHGR.field.encode(regs::ICHGR.encode(ma));
    }

    pub fn set_charge_status(&mut self, raw_status: u8) {
        let byte = self.regs[regs::REG0B as usize];
        self.regs[regs::REG0B as usize] = regs::CHRG_STAT.merge(byte, raw_status);
    }

    pub fn set_faults(&mut self, raw: u8) {
        self.regs[regs::REG0C as usize] = raw;
    }
}

impl ErrorType for SimBus {
    type Error = SimError;
}

impl I2c<SevenBitAddress> for SimBus {
    async fn read(&mut self, address: SevenBitAddress, read: &mut [u8]) -> Result<(), Self::Error> {
        self.transaction(address, &mut [Operation::Read(read)])
            .await
    }

    async fn write(&mut self, address: SevenBitAddress, write: &[u8]) -> Result<(), Self::Error> {
        self.transaction(address, &mut [Operation::Write(write)])
            .await
    }

    async fn write_read(
        &mut self,
        address: SevenBitAddress,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.transaction(
            address,
            &mut [Operation::Write(write), Operation::Read(read)],
        )
        .await
    }

    async fn transaction(
        &mut self,
        _address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if let Some((&reg, data)) = bytes.split_first() {
                        self.ptr = reg as usize;
                        for &value in data {
                            if self.fail_write == Some(self.ptr as u8) {
                                return Err(SimError);
                            }
                            self.regs[self.ptr % REG_COUNT] = value;
                            let _ = self.writes.push((self.ptr as u8, value));
                            self.ptr += 1;
                        }
                    }
                }
                Operation::Read(buf) => {
                    for slot in buf.iter_mut() {
                        if self.fail_read == Some(self.ptr as u8) {
                            return Err(SimError);
                        }
                        *slot = self.regs[self.ptr % REG_COUNT];
                        self.ptr += 1;
                    }
                }
            }
        }
        Ok(())
    }
}
