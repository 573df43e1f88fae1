use embedded_hal::i2c::I2c;

use crate::registers::{Register, Registers, FIFO_R_W};

pub struct MPU6050<I2C> {
    pub(crate) bus: I2C,
    address: u8,
}

impl<I2C> MPU6050<I2C> {
    pub fn new(bus: I2C, address: u8) -> Self {
        MPU6050 { bus, address }
    }

    /// 7-bit I²C address the device is accessed at
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn registers(&mut self) -> Registers<'_, I2C> {
        Registers::new(&mut self.bus, self.address)
    }

    /// Release the bus from the MPU6050 instance
    pub fn release(self) -> I2C {
        self.bus
    }
}

impl<I2C> MPU6050<I2C>
where
    I2C: I2c,
{
    /// Pop `buffer.len()` bytes from the FIFO in one burst
    pub fn read_fifo(&mut self, buffer: &mut [u8]) -> Result<(), I2C::Error> {
        self.bus.write_read(self.address, &[FIFO_R_W::ID], buffer)
    }
}
