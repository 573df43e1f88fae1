//! Register map
//!
//! The MPU-6050 exposes a single flat register space over I²C. Every register
//! the driver touches is declared with `impl_register!`, which generates a
//! marker type, its read/write buffer types and an accessor on [`Registers`].
//!
//! Multi-byte registers are burst reads starting at the high byte, so the raw
//! bytes come back in device (big-endian) order.
#![allow(non_camel_case_types)]
#![allow(clippy::identity_op)]

use core::marker::PhantomData;

use embedded_hal::i2c::I2c;
use paste::paste;

#[derive(Debug, PartialEq, Eq)]
pub struct Registers<'b, I2C> {
    bus: &'b mut I2C,
    address: u8,
}

impl<'b, I2C> Registers<'b, I2C> {
    /// Create a new instance of `Registers` for the device at `address`
    pub fn new(bus: &'b mut I2C, address: u8) -> Self {
        Registers { bus, address }
    }

    /// 7-bit address of the device
    #[inline(always)]
    pub fn address(&self) -> u8 {
        self.address
    }
}

/// Provides access to a register
///
/// You can get an instance for a given register using one of the methods on
/// [`Registers`].
pub struct RegAccessor<'s, 'b, R, I2C>(&'s mut Registers<'b, I2C>, PhantomData<R>);

impl<R, I2C> RegAccessor<'_, '_, R, I2C>
where
    I2C: I2c,
{
    /// Read from the register
    pub fn read(&mut self) -> Result<R::Read, I2C::Error>
    where
        R: Register + Readable,
    {
        let mut r = R::read();
        let address = self.0.address;

        self.0.bus.write_read(address, &[R::ID], R::buffer(&mut r))?;

        Ok(r)
    }

    /// Write to the register
    ///
    /// Fields that are not set by `f` are written as zero.
    pub fn write<F>(&mut self, f: F) -> Result<(), I2C::Error>
    where
        R: Register + Writable,
        F: FnOnce(&mut R::Write) -> &mut R::Write,
    {
        let mut w = R::write();
        f(&mut w);

        let address = self.0.address;
        self.0.bus.write(address, R::frame(&mut w))
    }
}

/// Implemented for all registers
///
/// This is a mostly internal trait that should not be implemented or used
/// directly by users of this crate. It is exposed through the public API
/// though, so it can't be made private.
pub trait Register {
    /// The register index
    const ID: u8;

    /// The length of the register
    const LEN: usize;
}

/// Marker trait for registers that can be read from
pub trait Readable {
    /// The type that is used to read from the register
    type Read;

    /// Return the read type for this register
    fn read() -> Self::Read;

    /// Return the read type's internal buffer
    fn buffer(r: &mut Self::Read) -> &mut [u8];
}

/// Marker trait for registers that can be written to
pub trait Writable {
    /// The type that is used to write to the register
    type Write;

    /// Return the write type for this register
    fn write() -> Self::Write;

    /// Return the whole bus frame, register index first
    fn frame(w: &mut Self::Write) -> &mut [u8];
}

/// Generates register implementations
///
/// Fields are `name, first_bit, last_bit;` and must not cross a byte
/// boundary. Bit 0 of byte 0 is the LSB of the register at `ID`.
macro_rules! impl_register {
    (
        $(
            $id:expr,
            $len:expr,
            $rw:tt,
            $name:ident {
            #[$doc:meta]
            $(
                $field:ident,
                $first_bit:expr,
                $last_bit:expr;
                #[$field_doc:meta]
            )*
            }
        )*
    ) => {
        paste! {
            $(
                #[$doc]
                pub struct $name;

                impl Register for $name {
                    const ID:  u8    = $id;
                    const LEN: usize = $len;
                }

                impl $name {
                    // Register index in front of the data on writes
                    const HEADER_LEN: usize = 1;
                }

                #[$doc]
                pub mod [<$name:lower>] {
                    use core::fmt;

                    const HEADER_LEN: usize = super::$name::HEADER_LEN;

                    /// Used to read from the register
                    pub struct R(pub(crate) [u8; $len]);

                    impl R {
                        /// Raw register bytes in device order
                        pub fn bytes(&self) -> [u8; $len] {
                            self.0
                        }

                        $(
                            #[$field_doc]
                            pub fn $field(&self) -> u8 {
                                const BYTE:  usize = $first_bit / 8;
                                const SHIFT: usize = $first_bit % 8;
                                const WIDTH: usize = $last_bit - $first_bit + 1;
                                const MASK:  u8    = ((1u16 << WIDTH) - 1) as u8;

                                (self.0[BYTE] >> SHIFT) & MASK
                            }
                        )*
                    }

                    impl fmt::Debug for R {
                        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                            write!(f, "0x")?;
                            for b in self.0.iter() {
                                write!(f, "{:02x}", b)?;
                            }

                            Ok(())
                        }
                    }

                    /// Used to write to the register
                    pub struct W(pub(crate) [u8; HEADER_LEN + $len]);

                    impl W {
                        /// Overwrite the first data byte
                        pub fn bits(&mut self, value: u8) -> &mut Self {
                            self.0[HEADER_LEN] = value;
                            self
                        }

                        $(
                            #[$field_doc]
                            pub fn $field(&mut self, value: u8) -> &mut Self {
                                const BYTE:  usize = $first_bit / 8;
                                const SHIFT: usize = $first_bit % 8;
                                const WIDTH: usize = $last_bit - $first_bit + 1;
                                const MASK:  u8    = ((1u16 << WIDTH) - 1) as u8;

                                let target = &mut self.0[HEADER_LEN + BYTE];
                                *target &= !(MASK << SHIFT);
                                *target |= (value & MASK) << SHIFT;

                                self
                            }
                        )*
                    }
                }

                impl_rw!($rw, $name, [<$name:lower>], $len);
            )*

            impl<'b, I2C> Registers<'b, I2C> {
                $(
                    #[$doc]
                    pub fn [<$name:lower>](&mut self) -> RegAccessor<'_, 'b, $name, I2C> {
                        RegAccessor(self, PhantomData)
                    }
                )*
            }
        }
    }
}

// Helper macro, used internally by `impl_register!`
macro_rules! impl_rw {
    (RO, $name:ident, $name_lower:ident, $len:expr) => {
        impl_rw!(@R, $name, $name_lower, $len);
    };
    (RW, $name:ident, $name_lower:ident, $len:expr) => {
        impl_rw!(@R, $name, $name_lower, $len);
        impl_rw!(@W, $name, $name_lower, $len);
    };
    (WO, $name:ident, $name_lower:ident, $len:expr) => {
        impl_rw!(@W, $name, $name_lower, $len);
    };

    (@R, $name:ident, $name_lower:ident, $len:expr) => {
        impl Readable for $name {
            type Read = $name_lower::R;

            fn read() -> Self::Read {
                $name_lower::R([0; $len])
            }

            fn buffer(r: &mut Self::Read) -> &mut [u8] {
                &mut r.0
            }
        }
    };
    (@W, $name:ident, $name_lower:ident, $len:expr) => {
        impl Writable for $name {
            type Write = $name_lower::W;

            fn write() -> Self::Write {
                let mut frame = [0; Self::HEADER_LEN + $len];
                frame[0] = <Self as Register>::ID;
                $name_lower::W(frame)
            }

            fn frame(w: &mut Self::Write) -> &mut [u8] {
                &mut w.0
            }
        }
    };
}

impl_register! {
    0x06, 6, RO, XA_OFFS_H { /// Accelerometer trim block (XA/YA/ZA_OFFS), bit 0 of bytes 1, 3 and 5 encode the silicon revision
    }
    0x0C, 1, RO, PRODUCT_ID { /// Product identifier register
        revision, 0, 3; /// Silicon revision, consulted when the trim block carries no revision
        family, 4, 7; /// Product family
    }
    0x19, 1, RW, SMPLRT_DIV { /// Sample rate divider, sample rate = gyro output rate / (1 + SMPLRT_DIV)
        smplrt_div, 0, 7; /// Divider value
    }
    0x1A, 1, RW, CONFIG { /// Configuration register
        dlpf_cfg, 0, 2; /// Digital low pass filter configuration
        ext_sync_set, 3, 5; /// FSYNC pin sampling (0 = disabled)
    }
    0x1B, 1, RW, GYRO_CONFIG { /// Gyroscope configuration register
        fs_sel, 3, 4; /// Gyroscope full scale range. 0: 250 dps, 1: 500 dps, 2: 1000 dps, 3: 2000 dps
        zg_st, 5, 5; /// Z axis self test
        yg_st, 6, 6; /// Y axis self test
        xg_st, 7, 7; /// X axis self test
    }
    0x1C, 1, RW, ACCEL_CONFIG { /// Accelerometer configuration register
        afs_sel, 3, 4; /// Accelerometer full scale range. 0: 2 g, 1: 4 g, 2: 8 g, 3: 16 g
        za_st, 5, 5; /// Z axis self test
        ya_st, 6, 6; /// Y axis self test
        xa_st, 7, 7; /// X axis self test
    }
    0x23, 1, RW, FIFO_EN { /// FIFO enable register, selects which measurements are pushed to the FIFO
        slv0_fifo_en, 0, 0; /// External sensor slave 0
        slv1_fifo_en, 1, 1; /// External sensor slave 1
        slv2_fifo_en, 2, 2; /// External sensor slave 2
        accel_fifo_en, 3, 3; /// ACCEL_XOUT to ACCEL_ZOUT
        zg_fifo_en, 4, 4; /// GYRO_ZOUT
        yg_fifo_en, 5, 5; /// GYRO_YOUT
        xg_fifo_en, 6, 6; /// GYRO_XOUT
        temp_fifo_en, 7, 7; /// TEMP_OUT
    }
    0x37, 1, RW, INT_PIN_CFG { /// INT pin / bypass enable configuration, see [`crate::config::IntPinConfig`]
        i2c_bypass_en, 1, 1; /// Auxiliary I²C bus bypass
        fsync_int_en, 2, 2; /// FSYNC pin as interrupt
        fsync_int_level, 3, 3; /// FSYNC interrupt active low
        int_rd_clear, 4, 4; /// Clear interrupt status on any read
        latch_int_en, 5, 5; /// Hold INT high until cleared
        int_open, 6, 6; /// Open drain INT pin
        int_level, 7, 7; /// INT pin active low
    }
    0x38, 1, RW, INT_ENABLE { /// Interrupt enable register
        data_rdy_en, 0, 0; /// Data ready interrupt
        i2c_mst_int_en, 3, 3; /// I²C master interrupt sources
        fifo_oflow_en, 4, 4; /// FIFO overflow interrupt
    }
    0x3B, 6, RO, ACCEL_XOUT_H { /// Latest accelerometer measurement, X/Y/Z as big-endian pairs
    }
    0x43, 6, RO, GYRO_XOUT_H { /// Latest gyroscope measurement, X/Y/Z as big-endian pairs
    }
    0x6A, 1, RW, USER_CTRL { /// User control register
        sig_cond_reset, 0, 0; /// Reset signal paths and sensor registers
        i2c_mst_reset, 1, 1; /// Reset the I²C master
        fifo_reset, 2, 2; /// Reset the FIFO buffer, self clearing
        i2c_if_dis, 4, 4; /// Disable the primary I²C interface (MPU-6000 only)
        i2c_mst_en, 5, 5; /// Enable I²C master mode
        fifo_en, 6, 6; /// Enable FIFO operations
    }
    0x6B, 1, RW, PWR_MGMT_1 { /// Power management register 1
        clksel, 0, 2; /// Clock source. 0: internal 8 MHz, 1-3: PLL with X/Y/Z gyro reference
        temp_dis, 3, 3; /// Disable the temperature sensor
        cycle, 5, 5; /// Cycle between sleep and a single sample
        sleep, 6, 6; /// Sleep mode
        device_reset, 7, 7; /// Reset all registers to default, self clearing
    }
    0x72, 2, RO, FIFO_COUNTH { /// Number of bytes in the FIFO, big-endian
    }
    0x74, 1, RO, FIFO_R_W { /// FIFO data port, burst reads pop consecutive bytes
        data, 0, 7; /// FIFO byte
    }
    0x75, 1, RO, WHO_AM_I { /// Device identity register, upper 6 bits of the 7-bit I²C address
        value, 0, 7; /// Raw register value
    }
}
