// Indicates that the `MPU6050` instance is not initialized yet

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::{
    config::{Config, DeviceConfig},
    identity::{self, DeviceIdentity},
    Error, Ready, Uninitialized, MPU6050,
};

/// Power-up time before WHO_AM_I answers, 30 ms per the datasheet plus margin
pub const POWER_ON_SETTLE_MS: u32 = 35;

/// Time for DEVICE_RESET to complete
pub const RESET_SETTLE_MS: u32 = 100;

/// PWR_MGMT_1.CLKSEL: PLL with Z axis gyroscope reference
const CLKSEL_PLL_GYRO_Z: u8 = 3;

impl<I2C> MPU6050<I2C, Uninitialized> {
    pub fn new(i2c: I2C, config: Config) -> Self {
        MPU6050 {
            ll: crate::ll::MPU6050::new(i2c, config.address),
            config,
            state: Uninitialized::default(),
        }
    }

    /// Revision code of a latched inconsistent revision fault, if any
    pub fn fault(&self) -> Option<u8> {
        self.state.fault
    }
}

impl<I2C> MPU6050<I2C, Uninitialized>
where
    I2C: I2c,
{
    /// Check that an MPU-6050 answers at the configured address and find out
    /// which accelerometer resolution it has
    ///
    /// [`Error::NoResponse`] or [`Error::WhoAmIMismatch`] means there is no
    /// device, the bus can be [released](MPU6050::release) and handed to
    /// another driver.
    ///
    /// [`Error::InconsistentRevision`] is fatal and latched in the handle:
    /// every later call returns it again without touching the bus.
    pub fn detect(&mut self, delay: &mut impl DelayNs) -> Result<DeviceIdentity, Error<I2C::Error>> {
        if let Some(code) = self.state.fault {
            return Err(Error::InconsistentRevision(code));
        }

        delay.delay_ms(POWER_ON_SETTLE_MS);

        let address = self.ll.address();
        let mut regs = self.ll.registers();

        let who_am_i = regs
            .who_am_i()
            .read()
            .map_err(Error::NoResponse)?
            .value();
        if who_am_i != identity::expected_who_am_i(address) {
            debug!("no MPU6050 at {=u8:#x}, WHO_AM_I {=u8:#x}", address, who_am_i);
            return Err(Error::WhoAmIMismatch(who_am_i));
        }

        let trim = regs.xa_offs_h().read()?.bytes();
        let decoded = match identity::resolution_from_trim(&trim) {
            Ok(Some(resolution)) => {
                Ok((identity::TrimRevision::from_trim_block(&trim).code(), resolution))
            }
            Ok(None) => {
                // Trim bits clear, the revision lives in PRODUCT_ID
                let revision = regs.product_id().read()?.revision();
                identity::resolution_from_product_revision(revision)
                    .map(|resolution| (revision, resolution))
            }
            Err(err) => Err(err),
        };

        let (revision, resolution) = match decoded {
            Ok(decoded) => decoded,
            Err(err) => {
                if let Error::InconsistentRevision(code) = err {
                    warn!("MPU6050 at {=u8:#x} has inconsistent revision {=u8}", address, code);
                    self.state.fault = Some(code);
                }
                return Err(err);
            }
        };

        info!(
            "MPU6050 at {=u8:#x}, revision {=u8}, {} resolution",
            address,
            revision,
            resolution
        );

        Ok(DeviceIdentity::new(address, who_am_i, revision, resolution))
    }

    /// Reset and configure the device
    ///
    /// The order of the writes matters: everything after the reset would be
    /// lost if written before it, including the accelerometer range.
    ///
    /// Write failures do not abort the sequence. Each one is logged and
    /// counted, see [`MPU6050::configuration_faults`].
    ///
    /// A handle with a latched [`Error::InconsistentRevision`] is refused
    /// before anything is written.
    pub fn initialize(
        mut self,
        identity: DeviceIdentity,
        delay: &mut impl DelayNs,
    ) -> Result<MPU6050<I2C, Ready>, Error<I2C::Error>> {
        if let Some(code) = self.state.fault {
            return Err(Error::InconsistentRevision(code));
        }

        let device_config = DeviceConfig::from_config(&self.config);
        let mut faults = 0u8;
        let mut check = |step: &str, result: Result<(), I2C::Error>| {
            if let Err(_err) = result {
                warn!("MPU6050 configuration write failed: {=str}", step);
                faults = faults.saturating_add(1);
            }
        };

        let mut regs = self.ll.registers();

        check("reset", regs.pwr_mgmt_1().write(|w| w.device_reset(1)));
        delay.delay_ms(RESET_SETTLE_MS);

        check(
            "clock",
            regs.pwr_mgmt_1().write(|w| w.clksel(CLKSEL_PLL_GYRO_Z)),
        );
        check(
            "sample rate",
            regs.smplrt_div()
                .write(|w| w.smplrt_div(device_config.sample_rate_divider)),
        );
        check(
            "filter",
            regs.config().write(|w| w.dlpf_cfg(device_config.filter.bits())),
        );
        check(
            "gyro range",
            regs.gyro_config()
                .write(|w| w.fs_sel(device_config.gyro_fsr.bits())),
        );
        check(
            "accel range",
            regs.accel_config()
                .write(|w| w.afs_sel(device_config.accel_fsr.bits())),
        );
        check(
            "int pin",
            regs.int_pin_cfg()
                .write(|w| w.bits(device_config.int_pin.bits())),
        );

        if device_config.fifo_enabled {
            check("fifo reset", regs.user_ctrl().write(|w| w.fifo_reset(1)));
            check("fifo enable", regs.user_ctrl().write(|w| w.fifo_en(1)));
            check(
                "fifo sources",
                regs.fifo_en().write(|w| {
                    w.xg_fifo_en(1)
                        .yg_fifo_en(1)
                        .zg_fifo_en(1)
                        .accel_fifo_en(1)
                }),
            );
        }

        if device_config.data_ready_enabled {
            check(
                "data ready",
                regs.int_enable().write(|w| w.data_rdy_en(1)),
            );
        }

        if faults > 0 {
            warn!("MPU6050 partially configured, {=u8} writes failed", faults);
        }
        debug!(
            "MPU6050 gyro bandwidth {=u16} Hz, divider {=u8}",
            device_config.filter.bandwidth_hz(),
            device_config.sample_rate_divider
        );

        Ok(MPU6050 {
            ll: self.ll,
            config: self.config,
            state: Ready {
                identity,
                device_config,
                configuration_faults: faults,
            },
        })
    }
}
