#![no_std]
#![cfg_attr(not(doctest), doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md")))]

#[macro_use]
mod fmt;

pub mod config;
pub mod fifo;
pub mod identity;
pub mod ll;
pub mod probe;
pub mod ready;
pub mod registers;
pub mod uninitialized;

use config::{Config, DeviceConfig};
use identity::DeviceIdentity;

/// Failure code reported for a part with an impossible silicon revision
pub const FAILURE_INCONSISTENT_REVISION: u8 = 5;

/// Driver errors
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Bus transaction failed
    Bus(E),
    /// Nothing acknowledged the WHO_AM_I read during detection
    NoResponse(E),
    /// WHO_AM_I does not match the address (contains the value read)
    WhoAmIMismatch(u8),
    /// The revision code cannot come from a genuine part
    ///
    /// This is terminal. The handle remembers it and refuses to detect or
    /// configure the device again.
    InconsistentRevision(u8),
    /// The FIFO batch ended in a partial record
    ///
    /// The FIFO has been flushed. The first `dispatched` records of the batch
    /// were already delivered to the sink.
    TornFrame { dispatched: usize },
}

impl<E> Error<E> {
    /// No MPU-6050 answered at the address, another driver may be tried
    ///
    /// Both variants are produced by [`MPU6050::detect`] only.
    pub fn is_not_present(&self) -> bool {
        matches!(self, Error::NoResponse(_) | Error::WhoAmIMismatch(_))
    }

    /// The device must be taken out of service
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InconsistentRevision(_))
    }

    /// Failure code to report for fatal errors
    pub fn failure_code(&self) -> Option<u8> {
        self.is_fatal().then_some(FAILURE_INCONSISTENT_REVISION)
    }
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}

/// Indicates that the `MPU6050` instance has not been detected and configured
#[derive(Debug, Default)]
pub struct Uninitialized {
    /// Revision code of a latched [`Error::InconsistentRevision`]
    fault: Option<u8>,
}

/// Indicates that the `MPU6050` instance is ready to be used
#[derive(Debug)]
pub struct Ready {
    identity: DeviceIdentity,
    device_config: DeviceConfig,
    configuration_faults: u8,
}

/// MPU6050 top-level driver
///
/// Usage:
///
/// ```rust,ignore
/// # use embedded_hal_mock::eh1::i2c::Mock as I2cMock;
/// # use embedded_hal_mock::eh1::delay::NoopDelay as Delay;
/// use mpu6050_fc::{config::Config, fifo::SampleSink, MPU6050};
///
/// let config = Config::default().with_low_pass(50u16).with_fifo(true);
/// let mut mpu = MPU6050::new(i2c, config);
///
/// let identity = mpu.detect(&mut Delay)?;
/// let mut mpu = mpu.initialize(identity, &mut Delay)?;
///
/// loop {
///     let mut sink = (|accel| acc_handle(accel), |gyro| gyro_handle(gyro));
///     match mpu.fetch_samples(&mut sink) {
///         Ok(count) => {}
///         Err(e) if e.is_fatal() => break,
///         Err(_) => {} // torn batch, the FIFO was flushed
///     }
/// }
/// ```
pub struct MPU6050<I2C, State> {
    ll: crate::ll::MPU6050<I2C>,
    config: Config,
    state: State,
}

impl<I2C, State> MPU6050<I2C, State> {
    /// Attach-time configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Direct low level access to the underlying peripheral
    pub fn ll(&mut self) -> &mut crate::ll::MPU6050<I2C> {
        &mut self.ll
    }

    /// Release the bus from the MPU6050 instance
    pub fn release(self) -> I2C {
        self.ll.release()
    }
}
