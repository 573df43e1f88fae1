//! Attach-time configuration and the register image derived from it

use bilge::prelude::*;

/// I²C address with AD0 low
pub const DEFAULT_ADDRESS: u8 = 0x68;

/// Raw cutoff value that requests the low pass filter to be disabled
pub const LPF_DISABLE_SENTINEL: u16 = 0xFFFF;

/// Low pass cutoff used when none is requested
pub const DEFAULT_LOW_PASS_HZ: u16 = 42;

/// SMPLRT_DIV with the DLPF off: 8 kHz gyro output rate / (1 + 7) = 1 kHz
pub const SMPLRT_DIV_NO_LPF: u8 = 7;

/// SMPLRT_DIV with the DLPF on: 1 kHz gyro output rate / (1 + 0) = 1 kHz
pub const SMPLRT_DIV_LPF: u8 = 0;

/// Requested low pass cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LowPassCutoff {
    /// Run the gyro unfiltered at 8 kHz
    Disabled,
    /// Pick the closest supported bandwidth at or below this cutoff
    Hz(u16),
}

impl Default for LowPassCutoff {
    fn default() -> Self {
        LowPassCutoff::Hz(DEFAULT_LOW_PASS_HZ)
    }
}

impl From<u16> for LowPassCutoff {
    fn from(value: u16) -> Self {
        match value {
            LPF_DISABLE_SENTINEL => LowPassCutoff::Disabled,
            hz => LowPassCutoff::Hz(hz),
        }
    }
}

/// DLPF_CFG values of the CONFIG register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FilterSetting {
    Lpf256HzNoLpf2 = 0,
    Lpf188Hz = 1,
    Lpf98Hz = 2,
    Lpf42Hz = 3,
    Lpf20Hz = 4,
    Lpf10Hz = 5,
    Lpf5Hz = 6,
    Lpf2100HzNoLpf = 7,
}

impl FilterSetting {
    /// Select the filter for a requested cutoff
    ///
    /// Thresholds are tried from the highest down and match with `>=`, so a
    /// request that sits exactly on a bandwidth selects that bandwidth.
    pub fn select(cutoff: LowPassCutoff) -> Self {
        match cutoff {
            LowPassCutoff::Disabled => FilterSetting::Lpf256HzNoLpf2,
            LowPassCutoff::Hz(hz) if hz >= 188 => FilterSetting::Lpf188Hz,
            LowPassCutoff::Hz(hz) if hz >= 98 => FilterSetting::Lpf98Hz,
            LowPassCutoff::Hz(hz) if hz >= 42 => FilterSetting::Lpf42Hz,
            LowPassCutoff::Hz(hz) if hz >= 20 => FilterSetting::Lpf20Hz,
            LowPassCutoff::Hz(hz) if hz >= 10 => FilterSetting::Lpf10Hz,
            LowPassCutoff::Hz(_) => FilterSetting::Lpf5Hz,
        }
    }

    /// Value of the DLPF_CFG field
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Gyro bandwidth in Hz
    pub fn bandwidth_hz(self) -> u16 {
        match self {
            FilterSetting::Lpf256HzNoLpf2 => 256,
            FilterSetting::Lpf188Hz => 188,
            FilterSetting::Lpf98Hz => 98,
            FilterSetting::Lpf42Hz => 42,
            FilterSetting::Lpf20Hz => 20,
            FilterSetting::Lpf10Hz => 10,
            FilterSetting::Lpf5Hz => 5,
            FilterSetting::Lpf2100HzNoLpf => 2100,
        }
    }
}

/// Gyroscope full scale range (FS_SEL)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum GyroFsr {
    Dps250 = 0,
    Dps500 = 1,
    Dps1000 = 2,
    Dps2000 = 3,
}

impl GyroFsr {
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Counts per degree per second
    pub fn lsb_per_dps(self) -> f32 {
        match self {
            GyroFsr::Dps250 => 131.0,
            GyroFsr::Dps500 => 65.5,
            GyroFsr::Dps1000 => 32.8,
            GyroFsr::Dps2000 => 16.4,
        }
    }
}

/// Accelerometer full scale range (AFS_SEL)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AccelFsr {
    G2 = 0,
    G4 = 1,
    G8 = 2,
    G16 = 3,
}

impl AccelFsr {
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// INT_PIN_CFG register image
///
/// All zero is an active high, push-pull, pulsed INT line that is cleared by
/// reading INT_STATUS.
#[bitsize(8)]
#[derive(Clone, Copy, DebugBits, FromBits, PartialEq)]
pub struct IntPinConfig {
    pub clkout_en: bool,
    pub i2c_bypass_en: bool,
    pub fsync_int_en: bool,
    pub fsync_int_level: bool,
    pub int_rd_clear: bool,
    pub latch_int_en: bool,
    pub int_open: bool,
    pub int_level: bool,
}

impl IntPinConfig {
    /// Default INT behaviour with the auxiliary bus passed through to the host
    pub fn bypass_only() -> Self {
        let mut cfg = IntPinConfig::from(0u8);
        cfg.set_i2c_bypass_en(true);
        cfg
    }

    pub fn bits(self) -> u8 {
        u8::from(self)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for IntPinConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "IntPinConfig {{ int_level: {}, int_open: {}, latch_int_en: {}, int_rd_clear: {}, fsync_int_level: {}, fsync_int_en: {}, i2c_bypass_en: {}, clkout_en: {} }}",
            self.int_level(),
            self.int_open(),
            self.latch_int_en(),
            self.int_rd_clear(),
            self.fsync_int_level(),
            self.fsync_int_en(),
            self.i2c_bypass_en(),
            self.clkout_en(),
        );
    }
}

/// Attach-time configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// 7-bit I²C address of the device
    pub address: u8,
    /// Requested low pass cutoff
    pub low_pass: LowPassCutoff,
    /// Push accel + gyro records into the hardware FIFO
    pub fifo: bool,
    /// Pulse the INT line when new data is ready
    pub data_ready_interrupt: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            low_pass: LowPassCutoff::default(),
            fifo: false,
            data_ready_interrupt: false,
        }
    }
}

impl Config {
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_low_pass(mut self, low_pass: impl Into<LowPassCutoff>) -> Self {
        self.low_pass = low_pass.into();
        self
    }

    pub fn with_fifo(mut self, enabled: bool) -> Self {
        self.fifo = enabled;
        self
    }

    pub fn with_data_ready_interrupt(mut self, enabled: bool) -> Self {
        self.data_ready_interrupt = enabled;
        self
    }
}

/// Register image programmed by the configuration sequence
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub sample_rate_divider: u8,
    pub filter: FilterSetting,
    pub gyro_fsr: GyroFsr,
    pub accel_fsr: AccelFsr,
    pub int_pin: IntPinConfig,
    pub fifo_enabled: bool,
    pub data_ready_enabled: bool,
}

impl DeviceConfig {
    pub fn from_config(config: &Config) -> Self {
        let filter = FilterSetting::select(config.low_pass);
        // Keep the 1 kHz sample rate whatever the gyro output rate is
        let sample_rate_divider = if filter == FilterSetting::Lpf256HzNoLpf2 {
            SMPLRT_DIV_NO_LPF
        } else {
            SMPLRT_DIV_LPF
        };

        Self {
            sample_rate_divider,
            filter,
            gyro_fsr: GyroFsr::Dps2000,
            accel_fsr: AccelFsr::G8,
            int_pin: IntPinConfig::bypass_only(),
            fifo_enabled: config.fifo,
            data_ready_enabled: config.data_ready_interrupt,
        }
    }
}
