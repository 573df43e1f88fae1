//! Device identity and silicon revision
//!
//! Early MPU-6050 parts (the "ES" engineering samples) report half the
//! accelerometer sensitivity of production parts. The revision is encoded in
//! the LSBs of the accelerometer trim registers; parts that leave those bits
//! clear report it in the low nibble of PRODUCT_ID instead.

use bilge::prelude::*;

use crate::Error;

/// WHO_AM_I holds the upper 6 bits of the I²C address, AD0 is not reflected
pub const WHO_AM_I_MASK: u8 = 0x7E;

/// Product revision nibble that identifies a half resolution part
pub const PRODUCT_REVISION_HALF: u8 = 4;

/// Counts per g at 8 g full scale on a half resolution part
pub const ACCEL_ONE_G_HALF: u16 = 256 * 8;

/// Counts per g at 8 g full scale on a full resolution part
pub const ACCEL_ONE_G_FULL: u16 = 512 * 8;

/// Expected WHO_AM_I value for a device at `address`
pub fn expected_who_am_i(address: u8) -> u8 {
    address & WHO_AM_I_MASK
}

/// Accelerometer resolution variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    Half,
    Full,
}

impl Resolution {
    /// Accelerometer counts per g with the 8 g range the driver programs
    pub fn accel_one_g(self) -> u16 {
        match self {
            Resolution::Half => ACCEL_ONE_G_HALF,
            Resolution::Full => ACCEL_ONE_G_FULL,
        }
    }

    /// Single letter revision tag, `'o'` for the old ES parts
    pub fn revision_code(self) -> char {
        match self {
            Resolution::Half => 'o',
            Resolution::Full => 'n',
        }
    }
}

/// Revision bits scattered over the accelerometer trim block
#[bitsize(3)]
#[derive(Clone, Copy, DebugBits, FromBits, PartialEq)]
pub struct TrimRevision {
    pub xa_lsb: bool,
    pub ya_lsb: bool,
    pub za_lsb: bool,
}

impl TrimRevision {
    /// Gather bit 0 of bytes 1, 3 and 5 of the XA/YA/ZA_OFFS block
    pub fn from_trim_block(block: &[u8; 6]) -> Self {
        TrimRevision::new(block[1] & 1 != 0, block[3] & 1 != 0, block[5] & 1 != 0)
    }

    pub fn code(self) -> u8 {
        u3::from(self).value()
    }
}

/// Decode the revision from the trim block
///
/// `Ok(None)` means the block carries no revision and PRODUCT_ID has to be
/// consulted.
pub fn resolution_from_trim<E>(block: &[u8; 6]) -> Result<Option<Resolution>, Error<E>> {
    match TrimRevision::from_trim_block(block).code() {
        0 => Ok(None),
        1 => Ok(Some(Resolution::Half)),
        2 => Ok(Some(Resolution::Full)),
        code => Err(Error::InconsistentRevision(code)),
    }
}

/// Decode the revision from the PRODUCT_ID revision nibble
pub fn resolution_from_product_revision<E>(revision: u8) -> Result<Resolution, Error<E>> {
    match revision & 0x0F {
        0 => Err(Error::InconsistentRevision(0)),
        PRODUCT_REVISION_HALF => Ok(Resolution::Half),
        _ => Ok(Resolution::Full),
    }
}

/// A detected device
///
/// Only [`detect`](crate::MPU6050::detect) creates these, holding one is proof
/// that the device answered with the right signature and a sane revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceIdentity {
    address: u8,
    who_am_i: u8,
    revision: u8,
    resolution: Resolution,
}

impl DeviceIdentity {
    pub(crate) fn new(address: u8, who_am_i: u8, revision: u8, resolution: Resolution) -> Self {
        Self {
            address,
            who_am_i,
            revision,
            resolution,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn who_am_i(&self) -> u8 {
        self.who_am_i
    }

    /// Trim block code, or the PRODUCT_ID nibble when the trim code was 0
    pub fn revision(&self) -> u8 {
        self.revision
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn accel_one_g(&self) -> u16 {
        self.resolution.accel_one_g()
    }
}
