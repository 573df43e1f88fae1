use bytemuck::{AnyBitPattern, NoUninit};

/// Size of one FIFO record: accel X/Y/Z then gyro X/Y/Z, 16 bits each
pub const RECORD_SIZE: usize = 12;

/// Records drained from the FIFO per fetch
pub const FIFO_BATCH_RECORDS: usize = 8;

/// Bytes drained from the FIFO per fetch
pub const FIFO_BATCH_LEN: usize = FIFO_BATCH_RECORDS * RECORD_SIZE;

/// Number of FIFO_COUNT reads before the count is accepted as-is
///
/// A count that is not a whole number of records means the device is in the
/// middle of pushing a record. One more read is enough for it to finish.
pub const FIFO_COUNT_ATTEMPTS: usize = 2;

/// One record as it sits in the FIFO, in device (big-endian) order
#[derive(Debug, Clone, Copy, PartialEq, NoUninit, AnyBitPattern, Default)]
#[repr(C)]
pub struct FifoRecord {
    pub accel: [u16; 3],
    pub gyro: [u16; 3],
}

impl FifoRecord {
    /// Copy a record out of a byte slice
    ///
    /// Returns `None` unless `bytes` is exactly one record long, a short slice
    /// is the tail of a torn capture.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        (bytes.len() == RECORD_SIZE).then(|| bytemuck::pod_read_unaligned(bytes))
    }

    /// Swap to host order
    pub fn sample(&self) -> Sample {
        Sample {
            accel: self.accel.map(|v| i16::from_be(v as i16)),
            gyro: self.gyro.map(|v| i16::from_be(v as i16)),
        }
    }
}

/// A synchronized accelerometer and gyroscope reading, raw counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

/// Receiver of decoded samples
///
/// Both callbacks run synchronously from
/// [`fetch_samples`](crate::MPU6050::fetch_samples), accel first.
pub trait SampleSink {
    fn on_accel(&mut self, accel: [i16; 3]);
    fn on_gyro(&mut self, gyro: [i16; 3]);
}

impl<A, G> SampleSink for (A, G)
where
    A: FnMut([i16; 3]),
    G: FnMut([i16; 3]),
{
    fn on_accel(&mut self, accel: [i16; 3]) {
        (self.0)(accel)
    }

    fn on_gyro(&mut self, gyro: [i16; 3]) {
        (self.1)(gyro)
    }
}

/// Assemble three big-endian pairs, as found in ACCEL_XOUT_H and GYRO_XOUT_H
pub fn axes_from_be(bytes: [u8; 6]) -> [i16; 3] {
    [
        i16::from_be_bytes([bytes[0], bytes[1]]),
        i16::from_be_bytes([bytes[2], bytes[3]]),
        i16::from_be_bytes([bytes[4], bytes[5]]),
    ]
}

// Assert that the size of the struct is 12 bytes
const _SIZE_CHECK: usize = (core::mem::size_of::<FifoRecord>() == RECORD_SIZE) as usize - 1;
