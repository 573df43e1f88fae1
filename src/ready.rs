use embedded_hal::i2c::I2c;

use crate::{
    config::DeviceConfig,
    fifo::{self, FifoRecord, SampleSink, FIFO_BATCH_LEN, FIFO_COUNT_ATTEMPTS, RECORD_SIZE},
    identity::DeviceIdentity,
    Error, Ready, MPU6050,
};

impl<I2C> MPU6050<I2C, Ready> {
    pub fn identity(&self) -> &DeviceIdentity {
        &self.state.identity
    }

    /// Register image written during initialization
    pub fn device_config(&self) -> &DeviceConfig {
        &self.state.device_config
    }

    /// Number of configuration writes that failed
    ///
    /// Non-zero means the device may be only partially configured.
    pub fn configuration_faults(&self) -> u8 {
        self.state.configuration_faults
    }

    /// Accelerometer counts per g
    pub fn accel_one_g(&self) -> u16 {
        self.state.identity.accel_one_g()
    }

    /// Gyroscope degrees per second per count
    pub fn gyro_scale(&self) -> f32 {
        1.0 / self.state.device_config.gyro_fsr.lsb_per_dps()
    }
}

impl<I2C> MPU6050<I2C, Ready>
where
    I2C: I2c,
{
    /// Read the latest accelerometer measurement
    ///
    /// Nothing is returned on a bus error, so values a caller kept from an
    /// earlier call stay as they were. A successful read says nothing about
    /// freshness, pair it with the data-ready line or the sample clock.
    pub fn read_accel(&mut self) -> Result<[i16; 3], Error<I2C::Error>> {
        let data = self.ll.registers().accel_xout_h().read()?;
        Ok(fifo::axes_from_be(data.bytes()))
    }

    /// Read the latest gyroscope measurement, see [`Self::read_accel`]
    pub fn read_gyro(&mut self) -> Result<[i16; 3], Error<I2C::Error>> {
        let data = self.ll.registers().gyro_xout_h().read()?;
        Ok(fifo::axes_from_be(data.bytes()))
    }

    pub fn read_fifo_count(&mut self) -> Result<u16, Error<I2C::Error>> {
        let count = self.ll.registers().fifo_counth().read()?;
        Ok(u16::from_be_bytes(count.bytes()))
    }

    /// Reset the FIFO and enable it again, dropping everything queued
    pub fn flush_fifo(&mut self) -> Result<(), Error<I2C::Error>> {
        let mut regs = self.ll.registers();
        regs.user_ctrl().write(|w| w.fifo_reset(1))?;
        regs.user_ctrl().write(|w| w.fifo_en(1))?;
        Ok(())
    }

    /// Read up to `buffer.len()` bytes from the FIFO
    ///
    /// The device pushes records byte by byte, so the count can be caught in
    /// the middle of a record. When the FIFO holds less than the buffer and
    /// the count is not a multiple of `record_size`, the count is read once
    /// more and then taken as is.
    ///
    /// Returns the number of bytes placed at the start of `buffer`. `Ok(0)`
    /// means the FIFO was empty; a failed FIFO read is an error.
    pub fn drain(
        &mut self,
        buffer: &mut [u8],
        record_size: usize,
    ) -> Result<usize, Error<I2C::Error>> {
        let max_len = buffer.len();
        let record_size = record_size.max(1);

        let mut fifo_len = 0;
        for _ in 0..FIFO_COUNT_ATTEMPTS {
            fifo_len = self.read_fifo_count()? as usize;
            if fifo_len >= max_len || fifo_len % record_size == 0 {
                break;
            }
            trace!("FIFO count {=usize} mid record", fifo_len);
        }

        let len = max_len.min(fifo_len);
        if len > 0 {
            self.ll.read_fifo(&mut buffer[..len])?;
        }

        Ok(len)
    }

    /// Drain a batch of records from the FIFO and hand them to `sink`
    ///
    /// Records are delivered in FIFO order, accelerometer first. Returns the
    /// number of records delivered.
    ///
    /// If the batch ends in a partial record the FIFO is flushed and
    /// [`Error::TornFrame`] is returned. Records before the partial one have
    /// already been delivered by then and are not taken back.
    pub fn fetch_samples<S: SampleSink>(
        &mut self,
        sink: &mut S,
    ) -> Result<usize, Error<I2C::Error>> {
        let mut batch = [0u8; FIFO_BATCH_LEN];
        let len = self.drain(&mut batch, RECORD_SIZE)?;

        let mut dispatched = 0;
        for chunk in batch[..len].chunks(RECORD_SIZE) {
            let Some(record) = FifoRecord::from_bytes(chunk) else {
                warn!(
                    "torn FIFO batch, {=usize} of {=usize} bytes left over",
                    chunk.len(),
                    len
                );
                if let Err(_err) = self.flush_fifo() {
                    warn!("FIFO flush failed");
                }
                return Err(Error::TornFrame { dispatched });
            };

            let sample = record.sample();
            sink.on_accel(sample.accel);
            sink.on_gyro(sample.gyro);
            dispatched += 1;
        }

        Ok(dispatched)
    }
}

#[cfg(test)]
mod test {
    extern crate alloc;
    use super::*;
    use crate::config::{Config, DeviceConfig};
    use crate::fifo::Sample;
    use crate::identity::Resolution;
    use alloc::vec;
    use alloc::vec::Vec;

    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const ADDR: u8 = 0x68;

    #[derive(Debug, PartialEq)]
    enum Event {
        Accel([i16; 3]),
        Gyro([i16; 3]),
    }

    #[derive(Default)]
    struct Recorder(Vec<Event>);

    impl SampleSink for Recorder {
        fn on_accel(&mut self, accel: [i16; 3]) {
            self.0.push(Event::Accel(accel));
        }

        fn on_gyro(&mut self, gyro: [i16; 3]) {
            self.0.push(Event::Gyro(gyro));
        }
    }

    fn ready<I2C>(i2c: I2C) -> MPU6050<I2C, Ready> {
        let config = Config::default().with_fifo(true);
        MPU6050 {
            ll: crate::ll::MPU6050::new(i2c, ADDR),
            config,
            state: Ready {
                identity: DeviceIdentity::new(ADDR, 0x68, 2, Resolution::Full),
                device_config: DeviceConfig::from_config(&config),
                configuration_faults: 0,
            },
        }
    }

    fn count(len: u16) -> I2cTransaction {
        I2cTransaction::write_read(ADDR, vec![0x72], len.to_be_bytes().to_vec())
    }

    fn fifo(data: Vec<u8>) -> I2cTransaction {
        I2cTransaction::write_read(ADDR, vec![0x74], data)
    }

    fn flush() -> [I2cTransaction; 2] {
        [
            I2cTransaction::write(ADDR, vec![0x6A, 0x04]),
            I2cTransaction::write(ADDR, vec![0x6A, 0x40]),
        ]
    }

    /// Encode `n` records whose values identify the record and the axis
    fn records(n: usize) -> (Vec<u8>, Vec<Sample>) {
        let mut bytes = Vec::new();
        let mut samples = Vec::new();
        for i in 0..n {
            let base = i as i16 * 100;
            let sample = Sample {
                accel: [base + 1, -(base + 2), base + 3],
                gyro: [-(base + 4), base + 5, i16::MIN + base],
            };
            for v in sample.accel.iter().chain(sample.gyro.iter()) {
                bytes.extend_from_slice(&v.to_be_bytes());
            }
            samples.push(sample);
        }
        (bytes, samples)
    }

    fn events(samples: &[Sample]) -> Vec<Event> {
        samples
            .iter()
            .flat_map(|s| [Event::Accel(s.accel), Event::Gyro(s.gyro)])
            .collect()
    }

    #[test]
    fn test_read_accel_and_gyro() {
        let expectations = [
            I2cTransaction::write_read(
                ADDR,
                vec![0x3B],
                vec![0x10, 0x00, 0xFF, 0xFE, 0x80, 0x00],
            ),
            I2cTransaction::write_read(
                ADDR,
                vec![0x43],
                vec![0x00, 0x01, 0x7F, 0xFF, 0xF0, 0x00],
            ),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        assert_eq!(mpu.read_accel().unwrap(), [4096, -2, i16::MIN]);
        assert_eq!(mpu.read_gyro().unwrap(), [1, i16::MAX, -4096]);

        i2c.done();
    }

    #[test]
    fn test_read_failure_keeps_previous_values() {
        let expectations = [
            I2cTransaction::write_read(ADDR, vec![0x3B], vec![0, 1, 0, 2, 0, 3]),
            I2cTransaction::write_read(ADDR, vec![0x3B], vec![0; 6]).with_error(ErrorKind::Other),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut accel = [0i16; 3];
        if let Ok(v) = mpu.read_accel() {
            accel = v;
        }
        assert_eq!(mpu.read_accel(), Err(Error::Bus(ErrorKind::Other)));
        assert_eq!(accel, [1, 2, 3]);

        i2c.done();
    }

    #[test]
    fn test_read_fifo_count() {
        let expectations = [count(0x01A4)];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        assert_eq!(mpu.read_fifo_count().unwrap(), 420);

        i2c.done();
    }

    #[test]
    fn test_drain_empty() {
        let expectations = [count(0)];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut buffer = [0u8; 96];
        assert_eq!(mpu.drain(&mut buffer, RECORD_SIZE).unwrap(), 0);

        i2c.done();
    }

    #[test]
    fn test_drain_clamps_to_buffer() {
        // More than the buffer holds, also not a record multiple
        let expectations = [count(1000), fifo(vec![0xAA; 24])];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut buffer = [0u8; 24];
        assert_eq!(mpu.drain(&mut buffer, RECORD_SIZE).unwrap(), 24);
        assert_eq!(buffer, [0xAA; 24]);

        i2c.done();
    }

    #[test]
    fn test_drain_never_exceeds_max_len() {
        for reported in [0u16, 1, 11, 12, 13, 35, 36, 37, 96, 97, 1024] {
            let max_len = 36usize;
            let partial = (reported as usize) < max_len && reported as usize % RECORD_SIZE != 0;
            let len = max_len.min(reported as usize);

            let mut expectations = vec![count(reported)];
            if partial {
                expectations.push(count(reported));
            }
            if len > 0 {
                expectations.push(fifo(vec![0; len]));
            }

            let mut i2c = I2cMock::new(&expectations);
            let mut mpu = ready(i2c.clone());

            let mut buffer = [0u8; 36];
            let read = mpu.drain(&mut buffer, RECORD_SIZE).unwrap();
            assert!(read <= max_len);
            assert_eq!(read, len);

            i2c.done();
        }
    }

    #[test]
    fn test_drain_retries_partial_count_once() {
        let expectations = [count(18), count(24), fifo(vec![0x55; 24])];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut buffer = [0u8; 96];
        assert_eq!(mpu.drain(&mut buffer, RECORD_SIZE).unwrap(), 24);

        i2c.done();
    }

    #[test]
    fn test_drain_accepts_second_partial_count() {
        // Two attempts only, the second count is used even if still partial
        let expectations = [count(18), count(19), fifo(vec![0x55; 19])];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut buffer = [0u8; 96];
        assert_eq!(mpu.drain(&mut buffer, RECORD_SIZE).unwrap(), 19);

        i2c.done();
    }

    #[test]
    fn test_drain_read_failure_is_an_error() {
        let expectations = [count(12), fifo(vec![0; 12]).with_error(ErrorKind::Other)];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut buffer = [0u8; 96];
        assert_eq!(
            mpu.drain(&mut buffer, RECORD_SIZE),
            Err(Error::Bus(ErrorKind::Other))
        );

        i2c.done();
    }

    #[test]
    fn test_fetch_whole_records() {
        let (bytes, samples) = records(3);
        let expectations = [count(36), fifo(bytes)];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut sink = Recorder::default();
        assert_eq!(mpu.fetch_samples(&mut sink).unwrap(), 3);
        assert_eq!(sink.0, events(&samples));

        i2c.done();
    }

    #[test]
    fn test_fetch_full_batch() {
        // The FIFO holds more than one batch, the rest stays for the next call
        let (bytes, samples) = records(8);
        let expectations = [count(240), fifo(bytes)];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut sink = Recorder::default();
        assert_eq!(mpu.fetch_samples(&mut sink).unwrap(), 8);
        assert_eq!(sink.0, events(&samples));

        i2c.done();
    }

    #[test]
    fn test_fetch_empty() {
        let expectations = [count(0)];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut sink = Recorder::default();
        assert_eq!(mpu.fetch_samples(&mut sink).unwrap(), 0);
        assert!(sink.0.is_empty());

        i2c.done();
    }

    #[test]
    fn test_fetch_torn_batch() {
        let (mut bytes, samples) = records(3);
        bytes.truncate(2 * RECORD_SIZE + 5);

        let mut expectations = vec![count(29), count(29), fifo(bytes)];
        expectations.extend(flush());
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut sink = Recorder::default();
        assert_eq!(
            mpu.fetch_samples(&mut sink),
            Err(Error::TornFrame { dispatched: 2 })
        );
        // Complete leading records were delivered once, nothing past them
        assert_eq!(sink.0, events(&samples[..2]));

        i2c.done();
    }

    #[test]
    fn test_fetch_torn_single_fragment() {
        let mut expectations = vec![count(7), count(7), fifo(vec![0x01; 7])];
        expectations.extend(flush());
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut sink = Recorder::default();
        assert_eq!(
            mpu.fetch_samples(&mut sink),
            Err(Error::TornFrame { dispatched: 0 })
        );
        assert!(sink.0.is_empty());

        i2c.done();
    }

    #[test]
    fn test_fetch_torn_flush_failure_still_reports_torn() {
        let expectations = [
            count(5),
            count(5),
            fifo(vec![0; 5]),
            I2cTransaction::write(ADDR, vec![0x6A, 0x04]).with_error(ErrorKind::Other),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut sink = Recorder::default();
        assert_eq!(
            mpu.fetch_samples(&mut sink),
            Err(Error::TornFrame { dispatched: 0 })
        );

        i2c.done();
    }

    #[test]
    fn test_fetch_with_closure_sink() {
        let (bytes, samples) = records(2);
        let expectations = [count(24), fifo(bytes)];
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        let mut accel = Vec::new();
        let mut gyro = Vec::new();
        let mut sink = (|a: [i16; 3]| accel.push(a), |g: [i16; 3]| gyro.push(g));
        assert_eq!(mpu.fetch_samples(&mut sink).unwrap(), 2);
        drop(sink);

        assert_eq!(accel, vec![samples[0].accel, samples[1].accel]);
        assert_eq!(gyro, vec![samples[0].gyro, samples[1].gyro]);

        i2c.done();
    }

    #[test]
    fn test_flush_fifo() {
        let expectations = flush();
        let mut i2c = I2cMock::new(&expectations);
        let mut mpu = ready(i2c.clone());

        mpu.flush_fifo().unwrap();

        i2c.done();
    }

    #[test]
    fn test_scales() {
        let i2c = I2cMock::new(&[]);
        let mut done = i2c.clone();
        let mpu = ready(i2c);

        assert_eq!(mpu.accel_one_g(), 4096);
        assert!((mpu.gyro_scale() - 1.0 / 16.4).abs() < 1e-6);
        assert_eq!(mpu.configuration_faults(), 0);

        drop(mpu);
        done.done();
    }

    #[test]
    fn test_shared_bus() {
        use core::cell::RefCell;
        use embedded_hal_bus::i2c::RefCellDevice;

        let expectations = [
            I2cTransaction::write_read(0x68, vec![0x72], vec![0x00, 0x0C]),
            I2cTransaction::write_read(0x69, vec![0x72], vec![0x00, 0x18]),
        ];
        let i2c = I2cMock::new(&expectations);
        let mut done = i2c.clone();
        let bus = RefCell::new(i2c);

        let mut first = ready(RefCellDevice::new(&bus));
        let config = Config::default().with_address(0x69);
        let mut second = MPU6050 {
            ll: crate::ll::MPU6050::new(RefCellDevice::new(&bus), 0x69),
            config,
            state: Ready {
                identity: DeviceIdentity::new(0x69, 0x68, 1, Resolution::Half),
                device_config: DeviceConfig::from_config(&config),
                configuration_faults: 0,
            },
        };

        assert_eq!(first.read_fifo_count().unwrap(), 12);
        assert_eq!(second.read_fifo_count().unwrap(), 24);
        assert_eq!(second.accel_one_g(), 2048);

        done.done();
    }
}
