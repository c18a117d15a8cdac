//! `ads1219`
//!
//! A blocking driver for the ADS1219 24-bit delta-sigma ADC from TI.
//!
//! The driver talks to the device through the [`Bus`] trait. Use [`I2cBus`]
//! to drive it from any blocking `embedded-hal` I2C implementation:
//!
//! ```
//! # use embedded_hal_mock::eh1::i2c::{Mock, Transaction};
//! use ads1219::{Ads1219, I2cBus};
//! use ads1219::config::{Address, AddrPin, ConversionMode, DataRate};
//!
//! # let i2c = Mock::new(&[
//! #     Transaction::write(0x40, vec![0x40, 0x0E]),
//! #     Transaction::write(0x40, vec![0x08]),
//! #     Transaction::write_read(0x40, vec![0x10], vec![0x40, 0x00, 0x00]),
//! # ]);
//! let mut adc = Ads1219::new(I2cBus::new(i2c), Address::new(AddrPin::Dgnd, AddrPin::Dgnd));
//! adc.set_config(&[DataRate::Sps1000.into(), ConversionMode::Continuous.into()])?;
//! adc.start_conversion()?;
//! let volts = adc.read_normalized()? * 2.048;
//! # assert!(volts > 1.0);
//! # adc.release().release().done();
//! # Ok::<(), ads1219::Error>(())
//! ```

#![cfg_attr(not(test), no_std)]

use config::{Address, Command, Config, Register, Setting};
use embedded_hal::digital::PinState;

pub mod bus;
pub mod config;

pub use bus::{Bus, I2cBus};

/// Largest positive conversion result
pub const MAX_CODE: i32 = 0x7F_FFFF;

/// Driver error type
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Ending a write transaction failed with the given bus status
    Transmission(u8),
    /// A read request returned no data
    NoData,
    /// The receive buffer ran dry while reading expected data
    ReadFailed,
}

impl Error {
    /// The numeric error code, as kept in [`Ads1219::last_error`]
    pub fn code(&self) -> u8 {
        match self {
            Error::Transmission(status) => *status,
            Error::NoData => 5,
            Error::ReadFailed => 6,
        }
    }
}

/// Blocking driver for the ADS1219 ADC
pub struct Ads1219<B> {
    addr: u8,
    bus: B,
    config: Config,
    error: u8,
}

impl<B> Ads1219<B>
where
    B: Bus,
{
    /// Create a new [Ads1219] at the given [Address] on `bus`.
    ///
    /// No bus traffic happens here; the cached configuration starts out as
    /// the power-on default.
    pub fn new(bus: B, addr: Address) -> Self {
        Self {
            addr: addr.into_addr(),
            bus,
            config: Config::default(),
            error: 0,
        }
    }

    /// The 7-bit bus address in use
    pub fn address(&self) -> u8 {
        self.addr
    }

    /// The configuration most recently written to or read from the device
    pub fn config(&self) -> Config {
        self.config
    }

    /// Code of the most recent bus operation, 0 if it succeeded.
    ///
    /// See [`Error::code`].
    pub fn last_error(&self) -> u8 {
        self.error
    }

    /// Send a command to the device. Normally this is not used directly.
    pub fn command(&mut self, cmd: Command) -> Result<(), Error> {
        self.transmit(&[cmd as u8], true)
    }

    /// Reset the device; equivalent to toggling the reset pin or power cycling.
    ///
    /// The device's configuration returns to all zeros, but the cached
    /// configuration is left alone.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.command(Command::Reset)
    }

    /// Start a single-shot conversion, or continuous conversion, depending
    /// on the conversion mode. Any ongoing conversion is restarted.
    pub fn start_conversion(&mut self) -> Result<(), Error> {
        self.command(Command::StartSync)
    }

    /// Same as [`start_conversion`](Self::start_conversion); use it when
    /// the intent is to restart an ongoing conversion.
    pub fn sync_conversion(&mut self) -> Result<(), Error> {
        self.command(Command::StartSync)
    }

    /// Shut down the analog circuitry.
    ///
    /// The device keeps its configuration and still answers commands.
    /// Send START/SYNC to resume converting.
    pub fn powerdown(&mut self) -> Result<(), Error> {
        self.command(Command::PowerDown)
    }

    /// Read one of the registers. Normally this is not used directly.
    pub fn read_register(&mut self, reg: Register) -> Result<u8, Error> {
        self.transmit(&[reg as u8], false)?;
        self.request(1)?;
        self.read_byte()
    }

    /// Read the configuration register, refreshing the cached configuration.
    pub fn read_config(&mut self) -> Result<Config, Error> {
        let config = Config::from_bits(self.read_register(Register::Config)?);
        self.config = config;
        Ok(config)
    }

    /// Check the status register for a new conversion result.
    ///
    /// A bus failure is an `Err`, never `Ok(false)`.
    pub fn data_ready(&mut self) -> Result<bool, Error> {
        Ok(self.read_register(Register::Status)? != 0)
    }

    /// Interpret a sample of this device's active-low DRDY pin.
    ///
    /// The caller is responsible for the reading actually coming from the
    /// right pin.
    pub fn data_ready_pin(&self, level: PinState) -> bool {
        level == PinState::Low
    }

    /// Latch and read the most recent conversion result.
    ///
    /// The result is sign extended from 24 bits.
    pub fn read_raw(&mut self) -> Result<i32, Error> {
        self.transmit(&[Command::ReadData as u8], false)?;
        self.request(3)?;

        let mut raw = 0u32;
        for _ in 0..3 {
            raw = (raw << 8) | u32::from(self.read_byte()?);
        }
        Ok(sign_extend(raw))
    }

    /// See [`normalize`]
    pub fn normalize(&self, raw: i32) -> f32 {
        normalize(raw)
    }

    /// [`read_raw`](Self::read_raw) followed by [`normalize`](Self::normalize)
    pub fn read_normalized(&mut self) -> Result<f32, Error> {
        let raw = self.read_raw()?;
        Ok(normalize(raw))
    }

    /// Write `config` to the device, updating the cached configuration if
    /// the write succeeded.
    pub fn write_config(&mut self, config: Config) -> Result<(), Error> {
        self.transmit(&[Command::WriteRegister as u8, config.bits()], true)?;

        // If we succeeded, update values
        self.config = config;
        Ok(())
    }

    /// Apply `settings` to the power-on configuration and write it.
    ///
    /// If a field is given more than once, only the first value is used.
    pub fn set_config(&mut self, settings: &[Setting]) -> Result<(), Error> {
        self.write_config(Config::new(settings))
    }

    /// Apply `settings` to the cached configuration and write it.
    ///
    /// If a field is given more than once, only the first value is used.
    pub fn modify_config(&mut self, settings: &[Setting]) -> Result<(), Error> {
        self.write_config(self.config.apply(settings))
    }

    /// Give back the bus
    pub fn release(self) -> B {
        self.bus
    }

    fn transmit(&mut self, bytes: &[u8], stop: bool) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("ads1219 {=u8:#x}: write {=[u8]:#x}", self.addr, bytes);

        self.bus.begin_transmission(self.addr);
        for byte in bytes {
            self.bus.write(*byte);
        }
        match self.bus.end_transmission(stop) {
            0 => self.result(Ok(())),
            status => self.result(Err(Error::Transmission(status))),
        }
    }

    fn request(&mut self, len: usize) -> Result<(), Error> {
        if self.bus.request_from(self.addr, len, true) == 0 {
            return self.result(Err(Error::NoData));
        }
        self.result(Ok(()))
    }

    fn read_byte(&mut self) -> Result<u8, Error> {
        match self.bus.read() {
            Some(byte) => self.result(Ok(byte)),
            None => self.result(Err(Error::ReadFailed)),
        }
    }

    /// Record the outcome of a bus step in the error code
    fn result<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        match &result {
            Ok(_) => self.error = 0,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("ads1219 {=u8:#x}: {}", self.addr, e);
                self.error = e.code();
            }
        }
        result
    }
}

/// Scale a raw result to roughly `[-1, 1]`.
///
/// Full scale negative (`-0x80_0000`) comes out just below -1, as the
/// divisor is the positive full scale.
pub fn normalize(raw: i32) -> f32 {
    raw as f32 / MAX_CODE as f32
}

/// Sign extend a 24-bit two's complement value
fn sign_extend(raw: u32) -> i32 {
    if raw > MAX_CODE as u32 {
        (raw | 0xFF00_0000) as i32
    } else {
        raw as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AddrPin, ConversionMode, DataRate, Gain, Mux, VoltageReference};
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::collections::VecDeque;

    /// One scripted response for [`SimBus`]
    enum Step {
        /// Status returned by the next `end_transmission`
        End(u8),
        /// Bytes made available by the next `request_from`, and how many
        /// of them it claims are there
        Request(Vec<u8>, usize),
    }

    /// A bus that plays back scripted responses and records what was sent
    #[derive(Default)]
    struct SimBus {
        script: VecDeque<Step>,
        writes: Vec<(Vec<u8>, bool)>,
        current: Vec<u8>,
        rx: VecDeque<u8>,
    }

    impl SimBus {
        fn new(script: Vec<Step>) -> Self {
            Self {
                script: script.into(),
                ..Default::default()
            }
        }
    }

    impl Bus for SimBus {
        fn begin_transmission(&mut self, _address: u8) {
            self.current.clear();
        }

        fn write(&mut self, byte: u8) {
            self.current.push(byte);
        }

        fn end_transmission(&mut self, stop: bool) -> u8 {
            let Some(Step::End(status)) = self.script.pop_front() else {
                panic!("unexpected end_transmission");
            };
            self.writes.push((core::mem::take(&mut self.current), stop));
            status
        }

        fn request_from(&mut self, _address: u8, _len: usize, _stop: bool) -> usize {
            let Some(Step::Request(bytes, available)) = self.script.pop_front() else {
                panic!("unexpected request_from");
            };
            self.rx = bytes.into();
            available
        }

        fn read(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }
    }

    fn sim(script: Vec<Step>) -> Ads1219<SimBus> {
        Ads1219::new(SimBus::new(script), Address::default())
    }

    fn mock(expectations: &[I2cTransaction]) -> Ads1219<I2cBus<I2cMock>> {
        Ads1219::new(
            I2cBus::new(I2cMock::new(expectations)),
            Address::new(AddrPin::Dvdd, AddrPin::Sda),
        )
    }

    #[test]
    fn commands_are_single_bytes() {
        let expectations = [
            I2cTransaction::write(0x46, vec![0x06]),
            I2cTransaction::write(0x46, vec![0x08]),
            I2cTransaction::write(0x46, vec![0x08]),
            I2cTransaction::write(0x46, vec![0x02]),
        ];
        let mut adc = mock(&expectations);

        adc.reset().unwrap();
        adc.start_conversion().unwrap();
        adc.sync_conversion().unwrap();
        adc.powerdown().unwrap();
        assert_eq!(adc.last_error(), 0);

        adc.release().release().done();
    }

    #[test]
    fn command_failure_sets_error() {
        let mut adc = sim(vec![Step::End(2)]);

        assert_eq!(adc.reset(), Err(Error::Transmission(2)));
        assert_eq!(adc.last_error(), 2);
    }

    #[test]
    fn read_register_uses_repeated_start() {
        let expectations = [
            I2cTransaction::write_read(0x46, vec![0x20], vec![0x6A]),
            I2cTransaction::write_read(0x46, vec![0x24], vec![0x80]),
            I2cTransaction::write_read(0x46, vec![0x24], vec![0x00]),
        ];
        let mut adc = mock(&expectations);

        let config = adc.read_config().unwrap();
        assert_eq!(config.bits(), 0x6A);
        assert_eq!(adc.config(), config);
        assert_eq!(adc.data_ready(), Ok(true));
        assert_eq!(adc.data_ready(), Ok(false));

        adc.release().release().done();
    }

    #[test]
    fn read_register_errors() {
        let mut adc = sim(vec![Step::End(3)]);
        assert_eq!(adc.read_register(Register::Config), Err(Error::Transmission(3)));
        assert_eq!(adc.last_error(), 3);

        let mut adc = sim(vec![Step::End(0), Step::Request(vec![], 0)]);
        assert_eq!(adc.read_register(Register::Config), Err(Error::NoData));
        assert_eq!(adc.last_error(), 5);

        let mut adc = sim(vec![Step::End(0), Step::Request(vec![], 1)]);
        assert_eq!(adc.read_register(Register::Config), Err(Error::ReadFailed));
        assert_eq!(adc.last_error(), 6);
    }

    #[test]
    fn failed_status_read_is_not_not_ready() {
        let mut adc = sim(vec![Step::End(0), Step::Request(vec![], 0)]);
        assert_eq!(adc.data_ready(), Err(Error::NoData));
    }

    #[test]
    fn failed_config_read_keeps_cache() {
        let mut adc = sim(vec![
            Step::End(0),
            Step::End(0),
            Step::Request(vec![], 1),
        ]);
        adc.set_config(&[Gain::X4.into()]).unwrap();
        assert_eq!(adc.read_config(), Err(Error::ReadFailed));
        assert_eq!(adc.config().gain(), Gain::X4);
    }

    #[test]
    fn drdy_pin_is_active_low() {
        let adc = sim(vec![]);
        assert!(adc.data_ready_pin(PinState::Low));
        assert!(!adc.data_ready_pin(PinState::High));
    }

    #[test]
    fn read_raw_sign_extends() {
        let expectations = [
            I2cTransaction::write_read(0x46, vec![0x10], vec![0x7F, 0xFF, 0xFF]),
            I2cTransaction::write_read(0x46, vec![0x10], vec![0x80, 0x00, 0x00]),
            I2cTransaction::write_read(0x46, vec![0x10], vec![0xFF, 0xFF, 0xFF]),
            I2cTransaction::write_read(0x46, vec![0x10], vec![0x01, 0x02, 0x03]),
        ];
        let mut adc = mock(&expectations);

        assert_eq!(adc.read_raw(), Ok(0x7F_FFFF));
        assert_eq!(adc.read_raw(), Ok(0x80_0000 - 0x100_0000));
        assert_eq!(adc.read_raw(), Ok(-1));
        assert_eq!(adc.read_raw(), Ok(0x01_0203));

        adc.release().release().done();
    }

    #[test]
    fn read_raw_without_data() {
        let mut adc = sim(vec![Step::End(0), Step::Request(vec![], 0)]);
        assert_eq!(adc.read_raw(), Err(Error::NoData));
        assert_eq!(adc.last_error(), 5);
    }

    #[test]
    fn read_raw_runs_dry_mid_sequence() {
        let mut adc = sim(vec![Step::End(0), Step::Request(vec![0x12, 0x34], 3)]);
        assert_eq!(adc.read_raw(), Err(Error::ReadFailed));
        assert_eq!(adc.last_error(), 6);
    }

    #[test]
    fn error_is_cleared_by_next_success() {
        let mut adc = sim(vec![Step::End(4), Step::End(0)]);
        assert!(adc.powerdown().is_err());
        assert_eq!(adc.last_error(), 4);
        adc.start_conversion().unwrap();
        assert_eq!(adc.last_error(), 0);
    }

    #[test]
    fn normalize_keeps_asymmetry() {
        assert_eq!(normalize(0), 0.0);
        assert!((normalize(0x7F_FFFF) - 1.0).abs() < 1e-6);
        assert_eq!(sim(vec![]).normalize(0x40_0000), normalize(0x40_0000));
        let low = normalize(-0x80_0000);
        assert_eq!(low, -8_388_608.0f32 / 8_388_607.0f32);
        assert!(low <= -1.0);
    }

    #[test]
    fn read_normalized_full_scale() {
        let expectations = [I2cTransaction::write_read(0x46, vec![0x10], vec![0x7F, 0xFF, 0xFF])];
        let mut adc = mock(&expectations);

        let value = adc.read_normalized().unwrap();
        assert!((value - 1.0).abs() < 1e-6);

        adc.release().release().done();
    }

    #[test]
    fn write_config_sends_register_byte() {
        let expectations = [I2cTransaction::write(0x46, vec![0x40, 0b0110_1110])];
        let mut adc = mock(&expectations);

        adc.set_config(&[
            Mux::Ain0.into(),
            DataRate::Sps1000.into(),
            ConversionMode::Continuous.into(),
        ])
        .unwrap();
        assert_eq!(adc.config().bits(), 0b0110_1110);

        adc.release().release().done();
    }

    #[test]
    fn write_config_failure_keeps_cache() {
        let mut adc = sim(vec![Step::End(0), Step::End(2)]);
        adc.set_config(&[Mux::Ain3.into()]).unwrap();

        let result = adc.write_config(Config::from_bits(0xFF));
        assert_eq!(result, Err(Error::Transmission(2)));
        assert_eq!(adc.last_error(), 2);
        assert_eq!(adc.config().mux(), Mux::Ain3);
        assert_eq!(adc.config().bits(), 0b1100_0000);

        let bus = adc.release();
        assert_eq!(bus.writes[1], (vec![0x40, 0xFF], true));
    }

    #[test]
    fn modify_config_preserves_other_fields() {
        let expectations = [
            I2cTransaction::write(0x46, vec![0x40, 0b1010_1011]),
            I2cTransaction::write(0x46, vec![0x40, 0b1011_1011]),
        ];
        let mut adc = mock(&expectations);

        adc.set_config(&[
            Mux::Ain2.into(),
            DataRate::Sps330.into(),
            ConversionMode::Continuous.into(),
            VoltageReference::External.into(),
        ])
        .unwrap();
        adc.modify_config(&[Gain::X4.into()]).unwrap();

        let config = adc.config();
        assert_eq!(config.gain(), Gain::X4);
        assert_eq!(config.mux(), Mux::Ain2);
        assert_eq!(config.data_rate(), DataRate::Sps330);
        assert_eq!(config.mode(), ConversionMode::Continuous);
        assert_eq!(config.vref(), VoltageReference::External);

        adc.release().release().done();
    }

    #[test]
    fn set_config_starts_from_default() {
        let expectations = [
            I2cTransaction::write(0x46, vec![0x40, 0b0001_0000]),
            I2cTransaction::write(0x46, vec![0x40, 0b0000_0001]),
        ];
        let mut adc = mock(&expectations);

        adc.set_config(&[Gain::X4.into(), Gain::X1.into()]).unwrap();
        adc.set_config(&[VoltageReference::External.into()]).unwrap();

        adc.release().release().done();
    }

    #[test]
    fn i2c_nack_surfaces_as_transmission_error() {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

        let expectations = [I2cTransaction::write(0x46, vec![0x40, 0x10])
            .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data))];
        let mut adc = mock(&expectations);

        assert_eq!(adc.modify_config(&[Gain::X4.into()]), Err(Error::Transmission(3)));
        assert_eq!(adc.config(), Config::default());

        adc.release().release().done();
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0), 0);
        assert_eq!(sign_extend(0x7F_FFFF), 0x7F_FFFF);
        assert_eq!(sign_extend(0x80_0000), -0x80_0000);
        assert_eq!(sign_extend(0xFF_FFFE), -2);
    }
}
