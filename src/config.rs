//! Addressing, command bytes and configuration types for the ADS1219

use embassy_time::Duration;

/// Strap state of one of the `ADDR0`/`ADDR1` pins.
///
/// The ADS1219 samples both address pins at power-up, giving 16 possible
/// addresses between `0x40` and `0x4F`:
///
/// | Pin state | `ADDR1` bits | `ADDR0` bits |
/// | :---      | :---         | :---         |
/// | DGND      | `0b00xx`     | `0bxx00`     |
/// | DVDD      | `0b01xx`     | `0bxx01`     |
/// | SDA       | `0b10xx`     | `0bxx10`     |
/// | SCL       | `0b11xx`     | `0bxx11`     |
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddrPin {
    /// Tied to digital ground
    Dgnd,
    /// Tied to the digital supply
    Dvdd,
    /// Tied to the bus data line
    Sda,
    /// Tied to the bus clock line
    Scl,
}

impl AddrPin {
    const fn bits(self) -> u8 {
        match self {
            AddrPin::Dgnd => 0b00,
            AddrPin::Dvdd => 0b01,
            AddrPin::Sda => 0b10,
            AddrPin::Scl => 0b11,
        }
    }
}

/// The 7-bit bus address of a device, derived from its pin straps.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(u8);

impl Address {
    /// Address of a device with `ADDR1` and `ADDR0` strapped as given.
    pub const fn new(addr1: AddrPin, addr0: AddrPin) -> Self {
        Self(0b100_1111 & (0b100_0000 | (addr1.bits() << 2) | addr0.bits()))
    }

    /// Convert into the right-aligned 7-bit address
    pub const fn into_addr(&self) -> u8 {
        self.0
    }
}

impl Default for Address {
    /// Both pins tied to ground, `0x40`
    fn default() -> Self {
        Self::new(AddrPin::Dgnd, AddrPin::Dgnd)
    }
}

/// Single-byte commands understood by the device.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Reset to power-on state, equivalent to toggling the reset pin
    Reset = 0b0000_0110,
    /// Start a single-shot conversion, or (re)start continuous conversion
    StartSync = 0b0000_1000,
    /// Shut down the analog circuitry; configuration is kept
    PowerDown = 0b0000_0010,
    /// Latch the most recent conversion result for reading
    ReadData = 0b0001_0000,
    /// Write the configuration register; followed by the register byte
    WriteRegister = 0b0100_0000,
}

/// Read-register commands, one per readable register.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    Config = 0b0010_0000,
    Status = 0b0010_0100,
}

/// Input multiplexer, `CONFIG[7:5]`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mux {
    /// AINP = AIN0, AINN = AIN1 (default)
    Ain0Ain1 = 0b0000_0000,
    /// AINP = AIN2, AINN = AIN3
    Ain2Ain3 = 0b0010_0000,
    /// AINP = AIN1, AINN = AIN2
    Ain1Ain2 = 0b0100_0000,
    /// AINP = AIN0, AINN = AGND
    Ain0 = 0b0110_0000,
    /// AINP = AIN1, AINN = AGND
    Ain1 = 0b1000_0000,
    /// AINP = AIN2, AINN = AGND
    Ain2 = 0b1010_0000,
    /// AINP = AIN3, AINN = AGND
    Ain3 = 0b1100_0000,
    /// Both inputs shorted to AVDD / 2
    HalfAvdd = 0b1110_0000,
}

impl Mux {
    pub const MASK: u8 = 0b1110_0000;

    fn from_byte(value: u8) -> Self {
        match value & Self::MASK {
            0b0000_0000 => Mux::Ain0Ain1,
            0b0010_0000 => Mux::Ain2Ain3,
            0b0100_0000 => Mux::Ain1Ain2,
            0b0110_0000 => Mux::Ain0,
            0b1000_0000 => Mux::Ain1,
            0b1010_0000 => Mux::Ain2,
            0b1100_0000 => Mux::Ain3,
            0b1110_0000 => Mux::HalfAvdd,
            _ => unreachable!(),
        }
    }
}

/// PGA gain, `CONFIG[4]`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Gain {
    X1 = 0b0000_0000,
    X4 = 0b0001_0000,
}

impl Gain {
    pub const MASK: u8 = 0b0001_0000;

    fn from_byte(value: u8) -> Self {
        if (value & Self::MASK) == 0 {
            Gain::X1
        } else {
            Gain::X4
        }
    }
}

/// Data rate, `CONFIG[3:2]`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataRate {
    /// 20 samples per second - every 50ms
    Sps20 = 0b0000_0000,
    /// 90 samples per second - every 11.1ms
    Sps90 = 0b0000_0100,
    /// 330 samples per second - every 3.0ms
    Sps330 = 0b0000_1000,
    /// 1000 samples per second - every 1ms
    Sps1000 = 0b0000_1100,
}

impl DataRate {
    pub const MASK: u8 = 0b0000_1100;

    /// Get the nominal interval between samples as a [`Duration`].
    pub fn interval(&self) -> Duration {
        match self {
            DataRate::Sps20 => Duration::from_micros(50_000),
            DataRate::Sps90 => Duration::from_micros(11_111),
            DataRate::Sps330 => Duration::from_micros(3_030),
            DataRate::Sps1000 => Duration::from_micros(1_000),
        }
    }

    fn from_byte(value: u8) -> Self {
        match value & Self::MASK {
            0b0000_0000 => DataRate::Sps20,
            0b0000_0100 => DataRate::Sps90,
            0b0000_1000 => DataRate::Sps330,
            0b0000_1100 => DataRate::Sps1000,
            _ => unreachable!(),
        }
    }
}

/// Conversion mode, `CONFIG[1]`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConversionMode {
    /// One conversion per START/SYNC command
    SingleShot = 0b0000_0000,
    /// Convert continuously after START/SYNC
    Continuous = 0b0000_0010,
}

impl ConversionMode {
    pub const MASK: u8 = 0b0000_0010;

    fn from_byte(value: u8) -> Self {
        if (value & Self::MASK) == 0 {
            ConversionMode::SingleShot
        } else {
            ConversionMode::Continuous
        }
    }
}

/// Voltage reference, `CONFIG[0]`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum VoltageReference {
    /// Internal 2.048V reference
    Internal = 0b0000_0000,
    /// External reference on REFP/REFN
    External = 0b0000_0001,
}

impl VoltageReference {
    pub const MASK: u8 = 0b0000_0001;

    fn from_byte(value: u8) -> Self {
        if (value & Self::MASK) == 0 {
            VoltageReference::Internal
        } else {
            VoltageReference::External
        }
    }
}

// Field masks must partition the register.
const _: () = {
    let masks = [
        Mux::MASK,
        Gain::MASK,
        DataRate::MASK,
        ConversionMode::MASK,
        VoltageReference::MASK,
    ];
    let mut seen = 0u8;
    let mut i = 0;
    while i < masks.len() {
        assert!(seen & masks[i] == 0);
        seen |= masks[i];
        i += 1;
    }
    assert!(seen == 0xFF);
};

/// A value for one configuration field.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Setting {
    Mux(Mux),
    Gain(Gain),
    DataRate(DataRate),
    Mode(ConversionMode),
    Vref(VoltageReference),
}

impl Setting {
    /// The bits of the configuration byte owned by this setting's field
    pub const fn mask(&self) -> u8 {
        match self {
            Setting::Mux(_) => Mux::MASK,
            Setting::Gain(_) => Gain::MASK,
            Setting::DataRate(_) => DataRate::MASK,
            Setting::Mode(_) => ConversionMode::MASK,
            Setting::Vref(_) => VoltageReference::MASK,
        }
    }

    /// The field value, positioned within the configuration byte
    pub const fn bits(&self) -> u8 {
        let bits = match self {
            Setting::Mux(v) => *v as u8,
            Setting::Gain(v) => *v as u8,
            Setting::DataRate(v) => *v as u8,
            Setting::Mode(v) => *v as u8,
            Setting::Vref(v) => *v as u8,
        };
        bits & self.mask()
    }
}

impl From<Mux> for Setting {
    fn from(value: Mux) -> Self {
        Setting::Mux(value)
    }
}

impl From<Gain> for Setting {
    fn from(value: Gain) -> Self {
        Setting::Gain(value)
    }
}

impl From<DataRate> for Setting {
    fn from(value: DataRate) -> Self {
        Setting::DataRate(value)
    }
}

impl From<ConversionMode> for Setting {
    fn from(value: ConversionMode) -> Self {
        Setting::Mode(value)
    }
}

impl From<VoltageReference> for Setting {
    fn from(value: VoltageReference) -> Self {
        Setting::Vref(value)
    }
}

/// The configuration register.
///
/// On boot or reset the register is all zeros, which is what
/// [`Config::default`] gives you.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config(u8);

impl Config {
    /// Apply `settings` to the power-on configuration.
    ///
    /// If a field is given more than once, only the first value is used.
    pub fn new(settings: &[Setting]) -> Self {
        Self::default().apply(settings)
    }

    /// Wrap a raw register byte, e.g. one read back from the device.
    pub const fn from_bits(byte: u8) -> Self {
        Self(byte)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Apply `settings` on top of this configuration.
    ///
    /// Fields not mentioned keep their current bits. If a field is given
    /// more than once, only the first value is used.
    pub fn apply(self, settings: &[Setting]) -> Self {
        let mut claimed = 0u8;
        let mut byte = self.0;
        for setting in settings {
            let mask = setting.mask();
            if claimed & mask != 0 {
                continue;
            }
            byte = (byte & !mask) | setting.bits();
            claimed |= mask;
        }
        Self(byte)
    }

    pub fn mux(&self) -> Mux {
        Mux::from_byte(self.0)
    }

    pub fn gain(&self) -> Gain {
        Gain::from_byte(self.0)
    }

    pub fn data_rate(&self) -> DataRate {
        DataRate::from_byte(self.0)
    }

    pub fn mode(&self) -> ConversionMode {
        ConversionMode::from_byte(self.0)
    }

    pub fn vref(&self) -> VoltageReference {
        VoltageReference::from_byte(self.0)
    }
}
