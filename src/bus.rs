//! The two-wire transport the driver talks through

use embedded_hal::i2c::{Error as _, ErrorKind, I2c, NoAcknowledgeSource};
use heapless::{Deque, Vec};

/// Size of the transmit and receive buffers of [`I2cBus`]
pub const BUFFER_LEN: usize = 32;

/// Transaction-level access to a two-wire bus.
///
/// Writes are framed by [`begin_transmission`](Bus::begin_transmission) and
/// [`end_transmission`](Bus::end_transmission); reads are requested in bulk
/// with [`request_from`](Bus::request_from) and then drained one byte at a
/// time with [`read`](Bus::read).
pub trait Bus {
    /// Start queueing a write to the 7-bit `address`.
    fn begin_transmission(&mut self, address: u8);

    /// Queue one byte of the current write.
    fn write(&mut self, byte: u8);

    /// Finish the current write, returning a status code (0 = success).
    ///
    /// With `stop == false` the bus is held for a following read.
    fn end_transmission(&mut self, stop: bool) -> u8;

    /// Read `len` bytes from `address` into the receive buffer, returning
    /// how many are available.
    fn request_from(&mut self, address: u8, len: usize, stop: bool) -> usize;

    /// Take the next received byte, or `None` if the buffer is empty.
    fn read(&mut self) -> Option<u8>;
}

/// [`Bus`] adapter over a blocking [`I2c`] implementation.
///
/// A write ended without a stop is held back and sent as the write half of
/// a write-read by the next [`request_from`](Bus::request_from) to the same
/// address, so the device sees a repeated start.
pub struct I2cBus<I> {
    i2c: I,
    address: u8,
    tx: Vec<u8, BUFFER_LEN>,
    overflow: bool,
    held: bool,
    rx: Deque<u8, BUFFER_LEN>,
}

impl<I> I2cBus<I>
where
    I: I2c,
{
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            address: 0,
            tx: Vec::new(),
            overflow: false,
            held: false,
            rx: Deque::new(),
        }
    }

    /// Give back the I2C bus
    pub fn release(self) -> I {
        self.i2c
    }
}

/// Translate a bus error into a two-wire status code
fn status_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => 2,
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data) => 3,
        _ => 4,
    }
}

impl<I> Bus for I2cBus<I>
where
    I: I2c,
{
    fn begin_transmission(&mut self, address: u8) {
        self.address = address;
        self.tx.clear();
        self.overflow = false;
        self.held = false;
    }

    fn write(&mut self, byte: u8) {
        if self.tx.push(byte).is_err() {
            self.overflow = true;
        }
    }

    fn end_transmission(&mut self, stop: bool) -> u8 {
        if self.overflow {
            self.tx.clear();
            return 1;
        }
        if !stop {
            self.held = true;
            return 0;
        }

        let status = match self.i2c.write(self.address, &self.tx) {
            Ok(()) => 0,
            Err(e) => status_code(e.kind()),
        };
        self.tx.clear();
        status
    }

    fn request_from(&mut self, address: u8, len: usize, _stop: bool) -> usize {
        self.rx.clear();
        let held = core::mem::replace(&mut self.held, false);
        if len == 0 || len > BUFFER_LEN {
            self.tx.clear();
            return 0;
        }

        let mut buf = [0u8; BUFFER_LEN];
        let buf = &mut buf[..len];
        let result = if held && address == self.address {
            self.i2c.write_read(address, &self.tx, buf)
        } else {
            self.i2c.read(address, buf)
        };
        self.tx.clear();

        match result {
            Ok(()) => {
                for byte in buf.iter() {
                    // `len` is bounded by the capacity
                    let _ = self.rx.push_back(*byte);
                }
                len
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("ads1219: read of {} bytes failed: {}", len, _e.kind());
                0
            }
        }
    }

    fn read(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }
}
