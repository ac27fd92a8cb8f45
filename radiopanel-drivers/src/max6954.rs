//! MAX6954 LED display driver with key scanner
//!
//! The MAX6954 drives up to 16 multiplexed 7-segment digits and scans a
//! small key matrix, raising an IRQ output on debounced key presses.
//!
//! # SPI Protocol
//!
//! Every transaction is one 16-bit word, most significant bit first:
//! ```text
//!  15   14        8 7          0
//! ┌───┬───────────┬────────────┐
//! │ R │ register  │    data    │
//! └───┴───────────┴────────────┘
//! ```
//!
//! Reads are pipelined: the chip shifts out the answer to a read request
//! during the *following* transaction, so every read here is the request
//! followed by a no-op read that collects the result.

use radiopanel_core::config::DisplaySetup;
use radiopanel_core::traits::DisplayKeypad;
use radiopanel_hal::{KeyInterrupt, SpiTransactor};

/// MAX6954 register addresses
pub mod reg {
    /// No operation; used to clock out read results
    pub const NO_OP: u8 = 0x00;
    /// Per-digit hexadecimal font decoding
    pub const DECODE_MODE: u8 = 0x01;
    /// Brightness of all digits
    pub const GLOBAL_INTENSITY: u8 = 0x02;
    /// Number of scanned digit pairs
    pub const SCAN_LIMIT: u8 = 0x03;
    pub const CONFIGURATION: u8 = 0x04;
    /// Port and key-scan configuration
    pub const PORT_CONFIGURATION: u8 = 0x06;
    /// Display test (all segments lit)
    pub const DISPLAY_TEST: u8 = 0x07;
    /// Key mask on write, debounced key state on read (banks A-D)
    pub const KEY_MASK_DEBOUNCED: u8 = 0x08;
    /// Digit type on write, pressed key state on read (banks A-D)
    pub const DIGIT_TYPE_KEY_PRESSED: u8 = 0x0C;
    /// First digit register, plane P0
    pub const DIGIT_0: u8 = 0x20;
}

const READ_BIT: u16 = 1 << 15;
const REGISTER_MASK: u8 = 0x7F;

/// Decimal point segment in a digit register
pub const DECIMAL_POINT: u8 = 0x80;

/// One SPI transaction image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    pub read: bool,
    /// 7-bit register address
    pub register: u8,
    pub data: u8,
}

impl Message {
    pub const fn write(register: u8, data: u8) -> Self {
        Self {
            read: false,
            register,
            data,
        }
    }

    pub const fn read(register: u8) -> Self {
        Self {
            read: true,
            register,
            data: 0,
        }
    }

    pub const fn encode(self) -> u16 {
        let read = if self.read { READ_BIT } else { 0 };
        read | ((self.register & REGISTER_MASK) as u16) << 8 | self.data as u16
    }

    pub const fn decode(word: u16) -> Self {
        Self {
            read: word & READ_BIT != 0,
            register: (word >> 8) as u8 & REGISTER_MASK,
            data: word as u8,
        }
    }
}

/// Parsed configuration register
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Configuration {
    /// Normal operation (clear for shutdown)
    pub shutdown_off: bool,
    /// Blink at twice the slow rate
    pub blink_fast: bool,
    pub blink_enable: bool,
    /// Restart the blink timing on write
    pub blink_sync: bool,
    /// Clear all digit data on write
    pub clear_digits: bool,
    /// Per-digit intensity instead of the global one
    pub intensity_local: bool,
    /// Current blink phase; read only
    pub blink_phase: bool,
}

impl Configuration {
    /// Normal operation, everything else off
    pub const RUN: Self = Self {
        shutdown_off: true,
        blink_fast: false,
        blink_enable: false,
        blink_sync: false,
        clear_digits: false,
        intensity_local: false,
        blink_phase: false,
    };

    pub const fn from_bits(bits: u8) -> Self {
        Self {
            shutdown_off: bits & (1 << 0) != 0,
            blink_fast: bits & (1 << 2) != 0,
            blink_enable: bits & (1 << 3) != 0,
            blink_sync: bits & (1 << 4) != 0,
            clear_digits: bits & (1 << 5) != 0,
            intensity_local: bits & (1 << 6) != 0,
            blink_phase: bits & (1 << 7) != 0,
        }
    }

    pub const fn bits(self) -> u8 {
        // bit 1 is unused
        (self.shutdown_off as u8)
            | (self.blink_fast as u8) << 2
            | (self.blink_enable as u8) << 3
            | (self.blink_sync as u8) << 4
            | (self.clear_digits as u8) << 5
            | (self.intensity_local as u8) << 6
            | (self.blink_phase as u8) << 7
    }
}

/// MAX6954 on a blocking SPI transactor, with its IRQ line
pub struct Max6954<S, K> {
    spi: S,
    irq: K,
}

impl<S: SpiTransactor, K: KeyInterrupt> Max6954<S, K> {
    pub fn new(spi: S, irq: K) -> Self {
        Self { spi, irq }
    }

    /// Release the bus and IRQ line
    pub fn release(self) -> (S, K) {
        (self.spi, self.irq)
    }

    fn write(&mut self, register: u8, data: u8) {
        let _ = self.spi.transact(Message::write(register, data).encode());
    }

    fn read(&mut self, register: u8) -> u8 {
        let _ = self.spi.transact(Message::read(register).encode());
        let reply = self.spi.transact(Message::read(reg::NO_OP).encode());
        Message::decode(reply).data
    }

    pub fn set_decode_mode(&mut self, mode: u8) {
        self.write(reg::DECODE_MODE, mode);
    }

    pub fn set_global_intensity(&mut self, intensity: u8) {
        self.write(reg::GLOBAL_INTENSITY, intensity);
    }

    pub fn set_scan_limit(&mut self, limit: u8) {
        self.write(reg::SCAN_LIMIT, limit);
    }

    pub fn write_configuration(&mut self, configuration: Configuration) {
        self.write(reg::CONFIGURATION, configuration.bits());
    }

    pub fn read_configuration(&mut self) -> Configuration {
        Configuration::from_bits(self.read(reg::CONFIGURATION))
    }

    pub fn set_port_configuration(&mut self, configuration: u8) {
        self.write(reg::PORT_CONFIGURATION, configuration);
    }

    /// Select the keys of `bank` that raise the IRQ output
    pub fn set_key_mask(&mut self, bank: u8, mask: u8) {
        self.write(reg::KEY_MASK_DEBOUNCED + bank, mask);
    }

    /// Debounced keys of `bank`; releases the IRQ output
    pub fn debounced_key(&mut self, bank: u8) -> u8 {
        self.read(reg::KEY_MASK_DEBOUNCED + bank)
    }

    pub fn set_digit_type(&mut self, digit_type: u8) {
        self.write(reg::DIGIT_TYPE_KEY_PRESSED, digit_type);
    }

    /// Keys of `bank` held down right now
    ///
    /// The IRQ only fires on presses, so a held modifier key has to be
    /// polled here.
    pub fn key_pressed(&mut self, bank: u8) -> u8 {
        self.read(reg::DIGIT_TYPE_KEY_PRESSED + bank)
    }

    /// Write a raw digit register
    ///
    /// With hexadecimal decoding the low bits select the character and
    /// bit 7 lights the decimal point.
    pub fn write_digit_raw(&mut self, digit: u8, value: u8) {
        self.write(reg::DIGIT_0 + digit, value);
    }

    pub fn read_digit(&mut self, digit: u8) -> u8 {
        self.read(reg::DIGIT_0 + digit)
    }

    pub fn set_display_test(&mut self, enabled: bool) {
        self.write(reg::DISPLAY_TEST, enabled as u8);
    }
}

impl<S: SpiTransactor, K: KeyInterrupt> DisplayKeypad for Max6954<S, K> {
    fn configure(&mut self, setup: &DisplaySetup) {
        self.set_scan_limit(setup.scan_limit);
        self.set_global_intensity(setup.intensity);
        self.set_digit_type(setup.digit_type);
        self.set_decode_mode(setup.decode_mode);
        self.write_configuration(Configuration::RUN);
        self.set_port_configuration(setup.port_config);
        self.set_key_mask(0, setup.key_mask);

        // release an IRQ left over from before reset
        let _ = self.debounced_key(0);
        let _ = self.irq.take_key_event();
    }

    fn write_digit(&mut self, position: u8, digit: u8, decimal_point: bool) {
        let value = (digit & 0x3F) | if decimal_point { DECIMAL_POINT } else { 0 };
        self.write_digit_raw(position, value);
    }

    fn debounced_keys(&mut self) -> u8 {
        self.debounced_key(0)
    }

    fn pressed_keys(&mut self) -> u8 {
        self.key_pressed(0)
    }

    fn take_key_event(&mut self) -> bool {
        self.irq.take_key_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    /// Register file with the chip's one-transaction read pipeline
    struct MockChip {
        registers: [u8; 128],
        debounced: u8,
        pressed: u8,
        pending: u8,
        sent: Vec<u16, 64>,
    }

    impl MockChip {
        fn new() -> Self {
            Self {
                registers: [0; 128],
                debounced: 0,
                pressed: 0,
                pending: 0,
                sent: Vec::new(),
            }
        }

        fn writes(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
            self.sent
                .iter()
                .map(|&word| Message::decode(word))
                .filter(|message| !message.read)
                .map(|message| (message.register, message.data))
        }
    }

    impl SpiTransactor for MockChip {
        fn transact(&mut self, word: u16) -> u16 {
            self.sent.push(word).unwrap();
            let reply = u16::from(self.pending);
            let message = Message::decode(word);

            self.pending = match (message.read, message.register) {
                (true, reg::NO_OP) => 0,
                (true, reg::KEY_MASK_DEBOUNCED) => core::mem::take(&mut self.debounced),
                (true, reg::DIGIT_TYPE_KEY_PRESSED) => self.pressed,
                (true, register) => self.registers[register as usize],
                (false, register) => {
                    self.registers[register as usize] = message.data;
                    0
                }
            };
            reply
        }
    }

    #[derive(Default)]
    struct MockIrq {
        pending: bool,
    }

    impl KeyInterrupt for MockIrq {
        fn take_key_event(&mut self) -> bool {
            core::mem::take(&mut self.pending)
        }
    }

    fn driver() -> Max6954<MockChip, MockIrq> {
        Max6954::new(MockChip::new(), MockIrq::default())
    }

    #[test]
    fn test_message_encoding() {
        assert_eq!(Message::write(reg::SCAN_LIMIT, 5).encode(), 0x0305);
        assert_eq!(Message::read(reg::NO_OP).encode(), 0x8000);
        assert_eq!(Message::read(reg::KEY_MASK_DEBOUNCED).encode(), 0x8800);
        assert_eq!(Message::write(reg::DIGIT_0 + 10, 0x87).encode(), 0x2A87);
    }

    #[test]
    fn test_message_decoding() {
        assert_eq!(
            Message::decode(0x8C03),
            Message {
                read: true,
                register: reg::DIGIT_TYPE_KEY_PRESSED,
                data: 0x03
            }
        );
    }

    #[test]
    fn test_configuration_bits() {
        assert_eq!(Configuration::RUN.bits(), 0x01);

        let configuration = Configuration::from_bits(0xFD);
        assert!(configuration.shutdown_off);
        assert!(configuration.blink_phase);
        assert_eq!(configuration.bits(), 0xFD);
        // the unused bit does not survive
        assert_eq!(Configuration::from_bits(0x02), Configuration::default());
    }

    #[test]
    fn test_write_is_one_transaction() {
        let mut max = driver();
        max.set_global_intensity(7);

        let (chip, _) = max.release();
        assert_eq!(chip.sent.as_slice(), &[0x0207]);
    }

    #[test]
    fn test_read_collects_result_with_no_op() {
        let mut max = driver();
        max.write_digit_raw(3, 0x85);
        assert_eq!(max.read_digit(3), 0x85);

        let (chip, _) = max.release();
        assert_eq!(chip.sent.as_slice(), &[0x2385, 0xA300, 0x8000]);
    }

    #[test]
    fn test_configuration_read_back() {
        let mut max = driver();
        let written = Configuration {
            blink_enable: true,
            ..Configuration::RUN
        };
        max.write_configuration(written);
        assert_eq!(max.read_configuration(), written);
    }

    #[test]
    fn test_configure_sequence() {
        let mut max = driver();
        max.irq.pending = true;
        max.configure(&DisplaySetup::DEFAULT);

        assert!(!max.take_key_event());
        let (chip, _) = max.release();
        assert_eq!(
            chip.sent.as_slice(),
            &[
                0x0305, // scan limit 5
                0x0200, // intensity 0
                0x0C00, // all 7-segment
                0x01FF, // hex decode everywhere
                0x0401, // running
                0x0620, // key scan, P4 is IRQ
                0x0802, // interrupt on key 1
                0x8800, // debounced read releases IRQ
                0x8000,
            ]
        );
    }

    #[test]
    fn test_key_reads() {
        let mut max = driver();
        max.spi.debounced = 0x02;
        max.spi.pressed = 0x01;

        assert_eq!(max.debounced_keys(), 0x02);
        // cleared by the read
        assert_eq!(max.debounced_keys(), 0x00);
        assert_eq!(max.pressed_keys(), 0x01);
        assert_eq!(max.pressed_keys(), 0x01);
    }

    #[test]
    fn test_write_digit_with_decimal_point() {
        let mut max = driver();
        max.write_digit(2, 1, true);
        max.write_digit(10, 9, false);

        let (chip, _) = max.release();
        let writes: Vec<(u8, u8), 4> = chip.writes().collect();
        assert_eq!(writes.as_slice(), &[(0x22, 0x81), (0x2A, 0x09)]);
    }

    #[test]
    fn test_display_test() {
        let mut max = driver();
        max.set_display_test(true);
        max.set_display_test(false);

        let (chip, _) = max.release();
        assert_eq!(chip.sent.as_slice(), &[0x0701, 0x0700]);
    }
}
