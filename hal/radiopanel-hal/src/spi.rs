//! SPI master abstractions
//!
//! The panel talks to exactly one SPI device, one 16-bit word at a time.
//! Two layers are exposed:
//!
//! - [`SpiDma`]: the raw peripheral. Stage two bytes, start, fetch the two
//!   bytes clocked in. Completion is reported by an interrupt that sets a
//!   [`SignalFlag`](crate::SignalFlag).
//! - [`SpiTransactor`]: a blocking word exchange built on top of it.

/// Raw DMA-driven SPI engine
///
/// Implementations own their transmit/receive buffers; a transfer is
/// always exactly two bytes, most significant byte first on the wire.
pub trait SpiDma {
    /// Load the bytes for the next transfer
    fn stage(&mut self, tx: [u8; 2]);

    /// Start the staged transfer
    ///
    /// Returns immediately; the end of the transfer is signaled through
    /// the completion flag.
    fn start(&mut self);

    /// Bytes received by the most recently completed transfer
    fn received(&self) -> [u8; 2];
}

/// Blocking 16-bit SPI exchange
pub trait SpiTransactor {
    /// Send `word` and return the word clocked in at the same time
    ///
    /// Blocks until the peripheral reports completion. There is no timeout:
    /// a peripheral that never completes hangs the caller.
    fn transact(&mut self, word: u16) -> u16;
}

/// SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Clock polarity and phase
    pub mode: Mode,
    /// Bit order on the wire
    pub bit_order: BitOrder,
    /// Hardware chip-select polarity
    pub chip_select: ChipSelect,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            frequency: 1_000_000, // 1 MHz
            mode: Mode::Mode0,
            bit_order: BitOrder::MsbFirst,
            chip_select: ChipSelect::ActiveLow,
        }
    }
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Clock idles low (CPOL=0)
    IdleLow,
    /// Clock idles high (CPOL=1)
    IdleHigh,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Data captured on first clock transition (CPHA=0)
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mode0 => (Polarity::IdleLow, Phase::CaptureOnFirstTransition),
            Mode::Mode1 => (Polarity::IdleLow, Phase::CaptureOnSecondTransition),
            Mode::Mode2 => (Polarity::IdleHigh, Phase::CaptureOnFirstTransition),
            Mode::Mode3 => (Polarity::IdleHigh, Phase::CaptureOnSecondTransition),
        }
    }
}

/// Bit order within each byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Most significant bit first
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}

/// Level at which the hardware-driven chip select is asserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipSelect {
    /// Asserted low
    ActiveLow,
    /// Asserted high
    ActiveHigh,
}
