//! Blocking SPI word transactor
//!
//! Turns an interrupt-driven DMA engine into a synchronous 16-bit
//! exchange: clear the completion flag, stage the word big-endian, start,
//! then sleep until the interrupt handler sets the flag.

use radiopanel_hal::{SignalFlag, Sleep, SpiDma, SpiTransactor};

/// Synchronous transactor over a DMA engine and its completion flag
pub struct BusTransactor<P, S> {
    spi: P,
    done: &'static SignalFlag,
    sleep: S,
}

impl<P: SpiDma, S: Sleep> BusTransactor<P, S> {
    /// `done` must be the flag set by the engine's end-of-transfer interrupt
    pub fn new(spi: P, done: &'static SignalFlag, sleep: S) -> Self {
        Self { spi, done, sleep }
    }

    /// Release the underlying engine
    pub fn release(self) -> P {
        self.spi
    }
}

impl<P: SpiDma, S: Sleep> SpiTransactor for BusTransactor<P, S> {
    fn transact(&mut self, word: u16) -> u16 {
        self.done.clear();
        self.spi.stage(word.to_be_bytes());
        self.spi.start();

        while !self.done.test_and_clear() {
            self.sleep.sleep();
        }

        u16::from_be_bytes(self.spi.received())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    /// DMA engine whose transfer completes while the CPU sleeps
    struct MockSpi {
        staged: [u8; 2],
        reply: [u8; 2],
        sent: Vec<[u8; 2], 8>,
        started: bool,
    }

    impl MockSpi {
        fn new(reply: [u8; 2]) -> Self {
            Self {
                staged: [0; 2],
                reply,
                sent: Vec::new(),
                started: false,
            }
        }
    }

    impl SpiDma for MockSpi {
        fn stage(&mut self, tx: [u8; 2]) {
            self.staged = tx;
        }

        fn start(&mut self) {
            self.started = true;
            self.sent.push(self.staged).unwrap();
        }

        fn received(&self) -> [u8; 2] {
            self.reply
        }
    }

    /// Sleeping "takes" the end-of-transfer interrupt
    struct MockSleep {
        flag: &'static SignalFlag,
        count: usize,
    }

    impl Sleep for MockSleep {
        fn sleep(&mut self) {
            self.count += 1;
            self.flag.set();
        }
    }

    #[test]
    fn test_word_is_sent_big_endian() {
        static DONE: SignalFlag = SignalFlag::new();
        let sleep = MockSleep { flag: &DONE, count: 0 };
        let mut bus = BusTransactor::new(MockSpi::new([0, 0]), &DONE, sleep);

        bus.transact(0x0405);

        let spi = bus.release();
        assert!(spi.started);
        assert_eq!(spi.sent.as_slice(), &[[0x04, 0x05]]);
    }

    #[test]
    fn test_reply_is_read_big_endian() {
        static DONE: SignalFlag = SignalFlag::new();
        let sleep = MockSleep { flag: &DONE, count: 0 };
        let mut bus = BusTransactor::new(MockSpi::new([0x80, 0x3C]), &DONE, sleep);

        assert_eq!(bus.transact(0x0000), 0x803C);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        static DONE: SignalFlag = SignalFlag::new();
        let sleep = MockSleep { flag: &DONE, count: 0 };
        let mut bus = BusTransactor::new(MockSpi::new([0, 0]), &DONE, sleep);

        // left over from an earlier transfer
        DONE.set();
        bus.transact(0x0100);

        assert_eq!(bus.sleep.count, 1);
        assert!(!DONE.is_set());
    }

    #[test]
    fn test_each_transaction_waits() {
        static DONE: SignalFlag = SignalFlag::new();
        let sleep = MockSleep { flag: &DONE, count: 0 };
        let mut bus = BusTransactor::new(MockSpi::new([0, 0]), &DONE, sleep);

        bus.transact(0x0100);
        bus.transact(0x0200);
        bus.transact(0x0300);

        assert_eq!(bus.sleep.count, 3);
        assert_eq!(bus.release().sent.len(), 3);
    }
}
