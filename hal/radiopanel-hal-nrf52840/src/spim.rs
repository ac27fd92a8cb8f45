//! SPIM3 word engine
//!
//! SPIM3 is the only SPI master instance with a hardware-driven chip
//! select, so a whole 16-bit exchange is one EasyDMA transfer with no GPIO
//! toggling. The END interrupt sets [`Spim3::done_flag`].

use core::sync::atomic::{compiler_fence, Ordering};

use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pin, Pull};
use embassy_nrf::interrupt::{self, InterruptExt};
use embassy_nrf::pac;
use embassy_nrf::pac::spim::vals;
use embassy_nrf::peripherals::SPI3;
use embassy_nrf::Peri;
use radiopanel_hal::spi::{BitOrder, ChipSelect, Mode, Phase, Polarity, SpiConfig};
use radiopanel_hal::{SignalFlag, SpiDma};

static END: SignalFlag = SignalFlag::new();

/// Chip-select setup time in 64 MHz cycles; the MAX6954 needs 19.5 ns
const CSN_DURATION: u8 = 2;

const TRANSFER_LEN: usize = 2;

fn frequency(hz: u32) -> vals::Frequency {
    match hz {
        ..=125_000 => vals::Frequency::K125,
        ..=250_000 => vals::Frequency::K250,
        ..=500_000 => vals::Frequency::K500,
        ..=1_000_000 => vals::Frequency::M1,
        ..=2_000_000 => vals::Frequency::M2,
        ..=4_000_000 => vals::Frequency::M4,
        _ => vals::Frequency::M8,
    }
}

/// SPIM3 with its pins
pub struct Spim3<'d> {
    _spim: Peri<'d, SPI3>,
    _sck: Output<'d>,
    _mosi: Output<'d>,
    _miso: Input<'d>,
    _csn: Output<'d>,
    tx: [u8; TRANSFER_LEN],
    rx: [u8; TRANSFER_LEN],
}

impl<'d> Spim3<'d> {
    pub fn new(
        spim: Peri<'d, SPI3>,
        csn: Peri<'d, impl Pin>,
        sck: Peri<'d, impl Pin>,
        mosi: Peri<'d, impl Pin>,
        miso: Peri<'d, impl Pin>,
        config: &SpiConfig,
    ) -> Self {
        let r = pac::SPIM3;
        interrupt::SPIM3.disable();
        r.intenclr().write(|w| w.0 = u32::MAX);

        let (polarity, phase): (Polarity, Phase) = config.mode.into();
        let csn_psel = csn.psel_bits();
        let sck_psel = sck.psel_bits();
        let mosi_psel = mosi.psel_bits();
        let miso_psel = miso.psel_bits();

        // pins are set up in GPIO before the peripheral is enabled
        let sck_idle = match polarity {
            Polarity::IdleLow => Level::Low,
            Polarity::IdleHigh => Level::High,
        };
        let csn_idle = match config.chip_select {
            ChipSelect::ActiveLow => Level::High,
            ChipSelect::ActiveHigh => Level::Low,
        };
        let sck = Output::new(sck, sck_idle, OutputDrive::Standard);
        let mosi = Output::new(mosi, Level::Low, OutputDrive::Standard);
        // MAX6954 DOUT is never high impedance
        let miso = Input::new(miso, Pull::None);
        let csn = Output::new(csn, csn_idle, OutputDrive::Standard);

        r.psel().sck().write_value(sck_psel);
        r.psel().mosi().write_value(mosi_psel);
        r.psel().miso().write_value(miso_psel);
        r.psel().csn().write_value(csn_psel);

        r.frequency().write(|w| w.set_frequency(frequency(config.frequency)));
        r.config().write(|w| {
            w.set_order(match config.bit_order {
                BitOrder::MsbFirst => vals::Order::MSB_FIRST,
                BitOrder::LsbFirst => vals::Order::LSB_FIRST,
            });
            w.set_cpol(match polarity {
                Polarity::IdleLow => vals::Cpol::ACTIVE_HIGH,
                Polarity::IdleHigh => vals::Cpol::ACTIVE_LOW,
            });
            w.set_cpha(match phase {
                Phase::CaptureOnFirstTransition => vals::Cpha::LEADING,
                Phase::CaptureOnSecondTransition => vals::Cpha::TRAILING,
            });
        });
        r.csnpol().write(|w| {
            w.set_csnpol(match config.chip_select {
                ChipSelect::ActiveLow => vals::Csnpol::LOW,
                ChipSelect::ActiveHigh => vals::Csnpol::HIGH,
            })
        });
        r.iftiming().csndur().write(|w| w.set_csndur(CSN_DURATION));
        r.orc().write(|w| w.set_orc(0));

        r.enable().write(|w| w.set_enable(vals::Enable::ENABLED));

        r.events_end().write_value(0);
        crate::enable_interrupt(interrupt::SPIM3);
        r.intenset().write(|w| w.set_end(true));

        Self {
            _spim: spim,
            _sck: sck,
            _mosi: mosi,
            _miso: miso,
            _csn: csn,
            tx: [0; TRANSFER_LEN],
            rx: [0; TRANSFER_LEN],
        }
    }

    /// Flag set by the END interrupt
    pub fn done_flag() -> &'static SignalFlag {
        &END
    }

    /// Body of the SPIM3 interrupt handler
    pub fn on_interrupt() {
        let r = pac::SPIM3;
        if r.events_end().read() != 0 {
            r.events_end().write_value(0);
            END.set();
        }
    }
}

impl SpiDma for Spim3<'_> {
    fn stage(&mut self, tx: [u8; 2]) {
        self.tx = tx;
    }

    fn start(&mut self) {
        let r = pac::SPIM3;
        r.txd().ptr().write_value(self.tx.as_ptr() as u32);
        r.txd().maxcnt().write(|w| w.set_maxcnt(TRANSFER_LEN as _));
        r.rxd().ptr().write_value(self.rx.as_mut_ptr() as u32);
        r.rxd().maxcnt().write(|w| w.set_maxcnt(TRANSFER_LEN as _));

        r.events_end().write_value(0);
        // buffers must be written before DMA starts reading them
        compiler_fence(Ordering::SeqCst);
        r.tasks_start().write_value(1);
    }

    fn received(&self) -> [u8; 2] {
        compiler_fence(Ordering::SeqCst);
        self.rx
    }
}
