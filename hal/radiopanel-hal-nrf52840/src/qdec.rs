//! Quadrature decoder

use embassy_nrf::gpio::{Input, Pin, Pull};
use embassy_nrf::interrupt::{self, InterruptExt};
use embassy_nrf::pac;
use embassy_nrf::pac::qdec::vals;
use embassy_nrf::peripherals::QDEC;
use embassy_nrf::Peri;
use radiopanel_hal::{QuadratureDecoder, SignalFlag};

static REPORT_READY: SignalFlag = SignalFlag::new();

/// QDEC sampling a mechanical encoder, no LED
///
/// 24 detents per turn sample fine at 2048 µs with the debounce filter
/// on; a report is raised every 10 samples while the count is nonzero.
pub struct Qdec<'d> {
    _qdec: Peri<'d, QDEC>,
    _a: Input<'d>,
    _b: Input<'d>,
}

impl<'d> Qdec<'d> {
    pub fn new(qdec: Peri<'d, QDEC>, a: Peri<'d, impl Pin>, b: Peri<'d, impl Pin>) -> Self {
        let r = pac::QDEC;
        interrupt::QDEC.disable();
        r.intenclr().write(|w| w.0 = u32::MAX);

        let a_psel = a.psel_bits();
        let b_psel = b.psel_bits();
        let a = Input::new(a, Pull::Up);
        let b = Input::new(b, Pull::Up);

        r.psel().a().write_value(a_psel);
        r.psel().b().write_value(b_psel);

        r.sampleper().write(|w| w.set_sampleper(vals::Sampleper::_2048US));
        r.dbfen().write(|w| w.set_dbfen(true));
        r.reportper().write(|w| w.set_reportper(vals::Reportper::_10SMPL));
        r.enable().write(|w| w.set_enable(true));

        r.events_reportrdy().write_value(0);
        crate::enable_interrupt(interrupt::QDEC);
        r.intenset().write(|w| w.set_reportrdy(true));

        r.tasks_start().write_value(1);

        Self {
            _qdec: qdec,
            _a: a,
            _b: b,
        }
    }

    /// Body of the QDEC interrupt handler
    pub fn on_interrupt() {
        let r = pac::QDEC;
        if r.events_reportrdy().read() != 0 {
            r.events_reportrdy().write_value(0);
            REPORT_READY.set();
        }
    }
}

impl QuadratureDecoder for Qdec<'_> {
    fn take_report(&mut self) -> bool {
        REPORT_READY.test_and_clear()
    }

    fn read_and_clear(&mut self) -> i32 {
        let r = pac::QDEC;
        r.tasks_readclracc().write_value(1);
        r.accread().read() as i32
    }
}
