//! Key-interrupt line on GPIOTE channel 0

use embassy_nrf::gpio::{Input, Pin, Port, Pull};
use embassy_nrf::interrupt::{self, InterruptExt};
use embassy_nrf::pac;
use embassy_nrf::pac::gpiote::vals;
use embassy_nrf::peripherals::GPIOTE_CH0;
use embassy_nrf::Peri;
use radiopanel_hal::{KeyInterrupt, SignalFlag};

const CHANNEL: usize = 0;

static KEY: SignalFlag = SignalFlag::new();

/// Falling edge of an open-drain IRQ output
///
/// The pin has a pull-up; the MAX6954 only ever pulls its IRQ low.
pub struct KeyIrq<'d> {
    _channel: Peri<'d, GPIOTE_CH0>,
    _pin: Input<'d>,
}

impl<'d> KeyIrq<'d> {
    pub fn new(channel: Peri<'d, GPIOTE_CH0>, pin: Peri<'d, impl Pin>) -> Self {
        let g = pac::GPIOTE;
        interrupt::GPIOTE.disable();
        g.intenclr().write(|w| w.0 = u32::MAX);

        let number = pin.pin();
        let port = pin.port();
        let pin = Input::new(pin, Pull::Up);

        g.config(CHANNEL).write(|w| {
            w.set_mode(vals::Mode::EVENT);
            w.set_polarity(vals::Polarity::HI_TO_LO);
            w.set_port(port == Port::Port1);
            w.set_psel(number);
        });

        g.events_in(CHANNEL).write_value(0);
        crate::enable_interrupt(interrupt::GPIOTE);
        g.intenset().write(|w| w.set_in(CHANNEL, true));

        Self {
            _channel: channel,
            _pin: pin,
        }
    }

    /// Body of the GPIOTE interrupt handler
    pub fn on_interrupt() {
        let g = pac::GPIOTE;
        if g.events_in(CHANNEL).read() != 0 {
            g.events_in(CHANNEL).write_value(0);
            KEY.set();
        }
    }
}

impl KeyInterrupt for KeyIrq<'_> {
    fn take_key_event(&mut self) -> bool {
        KEY.test_and_clear()
    }
}
