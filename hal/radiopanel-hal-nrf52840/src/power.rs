//! USB supply detection
//!
//! The POWER peripheral reports three USB supply events. Detection and
//! removal are edges the main loop consumes; "power ready" is a level the
//! USB power-up sequence waits on.

use embassy_nrf::interrupt;
use embassy_nrf::pac;
use portable_atomic::{AtomicBool, Ordering};
use radiopanel_hal::SignalFlag;

static DETECTED: SignalFlag = SignalFlag::new();
static REMOVED: SignalFlag = SignalFlag::new();
static READY: AtomicBool = AtomicBool::new(false);

/// Enable the USB supply interrupts
///
/// A supply already present at reset raised its events before anyone was
/// listening, so the current regulator status is latched as well.
pub fn init() {
    let p = pac::POWER;
    p.intenclr().write(|w| w.0 = u32::MAX);
    p.events_usbdetected().write_value(0);
    p.events_usbremoved().write_value(0);
    p.events_usbpwrrdy().write_value(0);

    let status = p.usbregstatus().read();
    if status.vbusdetect() {
        DETECTED.set();
    }
    READY.store(status.outputrdy(), Ordering::Release);

    crate::enable_interrupt(interrupt::CLOCK_POWER);
    p.intenset().write(|w| {
        w.set_usbdetected(true);
        w.set_usbremoved(true);
        w.set_usbpwrrdy(true);
    });
}

/// Body of the CLOCK_POWER interrupt handler
pub fn on_interrupt() {
    let p = pac::POWER;

    if p.events_usbdetected().read() != 0 {
        p.events_usbdetected().write_value(0);
        DETECTED.set();
    }

    if p.events_usbremoved().read() != 0 {
        p.events_usbremoved().write_value(0);
        READY.store(false, Ordering::Release);
        REMOVED.set();
    }

    if p.events_usbpwrrdy().read() != 0 {
        p.events_usbpwrrdy().write_value(0);
        READY.store(true, Ordering::Release);
    }
}

pub(crate) fn take_detected() -> bool {
    DETECTED.test_and_clear()
}

pub(crate) fn take_removed() -> bool {
    REMOVED.test_and_clear()
}

/// USB regulator output is up
pub fn is_ready() -> bool {
    READY.load(Ordering::Acquire)
}
