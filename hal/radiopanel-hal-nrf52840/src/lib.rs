//! nRF52840-specific HAL for the radio panel firmware
//!
//! This crate implements the shared `radiopanel-hal` traits on top of the
//! nRF52840 registers exposed by `embassy-nrf`:
//!
//! - SPIM3 with hardware chip select ([`spim::Spim3`])
//! - Quadrature decoder ([`qdec::Qdec`])
//! - GPIOTE key-interrupt line ([`gpiote::KeyIrq`])
//! - USB device controller and its power-up sequence ([`usbd::Usbd`])
//! - USB supply detection ([`power`])
//! - WFE sleep ([`Wfe`])
//!
//! No interrupt handlers are defined here. Each peripheral exposes an
//! `on_interrupt` function that the firmware calls from its vector, and
//! which does nothing but clear the event and set a flag.

#![no_std]

pub mod gpiote;
pub mod power;
pub mod qdec;
pub mod spim;
pub mod usbd;

use embassy_nrf::interrupt::{Interrupt, InterruptExt, Priority};
use radiopanel_hal::Sleep;

/// Priority shared by every peripheral interrupt
pub const IRQ_PRIORITY: Priority = Priority::P7;

/// Sleep with `WFE`
///
/// Any interrupt, or an event already latched since the last `WFE`, ends
/// the wait.
#[derive(Debug, Default, Clone, Copy)]
pub struct Wfe;

impl Sleep for Wfe {
    fn sleep(&mut self) {
        cortex_m::asm::wfe();
    }
}

/// Unmask `irq` at [`IRQ_PRIORITY`], dropping anything pending from before
pub(crate) fn enable_interrupt(irq: Interrupt) {
    irq.set_priority(IRQ_PRIORITY);
    irq.unpend();
    // SAFETY: the handlers only touch their own peripheral's events and a flag
    unsafe { irq.enable() };
}
