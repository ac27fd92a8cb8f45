//! Radio Panel Hardware Abstraction Layer
//!
//! This crate defines the hardware capabilities the panel logic is written
//! against. Chip-specific HALs implement them; the core crates and the
//! host-side tests only ever see these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  radiopanel-firmware (main loop, ISRs)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  radiopanel-core / radiopanel-drivers   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  radiopanel-hal (this crate - traits)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  radiopanel-hal-nrf52840                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`spi::SpiDma`], [`spi::SpiTransactor`] - Word-oriented SPI master
//! - [`qdec::QuadratureDecoder`] - Hardware rotary encoder counter
//! - [`keypad::KeyInterrupt`] - Keypad controller interrupt line
//! - [`usbd::UsbPeripheral`] - Register-level USB device controller
//! - [`Sleep`] - Low-power wait for the next event
//!
//! Interrupt handlers talk to the main loop exclusively through
//! [`signal::SignalFlag`].

#![no_std]
#![deny(unsafe_code)]

pub mod keypad;
pub mod qdec;
pub mod signal;
pub mod spi;
pub mod usbd;

// Re-export key traits at crate root for convenience
pub use keypad::KeyInterrupt;
pub use qdec::QuadratureDecoder;
pub use signal::SignalFlag;
pub use spi::{SpiDma, SpiTransactor};
pub use usbd::{EndpointDirection, UsbEvent, UsbPeripheral, UsbTask};

/// Low-power wait
///
/// Suspends the CPU until any interrupt or event occurs. Every blocking
/// wait in the firmware is a loop around this call.
pub trait Sleep {
    /// Sleep until the next event
    fn sleep(&mut self);
}
