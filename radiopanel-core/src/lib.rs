//! Board-agnostic core logic for the radio panel firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Blocking SPI word transactor over a DMA engine
//! - Rotary encoder detent accumulation
//! - USB control-transfer dispatcher and data endpoints
//! - The panel state and its event loop
//! - Configuration type definitions
//!
//! Hardware is reached only through the `radiopanel-hal` traits and the
//! [`traits::DisplayKeypad`] trait, so everything here runs in host tests.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod bus;
pub mod config;
pub mod panel;
pub mod rotary;
pub mod traits;
pub mod usb;
