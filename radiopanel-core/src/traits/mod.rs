//! Hardware abstraction traits
//!
//! These traits define the interface between the panel logic and the
//! device drivers built on top of the HAL.

pub mod display;

pub use display::DisplayKeypad;
