//! Device drivers
//!
//! Concrete implementations of the traits defined in radiopanel-core,
//! written against the radiopanel-hal bus traits:
//!
//! - MAX6954 LED display driver with key scanner

#![no_std]
#![deny(unsafe_code)]

pub mod max6954;

pub use max6954::Max6954;
