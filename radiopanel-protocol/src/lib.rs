//! Radio Panel USB Protocol
//!
//! Byte-level formats exchanged between the panel and the host over USB:
//! control-transfer SETUP packets, the descriptor table that makes the
//! panel enumerate as a HID device, and the 5-byte report carried on the
//! interrupt endpoints.
//!
//! # Report Format
//!
//! Both directions use the same layout, two 20-bit values packed little
//! endian:
//! ```text
//! ┌──────────────────────┬──────────────────────┐
//! │ active (bits 0..20)  │ standby (bits 20..40)│
//! └──────────────────────┴──────────────────────┘
//!   byte 0 ─────────────────────────────► byte 4
//! ```
//!
//! Everything here is plain data with no hardware access, so the whole
//! crate is exercised by host tests.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod descriptor;
pub mod hid;
pub mod report;
pub mod setup;

pub use descriptor::{DescriptorError, DescriptorTable, UsbIdentity};
pub use hid::{Item, ReportDescriptor};
pub use report::{PanelReport, ReportError, REPORT_LEN, VALUE_MAX};
pub use setup::{
    DescriptorType, Direction, HidRequest, Recipient, RequestKind, RequestType, SetupPacket,
    StandardRequest,
};
