//! Configuration types
//!
//! Board-agnostic configuration structures. The firmware build script
//! generates a `PanelConfig` constant from `panel.toml`; tests use
//! [`PanelConfig::DEFAULT`].

pub mod types;

pub use types::*;
