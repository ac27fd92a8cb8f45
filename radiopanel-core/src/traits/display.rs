//! Display/keypad controller trait

use crate::config::DisplaySetup;

/// A multiplexed 7-segment display driver with an integrated key scanner
///
/// Positions are controller digit indices; the panel uses 0..=5 for the
/// active value and 8..=13 for the standby value.
pub trait DisplayKeypad {
    /// Bring the controller out of shutdown with the given setup
    ///
    /// Leaves no key interrupt pending.
    fn configure(&mut self, setup: &DisplaySetup);

    /// Show a decimal digit (0-9) at `position`
    fn write_digit(&mut self, position: u8, digit: u8, decimal_point: bool);

    /// Debounced key state of the first key bank
    ///
    /// Reading it releases the controller's interrupt output.
    fn debounced_keys(&mut self) -> u8;

    /// Instantaneous (non-debounced) key state of the first key bank
    fn pressed_keys(&mut self) -> u8;

    /// Consume the key-interrupt flag
    fn take_key_event(&mut self) -> bool;
}
