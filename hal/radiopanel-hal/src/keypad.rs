//! Keypad interrupt line abstraction

/// Interrupt output of a key-scanning controller
///
/// The controller pulls its IRQ pin low when a debounced key event is
/// pending; the pin edge sets a flag that this trait consumes.
pub trait KeyInterrupt {
    /// Consume the key-event flag
    fn take_key_event(&mut self) -> bool;
}
