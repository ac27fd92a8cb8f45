//! Value to display digit mapping
//!
//! A value occupies six controller digit positions starting at its base,
//! most significant digit first, with the decimal point lit after the
//! third digit (`121.500`).

use crate::traits::DisplayKeypad;

/// Digits shown per value
pub const DIGITS: usize = 6;

/// First controller position of the active value
pub const ACTIVE_BASE: u8 = 0;

/// First controller position of the standby value
pub const STANDBY_BASE: u8 = 8;

/// Offset of the digit carrying the decimal point
pub const DECIMAL_POINT_POSITION: usize = 2;

/// Decimal digits of `value`, most significant first
///
/// Values above six digits lose their leading digits.
pub fn digits(value: u32) -> [u8; DIGITS] {
    let mut out = [0u8; DIGITS];
    let mut rest = value;
    for slot in out.iter_mut().rev() {
        *slot = (rest % 10) as u8;
        rest /= 10;
    }
    out
}

/// Write `value` to the six positions starting at `base`
pub fn render<D: DisplayKeypad>(display: &mut D, base: u8, value: u32) {
    for (offset, digit) in digits(value).into_iter().enumerate() {
        display.write_digit(
            base + offset as u8,
            digit,
            offset == DECIMAL_POINT_POSITION,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits() {
        assert_eq!(digits(121_500), [1, 2, 1, 5, 0, 0]);
        assert_eq!(digits(0), [0; 6]);
        assert_eq!(digits(999_999), [9; 6]);
        assert_eq!(digits(7_025), [0, 0, 7, 0, 2, 5]);
    }
}
