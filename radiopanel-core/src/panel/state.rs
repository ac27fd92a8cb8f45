//! Active and standby values

use radiopanel_protocol::{PanelReport, VALUE_MAX};

/// The two displayed values
///
/// Both values stay within `0..=VALUE_MAX` after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelState {
    active: u32,
    standby: u32,
}

const fn clamp(value: u32) -> u32 {
    if value > VALUE_MAX {
        VALUE_MAX
    } else {
        value
    }
}

impl PanelState {
    pub const fn new(active: u32, standby: u32) -> Self {
        Self {
            active: clamp(active),
            standby: clamp(standby),
        }
    }

    pub const fn active(&self) -> u32 {
        self.active
    }

    pub const fn standby(&self) -> u32 {
        self.standby
    }

    /// Exchange active and standby
    pub fn swap(&mut self) {
        core::mem::swap(&mut self.active, &mut self.standby);
    }

    /// Move standby by `detents × step`, saturating at the range ends
    pub fn step_standby(&mut self, detents: i32, step: u32) {
        let target = i64::from(self.standby) + i64::from(detents) * i64::from(step);
        self.standby = target.clamp(0, i64::from(VALUE_MAX)) as u32;
    }

    /// Take both values from a host report
    pub fn apply(&mut self, report: &PanelReport) {
        *self = Self::new(report.active, report.standby);
    }

    pub fn report(&self) -> PanelReport {
        PanelReport::new(self.active, self.standby)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps() {
        let state = PanelState::new(1_000_000, 5);
        assert_eq!(state.active(), VALUE_MAX);
        assert_eq!(state.standby(), 5);
    }

    #[test]
    fn test_swap() {
        let mut state = PanelState::new(121_500, 122_900);
        state.swap();
        assert_eq!(state.active(), 122_900);
        assert_eq!(state.standby(), 121_500);
    }

    #[test]
    fn test_step_standby() {
        let mut state = PanelState::new(0, 122_900);
        state.step_standby(2, 25);
        assert_eq!(state.standby(), 122_950);
        state.step_standby(-3, 1000);
        assert_eq!(state.standby(), 119_950);
    }

    #[test]
    fn test_step_saturates() {
        let mut state = PanelState::new(0, 999_000);
        state.step_standby(5, 1000);
        assert_eq!(state.standby(), VALUE_MAX);

        state.step_standby(-2000, 1000);
        assert_eq!(state.standby(), 0);
    }

    #[test]
    fn test_apply_clamps_host_values() {
        let mut state = PanelState::new(0, 0);
        state.apply(&PanelReport::new(123_450, 0xF_FFFF));
        assert_eq!(state.report(), PanelReport::new(123_450, VALUE_MAX));
    }
}
