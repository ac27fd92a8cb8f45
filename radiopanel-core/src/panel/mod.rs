//! Panel event loop
//!
//! The panel owns the displayed values and one of each driver. Interrupt
//! handlers only raise flags; every iteration of the loop sleeps until an
//! event, then services the pending flags in a fixed priority order:
//!
//! 1. USB bus power removed or detected
//! 2. SETUP packet on the control endpoint
//! 3. Host report on the interrupt OUT endpoint
//! 4. Keypad interrupt (swap key)
//! 5. Rotary encoder report
//!
//! Local changes (4, 5) re-render and send a report to the host; host
//! writes (3) re-render without echoing a report back.

pub mod render;
pub mod state;

pub use render::{digits, render, ACTIVE_BASE, DECIMAL_POINT_POSITION, DIGITS, STANDBY_BASE};
pub use state::PanelState;

use embedded_hal::digital::{OutputPin, PinState};
use radiopanel_hal::{QuadratureDecoder, Sleep, UsbPeripheral};
use radiopanel_protocol::{DescriptorTable, PanelReport, ReportError};

use crate::config::{DisplaySetup, PanelConfig, PanelSettings};
use crate::rotary::Rotary;
use crate::traits::DisplayKeypad;
use crate::usb::{ControlError, ControlOutcome, UsbFunction};

/// USB bus power transition seen in one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkChange {
    Attached,
    Detached,
}

/// What one loop iteration did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Activity {
    pub link: Option<LinkChange>,
    pub control: Option<Result<ControlOutcome, ControlError>>,
    pub host_write: Option<Result<PanelReport, ReportError>>,
    pub swapped: bool,
    /// Whole detents applied to standby
    pub detents: i32,
    pub reports_sent: u8,
    /// Reports dropped because the host has not configured the device
    pub reports_skipped: u8,
}

impl Activity {
    /// Nothing was pending; the wake-up came from an unrelated event
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// The panel: state, drivers and indicator LEDs
pub struct Panel<D, Q, U, L> {
    display: D,
    rotary: Rotary<Q>,
    usb: UsbFunction<U>,
    fault: L,
    status: L,
    state: PanelState,
    settings: PanelSettings,
    display_setup: DisplaySetup,
}

impl<D, Q, U, L> Panel<D, Q, U, L>
where
    D: DisplayKeypad,
    Q: QuadratureDecoder,
    U: UsbPeripheral,
    L: OutputPin,
{
    pub fn new(
        display: D,
        decoder: Q,
        usb: U,
        fault: L,
        status: L,
        descriptors: &'static DescriptorTable,
        config: &PanelConfig,
    ) -> Self {
        Self {
            display,
            rotary: Rotary::new(decoder),
            usb: UsbFunction::new(usb, descriptors),
            fault,
            status,
            state: PanelState::new(config.panel.active, config.panel.standby),
            settings: config.panel,
            display_setup: config.display,
        }
    }

    /// Configure the display controller and show the initial values
    pub fn init(&mut self) {
        // indicator errors are Infallible on every supported board
        let _ = self.fault.set_low();
        let _ = self.status.set_low();

        self.display.configure(&self.display_setup);
        self.render();
    }

    /// Service every pending event once
    pub fn poll(&mut self) -> Activity {
        let mut activity = Activity::default();

        if self.usb.take_removed() {
            self.usb.detach();
            activity.link = Some(LinkChange::Detached);
        }
        if self.usb.take_detected() {
            self.usb.start();
            activity.link = Some(LinkChange::Attached);
        }

        if self.usb.take_setup() {
            let result = self.usb.handle_setup();
            if result.is_err() {
                let _ = self.fault.set_high();
            }
            activity.control = Some(result);
        }
        let _ = self
            .status
            .set_state(PinState::from(self.usb.is_configured()));

        if self.usb.take_data_out() {
            let result = self.usb.receive_report();
            if let Ok(report) = &result {
                self.state.apply(report);
                self.render();
            }
            activity.host_write = Some(result);
        }

        if self.display.take_key_event() {
            // reading the debounced keys also releases the IRQ line
            let keys = self.display.debounced_keys();
            if keys & self.settings.swap_key != 0 {
                self.state.swap();
                activity.swapped = true;
                self.render();
                self.report(&mut activity);
            }
        }

        if self.rotary.has_report() {
            let keys = self.display.pressed_keys();
            let detents = self.rotary.detents();
            if detents != 0 {
                let step = if keys & self.settings.decimals_key != 0 {
                    self.settings.fine_step
                } else {
                    self.settings.coarse_step
                };
                self.state.step_standby(detents, step);
                activity.detents = detents;
                self.render();
                self.report(&mut activity);
            }
        }

        activity
    }

    /// Run forever, handing each iteration's activity to `on_activity`
    pub fn run<S: Sleep>(&mut self, mut sleep: S, mut on_activity: impl FnMut(&Activity)) -> ! {
        loop {
            sleep.sleep();
            let activity = self.poll();
            on_activity(&activity);
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn rotary(&self) -> &Rotary<Q> {
        &self.rotary
    }

    pub fn usb(&self) -> &UsbFunction<U> {
        &self.usb
    }

    pub fn usb_mut(&mut self) -> &mut UsbFunction<U> {
        &mut self.usb
    }

    fn render(&mut self) {
        render(&mut self.display, ACTIVE_BASE, self.state.active());
        render(&mut self.display, STANDBY_BASE, self.state.standby());
    }

    fn report(&mut self, activity: &mut Activity) {
        if self.usb.send_report(&self.state.report()) {
            activity.reports_sent += 1;
        } else {
            activity.reports_skipped += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::mock::{Call, MockUsb};
    use crate::usb::ControlStage;
    use core::convert::Infallible;
    use heapless::Vec;
    use radiopanel_hal::UsbTask;
    use radiopanel_protocol::{
        Direction, Recipient, RequestKind, RequestType, SetupPacket, StandardRequest, UsbIdentity,
    };

    static DESCRIPTORS: DescriptorTable = DescriptorTable::new(&UsbIdentity::DEFAULT);

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum DisplayCall {
        Configure,
        Digit(u8, u8, bool),
        Debounced,
        Pressed,
    }

    #[derive(Default)]
    struct MockDisplay {
        calls: Vec<DisplayCall, 64>,
        key_event: bool,
        debounced: u8,
        pressed: u8,
    }

    impl MockDisplay {
        fn digit_writes(&self) -> usize {
            self.calls
                .iter()
                .filter(|call| matches!(call, DisplayCall::Digit(..)))
                .count()
        }

        /// Digits last written to the six positions from `base`
        fn shown(&self, base: u8) -> [(u8, bool); DIGITS] {
            let mut shown = [(0, false); DIGITS];
            for call in &self.calls {
                if let DisplayCall::Digit(position, digit, dp) = *call {
                    if (base..base + DIGITS as u8).contains(&position) {
                        shown[(position - base) as usize] = (digit, dp);
                    }
                }
            }
            shown
        }
    }

    impl DisplayKeypad for MockDisplay {
        fn configure(&mut self, _setup: &DisplaySetup) {
            self.calls.push(DisplayCall::Configure).unwrap();
        }

        fn write_digit(&mut self, position: u8, digit: u8, decimal_point: bool) {
            self.calls
                .push(DisplayCall::Digit(position, digit, decimal_point))
                .unwrap();
        }

        fn debounced_keys(&mut self) -> u8 {
            self.calls.push(DisplayCall::Debounced).unwrap();
            self.debounced
        }

        fn pressed_keys(&mut self) -> u8 {
            self.calls.push(DisplayCall::Pressed).unwrap();
            self.pressed
        }

        fn take_key_event(&mut self) -> bool {
            core::mem::take(&mut self.key_event)
        }
    }

    #[derive(Default)]
    struct MockDecoder {
        report: bool,
        pulses: i32,
    }

    impl QuadratureDecoder for MockDecoder {
        fn take_report(&mut self) -> bool {
            core::mem::take(&mut self.report)
        }

        fn read_and_clear(&mut self) -> i32 {
            core::mem::take(&mut self.pulses)
        }
    }

    #[derive(Default)]
    struct MockLed {
        lit: bool,
    }

    impl embedded_hal::digital::ErrorType for MockLed {
        type Error = Infallible;
    }

    impl OutputPin for MockLed {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.lit = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.lit = true;
            Ok(())
        }
    }

    type TestPanel = Panel<MockDisplay, MockDecoder, MockUsb, MockLed>;

    fn panel() -> TestPanel {
        let mut panel = Panel::new(
            MockDisplay::default(),
            MockDecoder::default(),
            MockUsb::new(),
            MockLed::default(),
            MockLed::default(),
            &DESCRIPTORS,
            &PanelConfig::DEFAULT,
        );
        panel.init();
        panel.display.calls.clear();
        panel
    }

    fn request(direction: Direction, kind: RequestKind, request: u8, value: u16) -> SetupPacket {
        SetupPacket {
            request_type: RequestType::new(direction, kind, Recipient::Device),
            request,
            value,
            index: 0,
            length: 0,
        }
    }

    fn configured_panel() -> TestPanel {
        let mut panel = panel();
        panel.usb.peripheral_mut().receive_setup(request(
            Direction::HostToDevice,
            RequestKind::Standard,
            StandardRequest::SetConfiguration as u8,
            1,
        ));
        panel.poll();
        panel.usb.peripheral_mut().clear_calls();
        panel
    }

    fn turn(panel: &mut TestPanel, pulses: i32) -> Activity {
        panel.rotary.decoder_mut().pulses = pulses;
        panel.rotary.decoder_mut().report = true;
        panel.poll()
    }

    #[test]
    fn test_init_configures_then_renders() {
        let mut panel = Panel::new(
            MockDisplay::default(),
            MockDecoder::default(),
            MockUsb::new(),
            MockLed { lit: true },
            MockLed { lit: true },
            &DESCRIPTORS,
            &PanelConfig::DEFAULT,
        );
        panel.init();

        assert_eq!(panel.display.calls[0], DisplayCall::Configure);
        assert_eq!(panel.display.digit_writes(), 2 * DIGITS);
        assert!(!panel.fault.lit);
        assert!(!panel.status.lit);
    }

    #[test]
    fn test_render_initial_values() {
        let mut panel = panel();
        panel.render();

        assert_eq!(
            panel.display.shown(ACTIVE_BASE),
            [(1, false), (2, false), (1, true), (5, false), (0, false), (0, false)]
        );
        assert_eq!(
            panel.display.shown(STANDBY_BASE),
            [(1, false), (2, false), (2, true), (9, false), (0, false), (0, false)]
        );
    }

    #[test]
    fn test_idle_poll() {
        let mut panel = panel();
        assert!(panel.poll().is_idle());
        assert!(panel.display.calls.is_empty());
    }

    #[test]
    fn test_partial_detent_does_nothing() {
        let mut panel = configured_panel();
        let activity = turn(&mut panel, 3);

        assert_eq!(activity.detents, 0);
        assert_eq!(panel.rotary.accumulator().remainder(), 3);
        assert_eq!(panel.display.digit_writes(), 0);
        assert!(panel.usb.peripheral().calls.is_empty());
        assert_eq!(panel.state().standby(), 122_900);
    }

    #[test]
    fn test_rotary_coarse_step() {
        let mut panel = configured_panel();
        let activity = turn(&mut panel, 8);

        assert_eq!(activity.detents, 2);
        assert_eq!(activity.reports_sent, 1);
        assert_eq!(panel.state().standby(), 124_900);
        assert_eq!(panel.display.digit_writes(), 2 * DIGITS);
        assert_eq!(
            panel.usb.peripheral().in_data(1),
            &PanelReport::new(121_500, 124_900).encode()[..]
        );
    }

    #[test]
    fn test_rotary_fine_step_with_decimals_key() {
        let mut panel = configured_panel();
        panel.display.pressed = PanelConfig::DEFAULT.panel.decimals_key;
        turn(&mut panel, -4);

        assert_eq!(panel.state().standby(), 122_875);
    }

    #[test]
    fn test_rotary_carry_completes_detent() {
        let mut panel = configured_panel();
        turn(&mut panel, 3);
        let activity = turn(&mut panel, 1);

        assert_eq!(activity.detents, 1);
        assert_eq!(panel.state().standby(), 123_900);
    }

    #[test]
    fn test_swap_key() {
        let mut panel = configured_panel();
        panel.display.key_event = true;
        panel.display.debounced = PanelConfig::DEFAULT.panel.swap_key;

        let activity = panel.poll();

        assert!(activity.swapped);
        assert_eq!(activity.reports_sent, 1);
        assert_eq!(panel.state().active(), 122_900);
        assert_eq!(panel.state().standby(), 121_500);
        assert_eq!(panel.usb.peripheral().triggered(UsbTask::StartEpIn(1)), 1);
        assert_eq!(
            panel.usb.peripheral().in_data(1),
            &PanelReport::new(122_900, 121_500).encode()[..]
        );
        assert_eq!(panel.display.shown(ACTIVE_BASE)[2], (2, true));
    }

    #[test]
    fn test_other_key_does_not_swap() {
        let mut panel = configured_panel();
        panel.display.key_event = true;
        panel.display.debounced = 0x01;

        let activity = panel.poll();

        assert!(!activity.swapped);
        // the IRQ is still released
        assert_eq!(panel.display.calls.as_slice(), &[DisplayCall::Debounced]);
        assert!(panel.usb.peripheral().calls.is_empty());
    }

    #[test]
    fn test_host_write_renders_without_echo() {
        let mut panel = configured_panel();
        panel
            .usb
            .peripheral_mut()
            .queue_out(&PanelReport::new(123_450, 456_780).encode());

        let activity = panel.poll();

        assert_eq!(activity.host_write, Some(Ok(PanelReport::new(123_450, 456_780))));
        assert_eq!(panel.state().active(), 123_450);
        assert_eq!(panel.state().standby(), 456_780);
        assert_eq!(panel.display.digit_writes(), 2 * DIGITS);
        assert_eq!(panel.usb.peripheral().triggered(UsbTask::StartEpIn(1)), 0);
        assert_eq!(activity.reports_sent, 0);
    }

    #[test]
    fn test_short_host_write_is_ignored() {
        let mut panel = configured_panel();
        panel.usb.peripheral_mut().queue_out(&[1, 2, 3]);

        let activity = panel.poll();

        assert_eq!(activity.host_write, Some(Err(ReportError::WrongLength(3))));
        assert_eq!(panel.state().active(), 121_500);
        assert_eq!(panel.display.digit_writes(), 0);
    }

    #[test]
    fn test_unknown_request_stalls_and_raises_fault() {
        let mut panel = panel();
        let before = *panel.state();
        panel.usb.peripheral_mut().receive_setup(request(
            Direction::DeviceToHost,
            RequestKind::Vendor,
            0x42,
            0,
        ));

        let activity = panel.poll();

        assert!(matches!(
            activity.control,
            Some(Err(ControlError::UnsupportedRequest(_)))
        ));
        assert!(panel.usb.peripheral().stalled());
        assert_eq!(panel.usb.control_stage(), ControlStage::Stalled);
        assert!(panel.fault.lit);
        assert_eq!(*panel.state(), before);
        assert_eq!(panel.display.digit_writes(), 0);
    }

    #[test]
    fn test_declined_request_does_not_raise_fault() {
        let mut panel = panel();
        let mut qualifier = request(
            Direction::DeviceToHost,
            RequestKind::Standard,
            StandardRequest::GetDescriptor as u8,
            0x0600,
        );
        qualifier.length = 10;
        panel.usb.peripheral_mut().receive_setup(qualifier);

        panel.poll();

        assert!(panel.usb.peripheral().stalled());
        assert!(!panel.fault.lit);
    }

    #[test]
    fn test_status_led_follows_configuration() {
        let mut panel = configured_panel();
        assert!(panel.status.lit);

        panel.usb.peripheral_mut().removed = true;
        let activity = panel.poll();

        assert_eq!(activity.link, Some(LinkChange::Detached));
        assert!(!panel.status.lit);
        assert!(panel.usb.peripheral().calls.contains(&Call::PowerDown));
    }

    #[test]
    fn test_attach_powers_up() {
        let mut panel = panel();
        panel.usb.peripheral_mut().detected = true;

        let activity = panel.poll();

        assert_eq!(activity.link, Some(LinkChange::Attached));
        assert_eq!(panel.usb.peripheral().calls.as_slice(), &[Call::PowerUp]);
    }

    #[test]
    fn test_reports_skipped_while_unconfigured() {
        let mut panel = panel();
        panel.display.key_event = true;
        panel.display.debounced = PanelConfig::DEFAULT.panel.swap_key;

        let activity = panel.poll();

        assert!(activity.swapped);
        assert_eq!(activity.reports_skipped, 1);
        assert!(panel.usb.peripheral().calls.is_empty());
    }

    #[test]
    fn test_priority_order() {
        let mut panel = configured_panel();
        panel
            .usb
            .peripheral_mut()
            .queue_out(&PanelReport::new(100_000, 200_000).encode());
        panel.display.key_event = true;
        panel.display.debounced = PanelConfig::DEFAULT.panel.swap_key;

        let activity = turn(&mut panel, 4);

        // host write, then swap, then one coarse detent on the new standby
        assert!(activity.host_write.is_some());
        assert!(activity.swapped);
        assert_eq!(activity.reports_sent, 2);
        assert_eq!(panel.state().active(), 200_000);
        assert_eq!(panel.state().standby(), 101_000);
    }
}
