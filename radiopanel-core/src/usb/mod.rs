//! USB HID function
//!
//! [`UsbFunction`] owns the device controller and the control-request
//! dispatcher, and exposes the handful of operations the panel loop needs:
//! bus attach and detach, SETUP handling, and report exchange on the
//! interrupt endpoints.

pub mod control;
pub mod endpoints;

#[cfg(test)]
pub(crate) mod mock;

pub use control::{
    ControlAction, ControlDispatcher, ControlError, ControlEvent, ControlOutcome, ControlStage,
};

use radiopanel_hal::UsbPeripheral;
use radiopanel_protocol::{DescriptorTable, PanelReport, ReportError};

/// Device controller plus control-transfer state
pub struct UsbFunction<U> {
    usb: U,
    control: ControlDispatcher,
}

impl<U: UsbPeripheral> UsbFunction<U> {
    pub fn new(usb: U, descriptors: &'static DescriptorTable) -> Self {
        Self {
            usb,
            control: ControlDispatcher::new(descriptors),
        }
    }

    pub fn take_detected(&mut self) -> bool {
        self.usb.take_detected()
    }

    pub fn take_removed(&mut self) -> bool {
        self.usb.take_removed()
    }

    pub fn take_setup(&mut self) -> bool {
        self.usb.take_setup()
    }

    pub fn take_data_out(&mut self) -> bool {
        self.usb.take_data_out()
    }

    /// Bus power detected: power the controller and attach
    ///
    /// Any earlier configuration is forgotten; the host enumerates again.
    pub fn start(&mut self) {
        self.control.reset();
        self.usb.power_up();
    }

    /// Bus power removed: disconnect and disable the controller
    pub fn detach(&mut self) {
        self.control.reset();
        self.usb.power_down();
    }

    /// Dispatch the latched SETUP packet
    pub fn handle_setup(&mut self) -> Result<ControlOutcome, ControlError> {
        self.control.dispatch(&mut self.usb)
    }

    pub fn receive_report(&mut self) -> Result<PanelReport, ReportError> {
        endpoints::receive_report(&mut self.usb)
    }

    /// Send `report` on the interrupt IN endpoint
    ///
    /// Returns `false` without touching the controller while the host has
    /// not configured the device.
    pub fn send_report(&mut self, report: &PanelReport) -> bool {
        if !self.control.is_configured() {
            return false;
        }
        endpoints::send_report(&mut self.usb, report);
        true
    }

    pub fn is_configured(&self) -> bool {
        self.control.is_configured()
    }

    pub fn control_stage(&self) -> ControlStage {
        self.control.stage()
    }

    pub fn peripheral(&self) -> &U {
        &self.usb
    }

    pub fn peripheral_mut(&mut self) -> &mut U {
        &mut self.usb
    }
}
