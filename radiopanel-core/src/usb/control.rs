//! Control endpoint request dispatcher
//!
//! Each SETUP packet is decoded and routed through a fixed decision tree:
//! first on (direction, kind), then on the request code, then on the
//! recipient. Anything that falls off the tree stalls endpoint 0.
//!
//! ```text
//! Standard, host→device   SET_ADDRESS        any        ack (controller latches)
//!                         SET_CONFIGURATION  device     value 1 only
//!                         CLEAR_FEATURE      any        ack
//! Standard, device→host   GET_DESCRIPTOR     device     device/config/string
//!                                            interface  HID report
//! Class,    host→device   SET_IDLE           interface  ack
//! ```

use radiopanel_hal::{EndpointDirection, UsbPeripheral, UsbTask};
use radiopanel_protocol::descriptor::{CONFIGURATION_VALUE, REPORT_ENDPOINT};
use radiopanel_protocol::{
    DescriptorTable, DescriptorType, Direction, HidRequest, Recipient, RequestKind, SetupPacket,
    StandardRequest,
};

use super::endpoints;

/// Progress of the current control transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlStage {
    /// No transfer in progress
    Idle,
    /// SETUP packet decoded, handler not yet run
    SetupDecoded,
    /// IN data stage in flight
    DataStage,
    /// Status stage in flight
    StatusStage,
    /// Endpoint 0 stalled until the next SETUP
    Stalled,
}

/// Events that move a control transfer forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlEvent {
    /// A SETUP packet arrived
    Setup,
    /// Reply data handed to the controller
    Data,
    /// Status stage started
    Status,
    /// Transfer finished
    Complete,
    /// No handler accepted the request
    Stall,
}

impl ControlStage {
    /// Next stage after `event`
    ///
    /// A SETUP packet always starts a new transfer, whatever came before;
    /// any event that does not fit the current stage leaves it unchanged.
    pub fn transition(self, event: ControlEvent) -> Self {
        use ControlEvent as E;
        use ControlStage as S;

        match (self, event) {
            (_, E::Setup) => S::SetupDecoded,
            (S::SetupDecoded, E::Data) => S::DataStage,
            (S::SetupDecoded | S::DataStage, E::Status) => S::StatusStage,
            (S::StatusStage, E::Complete) => S::Idle,
            (S::SetupDecoded, E::Stall) => S::Stalled,
            (stage, _) => stage,
        }
    }
}

/// Request successfully handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlAction {
    /// SET_ADDRESS, completed by the controller
    AddressSet,
    /// SET_CONFIGURATION(1)
    Configured,
    /// CLEAR_FEATURE
    FeatureCleared,
    /// GET_DESCRIPTOR; bytes actually sent
    DescriptorSent(DescriptorType, usize),
    /// HID SET_IDLE
    IdleSet,
}

/// Result of a request that is not a protocol violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlOutcome {
    Handled(ControlAction),
    /// Deliberately stalled: a descriptor the device does not provide
    Declined(DescriptorType),
}

/// Protocol violations; the request is stalled and the fault shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// No handler for this (direction, kind, request) combination
    UnsupportedRequest(SetupPacket),
    /// The request exists but not for this recipient
    UnsupportedRecipient(SetupPacket),
    /// Unknown descriptor type
    UnsupportedDescriptor(u8),
    /// Known descriptor type, index out of range
    UnsupportedDescriptorIndex(DescriptorType, u8),
    /// SET_CONFIGURATION with a value other than 1
    InvalidConfiguration(u16),
}

/// Routes SETUP packets and tracks the device configuration
pub struct ControlDispatcher {
    descriptors: &'static DescriptorTable,
    stage: ControlStage,
    configured: bool,
}

impl ControlDispatcher {
    pub fn new(descriptors: &'static DescriptorTable) -> Self {
        Self {
            descriptors,
            stage: ControlStage::Idle,
            configured: false,
        }
    }

    pub fn stage(&self) -> ControlStage {
        self.stage
    }

    /// Whether the host has selected the configuration
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Forget the configuration after a bus detach or re-attach
    pub fn reset(&mut self) {
        self.stage = ControlStage::Idle;
        self.configured = false;
    }

    /// Handle the SETUP packet latched by `usb`
    ///
    /// Both a declined request and an error stall endpoint 0.
    pub fn dispatch<U: UsbPeripheral>(
        &mut self,
        usb: &mut U,
    ) -> Result<ControlOutcome, ControlError> {
        let setup = SetupPacket::parse(&usb.setup_packet());
        self.advance(ControlEvent::Setup);

        let result = self.route(usb, &setup);
        match result {
            Ok(ControlOutcome::Handled(_)) => {
                self.advance(ControlEvent::Status);
                self.advance(ControlEvent::Complete);
            }
            Ok(ControlOutcome::Declined(_)) | Err(_) => {
                usb.trigger(UsbTask::Ep0Stall);
                self.advance(ControlEvent::Stall);
            }
        }
        result
    }

    fn advance(&mut self, event: ControlEvent) {
        self.stage = self.stage.transition(event);
    }

    fn route<U: UsbPeripheral>(
        &mut self,
        usb: &mut U,
        setup: &SetupPacket,
    ) -> Result<ControlOutcome, ControlError> {
        let request_type = setup.request_type;
        match (request_type.direction(), request_type.kind()) {
            (Direction::HostToDevice, RequestKind::Standard) => self.standard_out(usb, setup),
            (Direction::DeviceToHost, RequestKind::Standard) => self.standard_in(usb, setup),
            (Direction::HostToDevice, RequestKind::Class) => Self::class_out(usb, setup),
            _ => Err(ControlError::UnsupportedRequest(*setup)),
        }
    }

    fn standard_out<U: UsbPeripheral>(
        &mut self,
        usb: &mut U,
        setup: &SetupPacket,
    ) -> Result<ControlOutcome, ControlError> {
        match StandardRequest::try_from(setup.request) {
            // the controller answers the status stage and latches the address itself
            Ok(StandardRequest::SetAddress) => Ok(ControlOutcome::Handled(ControlAction::AddressSet)),
            Ok(StandardRequest::SetConfiguration) => match setup.request_type.recipient() {
                Recipient::Device => self.set_configuration(usb, setup.value),
                _ => Err(ControlError::UnsupportedRecipient(*setup)),
            },
            Ok(StandardRequest::ClearFeature) => {
                usb.trigger(UsbTask::Ep0Status);
                Ok(ControlOutcome::Handled(ControlAction::FeatureCleared))
            }
            _ => Err(ControlError::UnsupportedRequest(*setup)),
        }
    }

    fn set_configuration<U: UsbPeripheral>(
        &mut self,
        usb: &mut U,
        value: u16,
    ) -> Result<ControlOutcome, ControlError> {
        if value & 0xFF != u16::from(CONFIGURATION_VALUE) {
            return Err(ControlError::InvalidConfiguration(value));
        }

        usb.trigger(UsbTask::Ep0Status);
        usb.enable_endpoint(REPORT_ENDPOINT, EndpointDirection::In);
        usb.enable_endpoint(REPORT_ENDPOINT, EndpointDirection::Out);
        usb.arm_out(REPORT_ENDPOINT);
        self.configured = true;

        Ok(ControlOutcome::Handled(ControlAction::Configured))
    }

    fn standard_in<U: UsbPeripheral>(
        &mut self,
        usb: &mut U,
        setup: &SetupPacket,
    ) -> Result<ControlOutcome, ControlError> {
        match StandardRequest::try_from(setup.request) {
            Ok(StandardRequest::GetDescriptor) => match setup.request_type.recipient() {
                Recipient::Device => self.device_descriptor(usb, setup),
                Recipient::Interface => self.interface_descriptor(usb, setup),
                _ => Err(ControlError::UnsupportedRecipient(*setup)),
            },
            _ => Err(ControlError::UnsupportedRequest(*setup)),
        }
    }

    fn device_descriptor<U: UsbPeripheral>(
        &mut self,
        usb: &mut U,
        setup: &SetupPacket,
    ) -> Result<ControlOutcome, ControlError> {
        let descriptors = self.descriptors;
        let index = setup.descriptor_index();
        let kind = DescriptorType::try_from(setup.descriptor_type())
            .map_err(ControlError::UnsupportedDescriptor)?;

        let data = match kind {
            DescriptorType::Device => descriptors.device(),
            DescriptorType::Configuration => descriptors
                .configuration(index)
                .ok_or(ControlError::UnsupportedDescriptorIndex(kind, index))?,
            DescriptorType::String => descriptors
                .string(index)
                .ok_or(ControlError::UnsupportedDescriptorIndex(kind, index))?,
            // full-speed only, and the report descriptor belongs to the interface
            DescriptorType::DeviceQualifier | DescriptorType::HidReport => {
                return Ok(ControlOutcome::Declined(kind))
            }
            _ => return Err(ControlError::UnsupportedDescriptor(kind as u8)),
        };

        Ok(self.reply(usb, setup, kind, data))
    }

    fn interface_descriptor<U: UsbPeripheral>(
        &mut self,
        usb: &mut U,
        setup: &SetupPacket,
    ) -> Result<ControlOutcome, ControlError> {
        match DescriptorType::try_from(setup.descriptor_type()) {
            Ok(DescriptorType::HidReport) => {
                let data = self.descriptors.hid_report();
                Ok(self.reply(usb, setup, DescriptorType::HidReport, data))
            }
            Ok(kind) => Err(ControlError::UnsupportedDescriptor(kind as u8)),
            Err(code) => Err(ControlError::UnsupportedDescriptor(code)),
        }
    }

    fn class_out<U: UsbPeripheral>(
        usb: &mut U,
        setup: &SetupPacket,
    ) -> Result<ControlOutcome, ControlError> {
        match (
            HidRequest::try_from(setup.request),
            setup.request_type.recipient(),
        ) {
            // idle rate is not tracked
            (Ok(HidRequest::SetIdle), Recipient::Interface) => {
                usb.trigger(UsbTask::Ep0Status);
                Ok(ControlOutcome::Handled(ControlAction::IdleSet))
            }
            _ => Err(ControlError::UnsupportedRequest(*setup)),
        }
    }

    /// Send at most `wLength` bytes of `data`
    fn reply<U: UsbPeripheral>(
        &mut self,
        usb: &mut U,
        setup: &SetupPacket,
        kind: DescriptorType,
        data: &[u8],
    ) -> ControlOutcome {
        let len = data.len().min(usize::from(setup.length));
        self.advance(ControlEvent::Data);
        let sent = endpoints::send(usb, 0, &data[..len]);
        ControlOutcome::Handled(ControlAction::DescriptorSent(kind, sent))
    }
}
