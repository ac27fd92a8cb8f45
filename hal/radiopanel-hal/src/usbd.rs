//! USB device controller abstraction
//!
//! Models an EasyDMA-style device controller: each endpoint transfer is
//! staged into a RAM buffer, started by a task, and completes by raising
//! events in a fixed order. Transfer sequencing lives in the core crate;
//! implementations only expose the individual tasks and events.

/// Endpoint direction, seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointDirection {
    /// Device to host
    In,
    /// Host to device
    Out,
}

/// Tasks the controller can be asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbTask {
    /// Start the DMA transfer staged for an IN endpoint
    StartEpIn(u8),
    /// Start the DMA transfer out of an OUT endpoint buffer
    StartEpOut(u8),
    /// Complete the status stage of a control transfer
    Ep0Status,
    /// Stall the control endpoint
    Ep0Stall,
}

/// Completion events raised by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbEvent {
    /// A DMA transfer has captured its buffer pointer and length
    Started,
    /// DMA into the IN endpoint buffer has finished
    EndEpIn(u8),
    /// DMA out of the OUT endpoint buffer has finished
    EndEpOut(u8),
    /// The data stage of a control transfer has been acknowledged
    Ep0DataDone,
}

/// Register-level USB device peripheral
pub trait UsbPeripheral {
    /// Consume the "VBUS detected" flag
    fn take_detected(&mut self) -> bool;

    /// Consume the "VBUS removed" flag
    fn take_removed(&mut self) -> bool;

    /// Consume the "SETUP packet received on endpoint 0" flag
    fn take_setup(&mut self) -> bool;

    /// Consume the "data received on the OUT endpoint" flag
    fn take_data_out(&mut self) -> bool;

    /// Run the controller's power-up sequence and connect to the bus
    ///
    /// Blocks until the controller, USB supply and high-frequency clock are
    /// all ready.
    fn power_up(&mut self);

    /// Disconnect from the bus and disable the controller
    ///
    /// Leaves the controller ready for a fresh [`power_up`](Self::power_up)
    /// on the next attach.
    fn power_down(&mut self);

    /// The raw 8-byte SETUP packet latched by the controller
    fn setup_packet(&self) -> [u8; 8];

    /// Copy `data` into the DMA buffer of IN endpoint `ep`
    ///
    /// Returns the number of bytes staged, which is capped by the buffer
    /// size.
    fn stage_in(&mut self, ep: u8, data: &[u8]) -> usize;

    /// Point the DMA engine of OUT endpoint `ep` at its receive buffer
    fn stage_out(&mut self, ep: u8);

    /// Copy the last DMA transfer out of OUT endpoint `ep` into `buf`
    ///
    /// Returns the number of bytes copied.
    fn read_out(&mut self, ep: u8, buf: &mut [u8]) -> usize;

    /// Trigger a task
    fn trigger(&mut self, task: UsbTask);

    /// Check and clear an event
    fn take_event(&mut self, event: UsbEvent) -> bool;

    /// Enable a data endpoint
    fn enable_endpoint(&mut self, ep: u8, direction: EndpointDirection);

    /// Allow OUT endpoint `ep` to accept the next packet from the host
    fn arm_out(&mut self, ep: u8);
}
