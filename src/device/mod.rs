//! Capabilities the scanner code needs from a USB host stack.
//!
//! [`usb`] implements them with libusb. Tests implement them in memory.

use crate::constants::HID_REPORT_SIZE;
use crate::error::Result;

pub mod usb;

/// A device or hub in the USB tree. Read only.
pub trait UsbNode {
    fn vendor_id(&self) -> u16;

    fn product_id(&self) -> u16;

    fn is_hub(&self) -> bool;

    /// Attached devices, in the order the host stack reports them. Empty for non-hubs.
    fn children(&self) -> &[Self]
    where
        Self: Sized;
}

/// Entry point to a USB host stack.
pub trait UsbHost {
    type Node: UsbNode;

    /// Enumerates the attached devices and returns the root of the tree.
    fn root(&self) -> Result<Self::Node>;
}

/// A device whose interfaces can be opened.
pub trait ScannerDevice {
    type Interface: ScannerInterface;

    /// Returns interface `index` of the active configuration.
    fn interface(&self, index: u8) -> Result<Self::Interface>;
}

/// One interface of an opened device.
pub trait ScannerInterface {
    type Pipe<'a>: ReportPipe
    where
        Self: 'a;

    /// Takes the interface for exclusive use, detaching the kernel driver if one is bound.
    fn claim(&mut self) -> Result<()>;

    /// Gives the interface back, reattaching the kernel driver that [`claim`](Self::claim)
    /// detached.
    fn release(&mut self) -> Result<()>;

    /// Opens a pipe to endpoint `index` (position in the interface's endpoint list).
    fn open_pipe(&mut self, index: usize) -> Result<Self::Pipe<'_>>;
}

/// An open pipe to an IN endpoint delivering HID reports.
pub trait ReportPipe {
    /// Blocks until the device sends a full report.
    fn read_report(&mut self, buf: &mut [u8; HID_REPORT_SIZE]) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}
