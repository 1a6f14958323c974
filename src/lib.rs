//! Reads one line of text from a USB HID barcode scanner.
//!
//! The scanner behaves like a boot protocol keyboard: every keystroke arrives as an 8-byte input
//! report on its interrupt endpoint. The crate finds the scanner in the USB device tree
//! ([`locator`]), takes the HID interface away from the kernel driver, reads reports until the
//! newline key and turns them into text ([`decoder`], [`session`]).
//!
//! The USB stack is reached through the traits in [`device`]; [`device::usb`] implements them on
//! top of libusb.

pub mod constants;
pub mod decoder;
pub mod device;
pub mod devices;
pub mod error;
pub mod locator;
pub mod session;
pub mod tools;

pub use crate::decoder::{decode, HidReport};
pub use crate::devices::DeviceId;
pub use crate::error::{Result, ScanError};
pub use crate::locator::find_device;
pub use crate::session::{find_and_scan, read_line, run, scan};
