use std::time::Duration;

/// Vendor ID of the supported barcode scanner.
pub const SCANNER_VID: u16 = 0x1388;

/// Product ID of the supported barcode scanner.
pub const SCANNER_PID: u16 = 0x1388;

/// Index of the HID interface within the scanner's active configuration.
pub const SCANNER_INTERFACE: u8 = 0;

/// Index (not address) of the interrupt IN endpoint within the scanner interface.
pub const SCANNER_ENDPOINT: usize = 0;

/// Size of a boot protocol keyboard input report.
pub const HID_REPORT_SIZE: usize = 8;

/// Modifier byte value the scanner sends for shifted characters.
///
/// Compared for equality, not as a bitmask.
pub const SHIFT_MODIFIER: u8 = 2;

/// USB device class code for hubs.
pub const HUB_CLASS: u8 = 0x09;

/// Transfer timeout handed to libusb. Zero means block until the device answers.
pub const READ_TIMEOUT: Duration = Duration::from_secs(0);
