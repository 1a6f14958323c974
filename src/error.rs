use derive_more::{Display, Error, From};

use crate::devices::DeviceId;

/// Everything that can end a scan attempt.
#[derive(Debug, Display, Error, From)]
pub enum ScanError {
    /// No node of the USB tree carries the requested IDs.
    #[display(fmt = "Scanner not found")]
    #[from(ignore)]
    DeviceNotFound(#[error(not(source))] DeviceId),

    /// libusb reported a failure while enumerating, claiming, opening or reading.
    #[display(fmt = "{}", _0)]
    Transport(rusb::Error),

    /// The active configuration has no interface at this index.
    #[display(fmt = "Interface {} not found in the active configuration", index)]
    #[from(ignore)]
    NoInterface { index: u8 },

    /// The interface has no endpoint at this index.
    #[display(fmt = "Endpoint {} not found on interface {}", index, interface)]
    #[from(ignore)]
    NoEndpoint { interface: u8, index: usize },

    /// A transfer completed with fewer bytes than a full report.
    #[display(fmt = "Short read: expected {} bytes, got {}", expected, len)]
    #[from(ignore)]
    ShortRead { expected: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, ScanError>;
