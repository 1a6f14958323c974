use tracing::{debug, info, trace};

use scanner_usb::constants::{SCANNER_PID, SCANNER_VID};
use scanner_usb::device::usb::UsbHostContext;
use scanner_usb::device::UsbHost;
use scanner_usb::{session, tools, DeviceId, Result, ScanError};

/// Enumerates the bus once and reads a single line from the scanner.
fn scan_once(target: DeviceId) -> Result<String> {
    let host = UsbHostContext::new()?;
    let root = host.root()?;
    trace!("USB tree:\n{}", tools::describe_tree(&root));
    session::find_and_scan(&root, target)
}

fn main() {
    tools::initialize_logging(false);
    info!("Starting Scanner USB.");

    let target = DeviceId::new(SCANNER_VID, SCANNER_PID);

    match scan_once(target) {
        Ok(line) => println!("{}", line),
        Err(e @ ScanError::DeviceNotFound(_)) => {
            info!("{} not attached.", target);
            println!("{}", e);
        }
        Err(e) => {
            debug!("Scan failed: {:?}", e);
            println!("{}", e);
        }
    }
}
