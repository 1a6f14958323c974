//! One scan: claim the scanner interface, read reports until the newline key, give everything back.

use std::ops::{Deref, DerefMut};

use tracing::{debug, info, trace, warn};

use crate::constants::{HID_REPORT_SIZE, SCANNER_ENDPOINT, SCANNER_INTERFACE};
use crate::decoder::{HidReport, NEWLINE_GLYPH};
use crate::device::{ReportPipe, ScannerDevice, ScannerInterface, UsbHost, UsbNode};
use crate::devices::DeviceId;
use crate::error::{Result, ScanError};
use crate::locator::find_device_by_id;

/// Claimed interface, released when dropped.
pub struct ClaimGuard<'a, I: ScannerInterface> {
    interface: &'a mut I,
}

impl<'a, I: ScannerInterface> ClaimGuard<'a, I> {
    pub fn claim(interface: &'a mut I) -> Result<Self> {
        interface.claim()?;
        Ok(ClaimGuard { interface })
    }
}

impl<I: ScannerInterface> Deref for ClaimGuard<'_, I> {
    type Target = I;

    fn deref(&self) -> &I {
        self.interface
    }
}

impl<I: ScannerInterface> DerefMut for ClaimGuard<'_, I> {
    fn deref_mut(&mut self) -> &mut I {
        self.interface
    }
}

impl<I: ScannerInterface> Drop for ClaimGuard<'_, I> {
    fn drop(&mut self) {
        if let Err(e) = self.interface.release() {
            warn!("Failed to release interface: {}", e);
        }
    }
}

/// Open pipe, closed when dropped.
pub struct PipeGuard<P: ReportPipe> {
    pipe: P,
}

impl<P: ReportPipe> PipeGuard<P> {
    pub fn new(pipe: P) -> Self {
        PipeGuard { pipe }
    }
}

impl<P: ReportPipe> Deref for PipeGuard<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.pipe
    }
}

impl<P: ReportPipe> DerefMut for PipeGuard<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.pipe
    }
}

impl<P: ReportPipe> Drop for PipeGuard<P> {
    fn drop(&mut self) {
        if let Err(e) = self.pipe.close() {
            warn!("Failed to close pipe: {}", e);
        }
    }
}

/// The line being typed by the scanner.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    line: String,
}

impl LineAccumulator {
    pub fn new() -> Self {
        LineAccumulator::default()
    }

    /// Appends `glyph`, or returns `true` without appending when it is the newline terminator.
    pub fn push(&mut self, glyph: &str) -> bool {
        if glyph == NEWLINE_GLYPH {
            return true;
        }
        self.line.push_str(glyph);
        false
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    pub fn finish(self) -> String {
        self.line
    }
}

/// Reads reports from `pipe` until one decodes to a newline and returns the text before it.
///
/// A read error ends the line; whatever was accumulated is dropped.
pub fn read_line<P: ReportPipe + ?Sized>(pipe: &mut P) -> Result<String> {
    let mut line = LineAccumulator::new();

    loop {
        let mut buf = [0u8; HID_REPORT_SIZE];
        pipe.read_report(&mut buf)?;

        let report = HidReport::from(buf);
        let glyph = report.decode();

        if line.push(glyph) {
            let line = line.finish();
            info!("Scanned {:?}.", line);
            return Ok(line);
        }

        trace!(
            idle = report.is_idle(),
            "Received {:02x?} -> {:?}, line so far {:?}",
            buf,
            glyph,
            line.as_str()
        );
    }
}

/// Reads one line from `device`: opens interface `interface`, claims it, opens a pipe to
/// endpoint `endpoint` and reads until the newline key.
///
/// The pipe is closed and the interface released on every path out of this function.
pub fn scan<D: ScannerDevice>(device: &D, interface: u8, endpoint: usize) -> Result<String> {
    let mut iface = device.interface(interface)?;
    let mut claimed = ClaimGuard::claim(&mut iface)?;
    let mut pipe = PipeGuard::new(claimed.open_pipe(endpoint)?);

    debug!("Entering read loop.");
    let line = read_line(&mut *pipe)?;
    Ok(line)
}

/// Finds the scanner `id` attached to `host` and reads one line from it.
#[tracing::instrument(skip(host))]
pub fn run<H>(host: &H, id: DeviceId) -> Result<String>
where
    H: UsbHost,
    H::Node: ScannerDevice,
{
    let root = host.root()?;
    find_and_scan(&root, id)
}

/// Finds the scanner `id` in an already enumerated tree and reads one line from it.
pub fn find_and_scan<N>(root: &N, id: DeviceId) -> Result<String>
where
    N: UsbNode + ScannerDevice,
{
    let scanner = find_device_by_id(root, id).ok_or(ScanError::DeviceNotFound(id))?;
    info!("Connected to {}.", id);

    scan(scanner, SCANNER_INTERFACE, SCANNER_ENDPOINT)
}
