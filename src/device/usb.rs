use std::collections::HashSet;
use std::fmt::{Debug, Display, Error, Formatter};

use rusb::{
    Context, Device, DeviceHandle, Direction, Speed, SyncType, TransferType, UsageType, UsbContext,
};
use tracing::{debug, error, info, warn};

use crate::constants::{HID_REPORT_SIZE, HUB_CLASS, READ_TIMEOUT};
use crate::device::{ReportPipe, ScannerDevice, ScannerInterface, UsbHost, UsbNode};
use crate::error::{Result, ScanError};

/// Bus number and address, unique among attached devices.
type BusAddress = (u8, u8);

fn bus_address<T: UsbContext>(device: &Device<T>) -> BusAddress {
    (device.bus_number(), device.address())
}

/// Convert to USB speed standard to human readable value.
pub fn speed_as_str(speed: &Speed) -> &'static str {
    match speed {
        Speed::Low => "1.5 Mbps",
        Speed::Full => "12 Mbps",
        Speed::High => "480 Mbps",
        Speed::Super => "5000 Mbps",
        _ => "(unknown)",
    }
}

/// libusb backed [`UsbHost`].
pub struct UsbHostContext {
    context: Context,
}

impl Debug for UsbHostContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(f, "UsbHostContext")
    }
}

impl UsbHostContext {
    /// Initializes libusb.
    #[tracing::instrument]
    pub fn new() -> Result<Self> {
        debug!("Initializing libusb.");
        let context = Context::new()?;
        Ok(UsbHostContext { context })
    }
}

impl UsbHost for UsbHostContext {
    type Node = UsbDeviceNode;

    /// libusb lists devices flat. The tree is rebuilt from parent links under a virtual root
    /// whose children are the root hubs of every bus.
    fn root(&self) -> Result<UsbDeviceNode> {
        let devices: Vec<Device<Context>> = self.context.devices()?.iter().collect();
        info!("Enumerated {} USB devices.", devices.len());

        let present: HashSet<BusAddress> = devices.iter().map(bus_address).collect();
        let parents: Vec<Option<BusAddress>> = devices
            .iter()
            .map(|device| {
                device
                    .get_parent()
                    .map(|parent| bus_address(&parent))
                    .filter(|parent| present.contains(parent))
            })
            .collect();

        Ok(UsbDeviceNode {
            device: None,
            vendor_id: 0,
            product_id: 0,
            class_code: HUB_CLASS,
            children: attached_to(None, &devices, &parents),
        })
    }
}

/// Builds the nodes whose parent is `parent`, keeping libusb's listing order.
fn attached_to(
    parent: Option<BusAddress>,
    devices: &[Device<Context>],
    parents: &[Option<BusAddress>],
) -> Vec<UsbDeviceNode> {
    let mut nodes = vec![];

    for (device, device_parent) in devices.iter().zip(parents) {
        if *device_parent != parent {
            continue;
        }

        let device_desc = match device.device_descriptor() {
            Ok(d) => d,
            Err(e) => {
                info!("Skipping a device because we failed to get the device descriptor.");
                error!("Failed to get device descriptor: {}", e);
                continue;
            }
        };

        nodes.push(UsbDeviceNode {
            device: Some(device.clone()),
            vendor_id: device_desc.vendor_id(),
            product_id: device_desc.product_id(),
            class_code: device_desc.class_code(),
            children: attached_to(Some(bus_address(device)), devices, parents),
        });
    }

    nodes
}

/// A device in the USB tree.
pub struct UsbDeviceNode {
    /// `None` for the virtual root.
    device: Option<Device<Context>>,
    vendor_id: u16,
    product_id: u16,
    class_code: u8,
    children: Vec<UsbDeviceNode>,
}

impl Display for UsbDeviceNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        match &self.device {
            Some(device) => write!(
                f,
                "Bus {:03} Device {:03}: ID {:04x}:{:04x} {}",
                device.bus_number(),
                device.address(),
                self.vendor_id,
                self.product_id,
                speed_as_str(&device.speed())
            ),
            None => write!(f, "Root"),
        }
    }
}

impl Debug for UsbDeviceNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(
            f,
            "UsbDeviceNode {{ {}, children: {} }}",
            self,
            self.children.len()
        )
    }
}

impl UsbNode for UsbDeviceNode {
    fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    fn product_id(&self) -> u16 {
        self.product_id
    }

    fn is_hub(&self) -> bool {
        self.class_code == HUB_CLASS
    }

    fn children(&self) -> &[UsbDeviceNode] {
        &self.children
    }
}

impl ScannerDevice for UsbDeviceNode {
    type Interface = UsbInterface;

    /// Opens the device and describes interface `index` of its active configuration, alternate
    /// setting 0.
    #[tracing::instrument]
    fn interface(&self, index: u8) -> Result<UsbInterface> {
        let device = self
            .device
            .as_ref()
            .ok_or(ScanError::NoInterface { index })?;

        let config = device.active_config_descriptor()?;
        let interface = config
            .interfaces()
            .nth(usize::from(index))
            .ok_or(ScanError::NoInterface { index })?;
        let number = interface.number();

        let endpoints: Vec<Endpoint> = interface
            .descriptors()
            .find(|d| d.setting_number() == 0)
            .map(|desc| {
                desc.endpoint_descriptors()
                    .map(|ep| Endpoint {
                        config: config.number(),
                        iface: desc.interface_number(),
                        number: ep.number(),
                        setting: desc.setting_number(),
                        address: ep.address(),
                        direction: ep.direction(),
                        transfer_type: ep.transfer_type(),
                        sync_type: ep.sync_type(),
                        usage_type: ep.usage_type(),
                        max_packet_size: ep.max_packet_size(),
                        b_interval: ep.interval(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        for endpoint in &endpoints {
            debug!("Interface {} has {}.", number, endpoint);
        }

        let handle = device.open()?;

        Ok(UsbInterface {
            handle,
            number,
            endpoints,
            kernel_driver_detached: false,
        })
    }
}

/// A USB device endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// The endpoint's configuration descriptor.
    config: u8,
    iface: u8,
    /// The endpoint number.
    number: u8,
    setting: u8,
    /// The endpoint's address.
    address: u8,
    /// The endpoint's direction.
    direction: Direction,
    /// The endpoint's transfer type.
    transfer_type: TransferType,
    /// The endpoint's synchronisation mode. This is only valid for isochronous endpoints.
    sync_type: SyncType,
    /// The endpoint's usage type. This is only valid for isochronous endpoints.
    usage_type: UsageType,
    /// The endpoint's maximum packet size.
    max_packet_size: u16,
    /// The endpoint's polling interval.
    b_interval: u8,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(
            f,
            "Endpoint Address {:#04x} EP {} {:?} {:?} {:?} {:?} (config {}, interface {}, setting {}, max packet {}, interval {})",
            self.address,
            self.number,
            self.direction,
            self.transfer_type,
            self.sync_type,
            self.usage_type,
            self.config,
            self.iface,
            self.setting,
            self.max_packet_size,
            self.b_interval
        )
    }
}

/// Handle operations used to take an interface from the kernel and give it back.
trait InterfaceControl {
    fn kernel_driver_active(&self, iface: u8) -> rusb::Result<bool>;
    fn detach_kernel_driver(&mut self, iface: u8) -> rusb::Result<()>;
    fn attach_kernel_driver(&mut self, iface: u8) -> rusb::Result<()>;
    fn claim_interface(&mut self, iface: u8) -> rusb::Result<()>;
    fn release_interface(&mut self, iface: u8) -> rusb::Result<()>;
}

impl<T: UsbContext> InterfaceControl for DeviceHandle<T> {
    fn kernel_driver_active(&self, iface: u8) -> rusb::Result<bool> {
        DeviceHandle::kernel_driver_active(self, iface)
    }

    fn detach_kernel_driver(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::detach_kernel_driver(self, iface)
    }

    fn attach_kernel_driver(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::attach_kernel_driver(self, iface)
    }

    fn claim_interface(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::claim_interface(self, iface)
    }

    fn release_interface(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::release_interface(self, iface)
    }
}

/// Claims `iface`, detaching a bound kernel driver first. Returns whether a driver was detached.
///
/// A failed claim reattaches the driver before returning, so the kernel keeps the device.
fn claim_detaching<H: InterfaceControl>(handle: &mut H, iface: u8) -> Result<bool> {
    let detached = match handle.kernel_driver_active(iface) {
        Ok(true) => {
            debug!("Detaching kernel driver from interface {}.", iface);
            handle.detach_kernel_driver(iface)?;
            true
        }
        Ok(false) => {
            debug!("No kernel driver active on interface {}.", iface);
            false
        }
        Err(e) => {
            debug!(
                "Could not check kernel driver status for interface {}: {}",
                iface, e
            );
            false
        }
    };

    if let Err(e) = handle.claim_interface(iface) {
        warn!("Failed to claim interface {}: {}", iface, e);
        if detached {
            reattach(handle, iface);
        }
        return Err(e.into());
    }

    info!("Claimed interface {}.", iface);
    Ok(detached)
}

/// Releases `iface` and reattaches the kernel driver if `detached`, even when the release fails.
fn release_reattaching<H: InterfaceControl>(
    handle: &mut H,
    iface: u8,
    detached: bool,
) -> Result<()> {
    let released = handle.release_interface(iface);
    match &released {
        Ok(()) => info!("Released interface {}.", iface),
        Err(e) => warn!("Failed to release interface {}: {}", iface, e),
    }

    if detached {
        reattach(handle, iface);
    }

    released.map_err(ScanError::from)
}

fn reattach<H: InterfaceControl>(handle: &mut H, iface: u8) {
    if let Err(e) = handle.attach_kernel_driver(iface) {
        warn!(
            "Could not reattach kernel driver to interface {}: {}",
            iface, e
        );
    } else {
        debug!("Reattached kernel driver to interface {}.", iface);
    }
}

/// An interface of an opened device.
pub struct UsbInterface {
    handle: DeviceHandle<Context>,
    number: u8,
    endpoints: Vec<Endpoint>,
    kernel_driver_detached: bool,
}

impl Debug for UsbInterface {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(
            f,
            "UsbInterface {{ number: {}, endpoints: {:?} }}",
            self.number, self.endpoints
        )
    }
}

impl ScannerInterface for UsbInterface {
    type Pipe<'a> = UsbPipe<'a>;

    fn claim(&mut self) -> Result<()> {
        self.kernel_driver_detached = claim_detaching(&mut self.handle, self.number)?;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        let detached = std::mem::replace(&mut self.kernel_driver_detached, false);
        release_reattaching(&mut self.handle, self.number, detached)
    }

    fn open_pipe(&mut self, index: usize) -> Result<UsbPipe<'_>> {
        let endpoint = self
            .endpoints
            .get(index)
            .cloned()
            .ok_or(ScanError::NoEndpoint {
                interface: self.number,
                index,
            })?;

        if endpoint.direction != Direction::In {
            warn!("{} is not an IN endpoint, reads will fail.", endpoint);
        }

        debug!("Opened pipe to {}.", endpoint);

        Ok(UsbPipe {
            handle: &self.handle,
            endpoint,
            open: true,
        })
    }
}

/// Pipe to one endpoint of a claimed [`UsbInterface`].
pub struct UsbPipe<'a> {
    handle: &'a DeviceHandle<Context>,
    endpoint: Endpoint,
    open: bool,
}

impl ReportPipe for UsbPipe<'_> {
    fn read_report(&mut self, buf: &mut [u8; HID_REPORT_SIZE]) -> Result<()> {
        if !self.open {
            return Err(ScanError::Transport(rusb::Error::InvalidParam));
        }

        let address = self.endpoint.address;
        let len = match self.endpoint.transfer_type {
            TransferType::Interrupt => {
                self.handle
                    .read_interrupt(address, &mut buf[..], READ_TIMEOUT)?
            }
            TransferType::Bulk => self.handle.read_bulk(address, &mut buf[..], READ_TIMEOUT)?,
            other => {
                error!("Cannot read reports from a {:?} endpoint.", other);
                return Err(ScanError::Transport(rusb::Error::NotSupported));
            }
        };

        if len < HID_REPORT_SIZE {
            return Err(ScanError::ShortRead {
                expected: HID_REPORT_SIZE,
                len,
            });
        }

        Ok(())
    }

    /// libusb keeps no per-endpoint state, so closing only stops further reads.
    fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            debug!("Closed pipe to {}.", self.endpoint);
        }
        Ok(())
    }
}
