use derive_more::Display;

/// Vendor and product ID pair identifying a USB device.
#[derive(Debug, Display, Eq, PartialEq, Clone, Copy)]
#[display(fmt = "VidPid {{ vid: {:04x?}, pid: {:04x?} }}", vid, pid)]
pub struct DeviceId {
    pub vid: u16,
    pub pid: u16,
}

impl DeviceId {
    pub const fn new(vid: u16, pid: u16) -> Self {
        DeviceId { vid, pid }
    }

    /// True when both IDs equal the given descriptor values.
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vid == vendor_id && self.pid == product_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_ids_as_hex() {
        let id = DeviceId::new(0x1388, 0x0a2f);
        assert_eq!(id.to_string(), "VidPid { vid: 1388, pid: 0a2f }");
    }

    #[test]
    fn matches_requires_both_ids() {
        let id = DeviceId::new(0x1388, 0x1388);
        assert!(id.matches(0x1388, 0x1388));
        assert!(!id.matches(0x1388, 0x1389));
        assert!(!id.matches(0x067e, 0x1388));
    }
}
