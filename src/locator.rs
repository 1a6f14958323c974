use tracing::{debug, trace};

use crate::device::UsbNode;
use crate::devices::DeviceId;

/// Finds the first device attached under the `root` hub whose vendor and product ID match.
///
/// `root` itself is not a candidate. Devices are visited depth first, each one before its
/// children, children in the order the USB stack listed them. Only hubs are descended into. An
/// explicit stack is used so deep hub chains cannot overflow the call stack.
pub fn find_device<N: UsbNode>(root: &N, vid: u16, pid: u16) -> Option<&N> {
    let target = DeviceId::new(vid, pid);
    let mut pending: Vec<&N> = root.children().iter().rev().collect();

    while let Some(node) = pending.pop() {
        trace!(
            "Visiting {:04x}:{:04x} (hub: {}).",
            node.vendor_id(),
            node.product_id(),
            node.is_hub()
        );

        if target.matches(node.vendor_id(), node.product_id()) {
            debug!("Found {}.", target);
            return Some(node);
        }

        if node.is_hub() {
            pending.extend(node.children().iter().rev());
        }
    }

    debug!("{} is not attached.", target);
    None
}

/// [`find_device`] taking a [`DeviceId`].
pub fn find_device_by_id<N: UsbNode>(root: &N, id: DeviceId) -> Option<&N> {
    find_device(root, id.vid, id.pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Node {
        name: &'static str,
        vid: u16,
        pid: u16,
        children: Vec<Node>,
    }

    impl UsbNode for Node {
        fn vendor_id(&self) -> u16 {
            self.vid
        }

        fn product_id(&self) -> u16 {
            self.pid
        }

        fn is_hub(&self) -> bool {
            !self.children.is_empty() || self.name.starts_with("hub")
        }

        fn children(&self) -> &[Node] {
            &self.children
        }
    }

    fn device(name: &'static str, vid: u16, pid: u16) -> Node {
        Node {
            name,
            vid,
            pid,
            children: vec![],
        }
    }

    fn hub(name: &'static str, children: Vec<Node>) -> Node {
        Node {
            name,
            vid: 0x1d6b,
            pid: 0x0002,
            children,
        }
    }

    #[test]
    fn missing_device_is_none_at_any_depth() {
        let root = hub(
            "hub-root",
            vec![
                device("mouse", 0x046d, 0xc077),
                hub(
                    "hub-a",
                    vec![hub("hub-b", vec![hub("hub-c", vec![device("kbd", 1, 2)])])],
                ),
                hub("hub-empty", vec![]),
            ],
        );
        assert!(find_device(&root, 0x1388, 0x1388).is_none());
    }

    #[test]
    fn finds_device_behind_two_hubs() {
        let root = hub(
            "hub-root",
            vec![
                device("mouse", 0x046d, 0xc077),
                hub(
                    "hub-a",
                    vec![hub("hub-b", vec![device("scanner", 0x1388, 0x1388)])],
                ),
            ],
        );
        let found = find_device(&root, 0x1388, 0x1388).unwrap();
        assert_eq!(found.name, "scanner");
    }

    #[test]
    fn first_pre_order_match_wins() {
        // The scanner nested under the first hub comes before its sibling in pre-order.
        let root = hub(
            "hub-root",
            vec![
                hub("hub-a", vec![device("nested", 0x1388, 0x1388)]),
                device("sibling", 0x1388, 0x1388),
            ],
        );
        assert_eq!(find_device(&root, 0x1388, 0x1388).unwrap().name, "nested");

        let root = hub(
            "hub-root",
            vec![
                device("first", 0x1388, 0x1388),
                device("second", 0x1388, 0x1388),
            ],
        );
        assert_eq!(find_device(&root, 0x1388, 0x1388).unwrap().name, "first");
    }

    #[test]
    fn hub_itself_can_match_before_its_children() {
        let mut matching_hub = hub("hub-scanner", vec![device("inner", 0x1388, 0x1388)]);
        matching_hub.vid = 0x1388;
        matching_hub.pid = 0x1388;
        let root = hub("hub-root", vec![matching_hub]);
        assert_eq!(
            find_device(&root, 0x1388, 0x1388).unwrap().name,
            "hub-scanner"
        );
    }

    #[test]
    fn root_is_not_a_candidate() {
        let mut root = hub("hub-root", vec![device("mouse", 0x046d, 0xc077)]);
        root.vid = 0;
        root.pid = 0;
        assert!(find_device(&root, 0, 0).is_none());

        root.children.push(device("zero", 0, 0));
        assert_eq!(find_device(&root, 0, 0).unwrap().name, "zero");
    }

    #[test]
    fn both_ids_must_match() {
        let root = hub(
            "hub-root",
            vec![device("vid-only", 0x1388, 0x0001), device("pid-only", 0x0001, 0x1388)],
        );
        assert!(find_device_by_id(&root, DeviceId::new(0x1388, 0x1388)).is_none());
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let mut node = device("scanner", 0x1388, 0x1388);
        for _ in 0..1_000 {
            node = hub("hub", vec![node]);
        }
        assert_eq!(find_device(&node, 0x1388, 0x1388).unwrap().name, "scanner");
    }
}
