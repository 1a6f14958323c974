use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::device::UsbNode;

/// Initializes the global logging facility.
///
/// If `RUST_LOG` is not set, this function will set the global default logging level to `info`,
/// and for `scanner_usb` it will set the `debug` logging level.
///
/// Log messages are formatted by `tracing_subscriber::FmtSubscriber` and printed to standard
/// error, leaving standard output to the scanned line.
///
/// # Panics
///
/// Panics if the initialization was unsuccessful, likely because a global subscriber was already
/// installed by another call to try_init.
pub fn initialize_logging(json_output: bool) {
    // set default logging levels:
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info,scanner_usb=debug");
    }
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json_output {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Renders the tree under `root` one node per line, indented by depth, in search order.
pub fn describe_tree<N: UsbNode>(root: &N) -> String {
    let mut out = String::new();
    let mut pending = vec![(root, 0usize)];

    while let Some((node, depth)) = pending.pop() {
        out.push_str(&format!(
            "{:indent$}{:04x}:{:04x}{}\n",
            "",
            node.vendor_id(),
            node.product_id(),
            if node.is_hub() { " hub" } else { "" },
            indent = depth * 2
        ));
        pending.extend(node.children().iter().rev().map(|child| (child, depth + 1)));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node(u16, u16, Vec<Node>);

    impl UsbNode for Node {
        fn vendor_id(&self) -> u16 {
            self.0
        }

        fn product_id(&self) -> u16 {
            self.1
        }

        fn is_hub(&self) -> bool {
            !self.2.is_empty()
        }

        fn children(&self) -> &[Node] {
            &self.2
        }
    }

    #[test]
    fn tree_is_indented_in_pre_order() {
        let root = Node(
            0,
            0,
            vec![
                Node(0x1d6b, 0x0002, vec![Node(0x1388, 0x1388, vec![])]),
                Node(0x046d, 0xc077, vec![]),
            ],
        );
        assert_eq!(
            describe_tree(&root),
            "0000:0000 hub\n  1d6b:0002 hub\n    1388:1388\n  046d:c077\n"
        );
    }
}
