use std::path::Path;

use crate::display::DisplayInfo;
use crate::input::InputDeviceInfo;
use crate::{HostHandle, Rect, WindowExtent};

/// Receiver of everything the bridge forwards to the native core.
///
/// Deliveries are fire-and-forget and arrive in the order the platform
/// produced them. An implementation must tolerate any method being called
/// zero or many times per session. The bridge never calls a gateway with a
/// null [`HostHandle`].
pub trait BridgeGateway {
    /// The usable content rectangle or the window size changed.
    fn on_content_rect_changed(&mut self, handle: HostHandle, rect: Rect, window: WindowExtent);

    /// A secondary storage volume was found at `path`.
    fn volume_enumerated(&mut self, handle: HostHandle, path: &Path, display_name: &str);

    fn display_enumerated(&mut self, _handle: HostHandle, _display: &DisplayInfo) {}

    fn input_device_enumerated(&mut self, _handle: HostHandle, _device: &InputDeviceInfo) {}

    /// The user picked a directory tree that resolved to `path`.
    fn document_tree_opened(&mut self, _handle: HostHandle, _path: &Path) {}
}

impl<G: BridgeGateway + ?Sized> BridgeGateway for &mut G {
    fn on_content_rect_changed(&mut self, handle: HostHandle, rect: Rect, window: WindowExtent) {
        (**self).on_content_rect_changed(handle, rect, window)
    }

    fn volume_enumerated(&mut self, handle: HostHandle, path: &Path, display_name: &str) {
        (**self).volume_enumerated(handle, path, display_name)
    }

    fn display_enumerated(&mut self, handle: HostHandle, display: &DisplayInfo) {
        (**self).display_enumerated(handle, display)
    }

    fn input_device_enumerated(&mut self, handle: HostHandle, device: &InputDeviceInfo) {
        (**self).input_device_enumerated(handle, device)
    }

    fn document_tree_opened(&mut self, handle: HostHandle, path: &Path) {
        (**self).document_tree_opened(handle, path)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::PathBuf;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Delivery {
        ContentRect(HostHandle, Rect, WindowExtent),
        Volume(HostHandle, PathBuf, String),
        Display(HostHandle, DisplayInfo),
        InputDevice(HostHandle, InputDeviceInfo),
        DocumentTree(HostHandle, PathBuf),
    }

    /// Gateway that just remembers what it was given.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingGateway {
        pub deliveries: Vec<Delivery>,
    }

    impl BridgeGateway for RecordingGateway {
        fn on_content_rect_changed(&mut self, handle: HostHandle, rect: Rect, window: WindowExtent) {
            self.deliveries
                .push(Delivery::ContentRect(handle, rect, window));
        }

        fn volume_enumerated(&mut self, handle: HostHandle, path: &Path, display_name: &str) {
            self.deliveries.push(Delivery::Volume(
                handle,
                path.to_path_buf(),
                display_name.to_owned(),
            ));
        }

        fn display_enumerated(&mut self, handle: HostHandle, display: &DisplayInfo) {
            self.deliveries
                .push(Delivery::Display(handle, display.clone()));
        }

        fn input_device_enumerated(&mut self, handle: HostHandle, device: &InputDeviceInfo) {
            self.deliveries
                .push(Delivery::InputDevice(handle, device.clone()));
        }

        fn document_tree_opened(&mut self, handle: HostHandle, path: &Path) {
            self.deliveries
                .push(Delivery::DocumentTree(handle, path.to_path_buf()));
        }
    }
}
