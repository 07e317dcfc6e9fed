//! Glue between an Android activity's view hierarchy and a native application core.
//!
//! The crate takes the raw, version dependent state that the Android framework
//! hands to an activity (window insets, storage volumes, displays and input
//! devices) and turns it into a small set of calls on a [`BridgeGateway`]:
//!
//! - [`ContentRectReconciler`] derives the usable content rectangle from each
//!   layout pass and only forwards genuine changes.
//! - [`VolumeLocator`] discovers the filesystem path of secondary storage
//!   volumes, using `StorageVolume.getDirectory()` where available and
//!   falling back to scanning the volume's marshalled `Parcel` on older
//!   releases.
//! - [`display::enumerate_displays`] and [`input::enumerate_input_devices`]
//!   forward display and input device descriptions.
//!
//! Everything except the [`android`] module is platform independent; the
//! Android framework is reached through the [`StorageService`],
//! [`display::DisplaySource`] and [`input::InputDeviceSource`] traits, which
//! the [`android`] module implements over JNI.
//!
//! # Threading
//!
//! All entry points are expected to be called from the activity's UI thread.
//! The one piece of process wide state, the [`PathDiscoveryCache`], is an
//! atomic so it stays consistent even if that contract is broken.

use std::fmt;

mod config;
pub use config::{BridgeConfig, PlatformCapabilities, StorageCapability};

mod error;
pub use error::{BridgeError, Result};

mod gateway;
pub use gateway::BridgeGateway;

mod insets;
pub use insets::{
    ContentRectReconciler, InsetSnapshot, Insets, LayoutPass, RawInsets, SystemUiVisibility,
    VisibilityContext,
};

pub mod storage;
pub use storage::{
    EnumeratedVolume, PathDiscoveryCache, StorageService, StorageVolume, VolumeDescriptor,
    VolumeLocator,
};

pub mod display;
pub mod input;

mod util;

#[cfg(target_os = "android")]
#[cfg_attr(docsrs, doc(cfg(target_os = "android")))]
pub mod android;

// Signed components, consistent with Android's `Rect`, since intermediate
// results of inset arithmetic can go negative before they are normalized.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn empty() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Returns a copy with `left <= right` and `top <= bottom`.
    ///
    /// Insets larger than the window would otherwise push the far edges past
    /// the near ones; those edges are clamped onto the near edge, giving an
    /// empty rectangle anchored at `(left, top)`.
    pub fn normalized(self) -> Self {
        Self {
            left: self.left,
            top: self.top,
            right: self.right.max(self.left),
            bottom: self.bottom.max(self.top),
        }
    }
}

/// Width and height of the activity's root view, in pixels.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct WindowExtent {
    pub width: i32,
    pub height: i32,
}

impl WindowExtent {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// True while layout hasn't settled yet (either dimension is zero).
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Opaque identifier of the native receiver of bridged events.
///
/// The value is owned by the native side, which clears it to
/// [`HostHandle::NULL`] when it tears down. A null handle means "don't
/// deliver anything", it is never an error.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct HostHandle(u64);

impl HostHandle {
    pub const NULL: HostHandle = HostHandle(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostHandle({:#x})", self.0)
    }
}

impl From<i64> for HostHandle {
    // JNI hands us the handle as a `jlong`
    fn from(raw: i64) -> Self {
        Self(raw as u64)
    }
}

#[test]
fn test_locator_and_reconciler_are_send_sync() {
    fn needs_send_sync<T: Send + Sync>() {}
    needs_send_sync::<VolumeLocator>();
    needs_send_sync::<ContentRectReconciler>();
    needs_send_sync::<PathDiscoveryCache>();
}
