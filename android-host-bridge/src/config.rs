use crate::error::{BridgeError, Result};

/// API levels that gate the framework calls this crate makes.
#[cfg_attr(not(target_os = "android"), allow(dead_code))]
pub(crate) mod api_level {
    /// `WindowInsets.getRootWindowInsets()`
    pub const M: i32 = 23;
    /// `Activity.isInMultiWindowMode()`, `StorageManager.getStorageVolumes()`
    pub const N: i32 = 24;
    /// `StorageVolume.getDirectory()`
    pub const R: i32 = 30;
    /// `DisplayManager.getDisplays(String)`
    pub const JELLY_BEAN_MR1: i32 = 17;
    /// `InputDevice.hasKeys()`
    pub const KITKAT: i32 = 19;
    /// `Intent.ACTION_OPEN_DOCUMENT_TREE`
    pub const LOLLIPOP: i32 = 21;
}

/// How storage volume paths can be discovered on the running platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageCapability {
    /// No `StorageManager.getStorageVolumes()`; volumes can't be enumerated.
    Unavailable,

    /// Volumes can be listed but expose no path accessor, so the path has to
    /// be dug out of the volume's marshalled `Parcel`.
    ParcelScan,

    /// `StorageVolume.getDirectory()` is available.
    DirectoryAccess,
}

/// Capabilities of the running Android release, read once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformCapabilities {
    sdk_version: i32,
}

impl PlatformCapabilities {
    pub const fn from_sdk_version(sdk_version: i32) -> Self {
        Self { sdk_version }
    }

    /// Reads the user-visible SDK version of the framework from the
    /// `ro.build.version.sdk` system property.
    ///
    /// Also referred to as [`Build.VERSION_CODES`](https://developer.android.com/reference/android/os/Build.VERSION_CODES)
    #[cfg(target_os = "android")]
    pub fn detect() -> Result<Self> {
        let mut prop = android_properties::getprop("ro.build.version.sdk");
        let value = prop.value().ok_or_else(|| {
            BridgeError::SdkVersionUnavailable("ro.build.version.sdk is not set".to_owned())
        })?;
        let sdk_version = value.trim().parse::<i32>().map_err(|err| {
            BridgeError::SdkVersionUnavailable(format!("invalid SDK version {value:?}: {err}"))
        })?;
        log::debug!("Running on API level {sdk_version}");
        Ok(Self::from_sdk_version(sdk_version))
    }

    pub fn sdk_version(&self) -> i32 {
        self.sdk_version
    }

    pub fn storage(&self) -> StorageCapability {
        if self.sdk_version >= api_level::R {
            StorageCapability::DirectoryAccess
        } else if self.sdk_version >= api_level::N {
            StorageCapability::ParcelScan
        } else {
            StorageCapability::Unavailable
        }
    }

    /// Whether the activity can be in multi-window mode at all.
    pub fn supports_multi_window(&self) -> bool {
        self.sdk_version >= api_level::N
    }

    /// Whether insets can be read from the root view rather than only from
    /// the insets dispatched to the content view.
    pub fn supports_root_insets(&self) -> bool {
        self.sdk_version >= api_level::M
    }

    #[cfg_attr(not(target_os = "android"), allow(dead_code))]
    pub(crate) fn require(&self, operation: &'static str, required: i32) -> Result<()> {
        if self.sdk_version >= required {
            Ok(())
        } else {
            Err(BridgeError::CapabilityUnavailable {
                operation,
                required,
                actual: self.sdk_version,
            })
        }
    }
}

/// Tunables of the storage volume discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Prefix a string found in a marshalled `StorageVolume` must start with
    /// to be taken as the volume's path.
    pub storage_root_prefix: String,

    /// Identity that always refers to the primary (built-in) volume,
    /// matched case-insensitively.
    pub primary_volume_token: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            storage_root_prefix: "/storage".to_owned(),
            primary_volume_token: "primary".to_owned(),
        }
    }
}
