//! Storage volume enumeration and path resolution.
//!
//! Android only started exposing the filesystem path of a `StorageVolume`
//! with `getDirectory()` in API level 30. Between API levels 24 and 29 the
//! volumes can be listed but the path is a private field, so it is recovered
//! from the volume's marshalled `Parcel` instead (see
//! [`PathDiscoveryCache`]). Which of the two strategies is used is decided
//! once, from the [`StorageCapability`], when the [`VolumeLocator`] is
//! created.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, trace};

use crate::config::{BridgeConfig, StorageCapability};
use crate::error::Result;
use crate::gateway::BridgeGateway;
use crate::util::try_get_absolute_path;
use crate::HostHandle;

mod discovery;
pub use discovery::{read_path_at, scan_for_path, DiscoveryState, PathDiscoveryCache};
use discovery::PathLookup;

mod parcel;

/// What the platform tells us about a volume, besides its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VolumeDescriptor {
    /// User-visible description, e.g. "SanDisk SD card".
    pub display_name: String,

    /// The filesystem UUID of the volume, or `"primary"` for a primary volume
    /// without one. Empty if the platform reports neither.
    pub identity: String,

    pub is_primary: bool,
}

/// A platform `StorageVolume` object.
pub trait StorageVolume {
    fn descriptor(&self) -> &VolumeDescriptor;

    /// `StorageVolume.getDirectory().getAbsolutePath()`, or `None` if the
    /// volume has no directory (e.g. it isn't mounted).
    ///
    /// Only called with [`StorageCapability::DirectoryAccess`].
    fn directory(&self) -> Result<Option<String>>;

    /// The bytes of a `Parcel` the volume has been written to.
    ///
    /// Only called with [`StorageCapability::ParcelScan`].
    fn marshall(&self) -> Result<Vec<u8>>;
}

/// A platform `StorageManager`.
pub trait StorageService {
    type Volume: StorageVolume;

    /// All volumes, in the platform's order.
    fn storage_volumes(&self) -> Result<Vec<Self::Volume>>;

    fn primary_volume(&self) -> Result<Option<Self::Volume>>;
}

/// A secondary volume with a usable path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumeratedVolume {
    pub path: PathBuf,
    pub display_name: String,
}

enum VolumePath {
    Path(PathBuf),
    /// Nothing usable for this volume; carry on with the next one.
    Skip,
    /// No volume can be resolved on this platform; stop enumerating.
    Abort,
}

trait PathStrategy: fmt::Debug + Send + Sync {
    fn capability(&self) -> StorageCapability;

    /// Whether an earlier call already established that no path can be
    /// resolved.
    fn exhausted(&self) -> bool {
        false
    }

    fn volume_path(&self, volume: &dyn StorageVolume) -> VolumePath;
}

#[derive(Debug)]
struct DirectoryAccess;

impl PathStrategy for DirectoryAccess {
    fn capability(&self) -> StorageCapability {
        StorageCapability::DirectoryAccess
    }

    fn volume_path(&self, volume: &dyn StorageVolume) -> VolumePath {
        match volume.directory() {
            Ok(dir) => match try_get_absolute_path(dir.as_deref()) {
                Some(path) => VolumePath::Path(path),
                None => {
                    trace!("Skipping volume without a directory: {:?}", volume.descriptor());
                    VolumePath::Skip
                }
            },
            Err(err) => {
                error!("Failed to query directory of {:?}: {err}", volume.descriptor());
                VolumePath::Skip
            }
        }
    }
}

#[derive(Debug)]
struct ParcelScan {
    cache: Arc<PathDiscoveryCache>,
    prefix: String,
}

impl PathStrategy for ParcelScan {
    fn capability(&self) -> StorageCapability {
        StorageCapability::ParcelScan
    }

    fn exhausted(&self) -> bool {
        self.cache.is_unsupported()
    }

    fn volume_path(&self, volume: &dyn StorageVolume) -> VolumePath {
        if self.exhausted() {
            return VolumePath::Abort;
        }
        let parcel = match volume.marshall() {
            Ok(parcel) => parcel,
            Err(err) => {
                error!("Failed to marshall {:?}: {err}", volume.descriptor());
                return VolumePath::Skip;
            }
        };
        match self.cache.lookup(&parcel, &self.prefix) {
            PathLookup::Found(path) => match try_get_absolute_path(Some(&path)) {
                Some(path) => VolumePath::Path(path),
                None => VolumePath::Skip,
            },
            PathLookup::Missing => {
                trace!("No path at the known offset for {:?}", volume.descriptor());
                VolumePath::Skip
            }
            PathLookup::Unsupported => VolumePath::Abort,
        }
    }
}

/// Resolves storage volumes to filesystem paths.
#[derive(Debug)]
pub struct VolumeLocator {
    strategy: Box<dyn PathStrategy>,
    config: BridgeConfig,
}

impl VolumeLocator {
    /// A locator for `capability` using the default [`BridgeConfig`] and the
    /// process wide [`PathDiscoveryCache`].
    ///
    /// Returns `None` for [`StorageCapability::Unavailable`], since none of
    /// the platform APIs it would need can be called there.
    pub fn new(capability: StorageCapability) -> Option<Self> {
        Self::with_config(
            capability,
            BridgeConfig::default(),
            PathDiscoveryCache::global(),
        )
    }

    /// Like [`new()`](Self::new) but with explicit configuration and a
    /// discovery cache, e.g. one per session.
    pub fn with_config(
        capability: StorageCapability,
        config: BridgeConfig,
        cache: Arc<PathDiscoveryCache>,
    ) -> Option<Self> {
        let strategy: Box<dyn PathStrategy> = match capability {
            StorageCapability::Unavailable => return None,
            StorageCapability::ParcelScan => Box::new(ParcelScan {
                cache,
                prefix: config.storage_root_prefix.clone(),
            }),
            StorageCapability::DirectoryAccess => Box::new(DirectoryAccess),
        };
        debug!("Resolving volume paths with {strategy:?}");
        Some(Self { strategy, config })
    }

    pub fn capability(&self) -> StorageCapability {
        self.strategy.capability()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Lazily resolves every non-primary volume of `service`, in platform
    /// order, skipping volumes without a usable path.
    pub fn volumes<S: StorageService>(&self, service: &S) -> Volumes<'_, S::Volume> {
        let volumes = if self.strategy.exhausted() {
            Vec::new()
        } else {
            service.storage_volumes().unwrap_or_else(|err| {
                error!("Failed to list storage volumes: {err}");
                Vec::new()
            })
        };
        Volumes {
            strategy: self.strategy.as_ref(),
            volumes: volumes.into_iter(),
            done: false,
        }
    }

    /// Forwards every volume from [`volumes()`](Self::volumes) to `gateway`,
    /// returning how many were delivered.
    pub fn enumerate_volumes<S, G>(&self, service: &S, gateway: &mut G, handle: HostHandle) -> usize
    where
        S: StorageService,
        G: BridgeGateway,
    {
        if handle.is_null() {
            trace!("Not enumerating volumes, no native receiver attached");
            return 0;
        }
        let mut count = 0;
        for volume in self.volumes(service) {
            gateway.volume_enumerated(handle, &volume.path, &volume.display_name);
            count += 1;
        }
        count
    }

    /// Finds the path of the volume whose identity matches `identity`,
    /// ignoring case. The primary volume token matches the primary volume.
    pub fn resolve_volume_by_identity<S: StorageService>(
        &self,
        service: &S,
        identity: &str,
    ) -> Option<PathBuf> {
        let volume = if identity.eq_ignore_ascii_case(&self.config.primary_volume_token) {
            service.primary_volume().unwrap_or_else(|err| {
                error!("Failed to query primary storage volume: {err}");
                None
            })
        } else {
            let volumes = service.storage_volumes().unwrap_or_else(|err| {
                error!("Failed to list storage volumes: {err}");
                Vec::new()
            });
            volumes.into_iter().find(|volume| {
                let volume_id = &volume.descriptor().identity;
                !volume_id.is_empty() && volume_id.eq_ignore_ascii_case(identity)
            })
        }?;

        match self.strategy.volume_path(&volume) {
            VolumePath::Path(path) => Some(path),
            VolumePath::Skip | VolumePath::Abort => None,
        }
    }

    /// Resolves a tree document id from the document tree picker, of the form
    /// `<volume identity>:<path relative to the volume root>`.
    pub fn document_tree_path<S: StorageService>(
        &self,
        service: &S,
        tree_document_id: &str,
    ) -> Option<PathBuf> {
        let (identity, relative) = match tree_document_id.split_once(':') {
            Some((identity, relative)) => (identity, relative),
            None => (tree_document_id, ""),
        };
        let root = self.resolve_volume_by_identity(service, identity)?;
        let relative = relative.trim_matches('/');
        if relative.is_empty() {
            Some(root)
        } else {
            Some(root.join(relative))
        }
    }

    /// [`document_tree_path()`](Self::document_tree_path) and forward the
    /// result to `gateway`.
    pub fn open_document_tree<S, G>(
        &self,
        service: &S,
        gateway: &mut G,
        handle: HostHandle,
        tree_document_id: &str,
    ) -> bool
    where
        S: StorageService,
        G: BridgeGateway,
    {
        if handle.is_null() {
            return false;
        }
        match self.document_tree_path(service, tree_document_id) {
            Some(path) => {
                gateway.document_tree_opened(handle, &path);
                true
            }
            None => {
                debug!("Couldn't resolve document tree {tree_document_id:?}");
                false
            }
        }
    }
}

/// Iterator returned by [`VolumeLocator::volumes()`].
pub struct Volumes<'a, V> {
    strategy: &'a dyn PathStrategy,
    volumes: std::vec::IntoIter<V>,
    done: bool,
}

impl<'a, V: StorageVolume> Iterator for Volumes<'a, V> {
    type Item = EnumeratedVolume;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for volume in self.volumes.by_ref() {
            let descriptor = volume.descriptor();
            if descriptor.is_primary {
                continue;
            }
            match self.strategy.volume_path(&volume) {
                VolumePath::Path(path) => {
                    return Some(EnumeratedVolume {
                        path,
                        display_name: descriptor.display_name.clone(),
                    });
                }
                VolumePath::Skip => {}
                VolumePath::Abort => break,
            }
        }
        self.done = true;
        None
    }
}
