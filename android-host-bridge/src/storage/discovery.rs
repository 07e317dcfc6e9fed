use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use super::parcel::{ParcelReader, ParcelString};

const UNRESOLVED: isize = -1;
const UNSUPPORTED: isize = -2;

/// Where a `StorageVolume`'s path lives in its marshalled form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryState {
    /// No volume has been scanned yet.
    Unresolved,
    /// The path is the string field starting at this byte offset.
    FieldOffset(usize),
    /// A scan found no path; no further scans will be attempted.
    Unsupported,
}

impl DiscoveryState {
    fn from_raw(raw: isize) -> Self {
        match raw {
            UNRESOLVED => DiscoveryState::Unresolved,
            UNSUPPORTED => DiscoveryState::Unsupported,
            offset => DiscoveryState::FieldOffset(offset as usize),
        }
    }
}

/// Memoizes the byte offset of the path field in a marshalled
/// `StorageVolume`.
///
/// The layout of the private `StorageVolume` fields is stable within a
/// platform build but undocumented, so it is discovered by scanning the first
/// volume and then reused for every other volume for the rest of the
/// process. A failed scan is remembered too.
///
/// The state only ever moves out of [`DiscoveryState::Unresolved`], once; if
/// two threads race to settle it the first one wins.
#[derive(Debug)]
pub struct PathDiscoveryCache {
    state: AtomicIsize,
    scans: AtomicUsize,
}

static GLOBAL_CACHE: OnceLock<Arc<PathDiscoveryCache>> = OnceLock::new();

/// The result of looking up a path in one marshalled volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PathLookup {
    Found(String),
    /// This volume has no readable string at the known offset.
    Missing,
    Unsupported,
}

impl Default for PathDiscoveryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PathDiscoveryCache {
    pub const fn new() -> Self {
        Self {
            state: AtomicIsize::new(UNRESOLVED),
            scans: AtomicUsize::new(0),
        }
    }

    /// The cache shared by every [`VolumeLocator`](super::VolumeLocator)
    /// created with [`VolumeLocator::new()`](super::VolumeLocator::new).
    ///
    /// It is initialized on first use and lives for the rest of the process.
    pub fn global() -> Arc<PathDiscoveryCache> {
        GLOBAL_CACHE
            .get_or_init(|| Arc::new(PathDiscoveryCache::new()))
            .clone()
    }

    pub fn state(&self) -> DiscoveryState {
        DiscoveryState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_unsupported(&self) -> bool {
        self.state() == DiscoveryState::Unsupported
    }

    /// Number of full scans performed so far.
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    /// Moves out of `Unresolved`, returning whichever state actually won.
    fn settle(&self, state: DiscoveryState) -> DiscoveryState {
        let raw = match state {
            DiscoveryState::Unresolved => return self.state(),
            DiscoveryState::FieldOffset(offset) => offset as isize,
            DiscoveryState::Unsupported => UNSUPPORTED,
        };
        match self
            .state
            .compare_exchange(UNRESOLVED, raw, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => state,
            Err(current) => DiscoveryState::from_raw(current),
        }
    }

    pub(crate) fn lookup(&self, parcel: &[u8], prefix: &str) -> PathLookup {
        match self.state() {
            DiscoveryState::Unsupported => PathLookup::Unsupported,
            DiscoveryState::FieldOffset(offset) => read_at(parcel, offset),
            DiscoveryState::Unresolved => {
                self.scans.fetch_add(1, Ordering::Relaxed);
                match scan_for_path(parcel, prefix) {
                    Some((offset, path)) => {
                        match self.settle(DiscoveryState::FieldOffset(offset)) {
                            DiscoveryState::FieldOffset(settled) if settled == offset => {
                                debug!("Found volume path field at offset {offset}: {path}");
                                PathLookup::Found(path)
                            }
                            DiscoveryState::FieldOffset(settled) => read_at(parcel, settled),
                            _ => PathLookup::Unsupported,
                        }
                    }
                    None => match self.settle(DiscoveryState::Unsupported) {
                        DiscoveryState::FieldOffset(settled) => read_at(parcel, settled),
                        _ => {
                            warn!(
                                "No string starting with {prefix:?} in marshalled StorageVolume ({} bytes), volume paths unavailable",
                                parcel.len()
                            );
                            PathLookup::Unsupported
                        }
                    },
                }
            }
        }
    }
}

fn read_at(parcel: &[u8], offset: usize) -> PathLookup {
    match read_path_at(parcel, offset) {
        Some(path) => PathLookup::Found(path),
        None => PathLookup::Missing,
    }
}

/// Walks the string fields of `parcel` from the start, the same way
/// repeated `Parcel.readString()` calls would, and returns the offset and
/// value of the first one starting with `prefix`.
///
/// Positions that don't decode as a string are skipped. This is a heuristic:
/// it relies on the path being the first field with that prefix and on the
/// fields before it lining up with string boundaries.
pub fn scan_for_path(parcel: &[u8], prefix: &str) -> Option<(usize, String)> {
    let mut reader = ParcelReader::new(parcel);
    while reader.has_remaining() {
        let offset = reader.position();
        match reader.read_string()? {
            ParcelString::Value(value) if value.starts_with(prefix) => {
                return Some((offset, value));
            }
            _ => {}
        }
    }
    None
}

/// Decodes the string field at `offset`, if there is a non-null one.
pub fn read_path_at(parcel: &[u8], offset: usize) -> Option<String> {
    match ParcelReader::at(parcel, offset).read_string()? {
        ParcelString::Value(value) => Some(value),
        ParcelString::Null | ParcelString::Invalid => None,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::storage::parcel::ParcelWriter;

    /// Roughly what `StorageVolume.writeToParcel()` produces on Android 7-10,
    /// with enough filler ahead of the path to move it to `offset`.
    fn marshalled_volume(uuid: &str, path: &str, filler: usize) -> (Vec<u8>, usize) {
        let mut writer = ParcelWriter::new();
        writer.write_string(Some(uuid)).write_i32(0x0003_0001);
        for _ in 0..filler {
            writer.write_i32(-1);
        }
        let offset = writer.position();
        writer
            .write_string(Some(path))
            .write_string(Some("SD card"))
            .write_i32(0)
            .write_i32(1)
            .write_i64(0)
            .write_string(Some(uuid))
            .write_string(Some("mounted"));
        (writer.into_bytes(), offset)
    }

    #[test]
    fn scan_finds_first_prefixed_string() {
        let (parcel, offset) = marshalled_volume("AAAA-BBBB", "/storage/AAAA-BBBB", 3);
        assert_eq!(
            scan_for_path(&parcel, "/storage"),
            Some((offset, "/storage/AAAA-BBBB".to_owned()))
        );
        assert_eq!(scan_for_path(&parcel, "/mnt/media_rw"), None);
    }

    #[test]
    fn offset_discovered_once_then_reused() {
        let cache = PathDiscoveryCache::new();

        // uuid string: 4 + 20 bytes, storage id: 4 bytes, 46 * 4 bytes filler
        let (first, offset) = marshalled_volume("AAAA-BBBB", "/storage/AAAA-BBBB", 46);
        assert_eq!(offset, 212);
        assert_eq!(
            cache.lookup(&first, "/storage"),
            PathLookup::Found("/storage/AAAA-BBBB".to_owned())
        );
        assert_eq!(cache.state(), DiscoveryState::FieldOffset(212));
        assert_eq!(cache.scans(), 1);

        let (second, _) = marshalled_volume("CCCC-DDDD", "/storage/CCCC-DDDD", 46);
        assert_eq!(
            cache.lookup(&second, "/storage"),
            PathLookup::Found("/storage/CCCC-DDDD".to_owned())
        );
        assert_eq!(cache.scans(), 1);
        assert_eq!(
            scan_for_path(&second, "/storage"),
            Some((212, "/storage/CCCC-DDDD".to_owned()))
        );
    }

    #[test]
    fn failed_scan_is_terminal() {
        let cache = PathDiscoveryCache::new();
        let mut writer = ParcelWriter::new();
        writer.write_string(Some("emulated")).write_i32(3);
        let parcel = writer.into_bytes();

        assert_eq!(cache.lookup(&parcel, "/storage"), PathLookup::Unsupported);
        assert_eq!(cache.state(), DiscoveryState::Unsupported);

        let (good, _) = marshalled_volume("AAAA-BBBB", "/storage/AAAA-BBBB", 0);
        assert_eq!(cache.lookup(&good, "/storage"), PathLookup::Unsupported);
        assert_eq!(cache.scans(), 1);
    }

    #[test]
    fn truncated_parcel_degrades_to_unsupported() {
        let cache = PathDiscoveryCache::new();
        let (parcel, offset) = marshalled_volume("AAAA-BBBB", "/storage/AAAA-BBBB", 2);
        assert_eq!(cache.lookup(&parcel[..offset + 10], "/storage"), PathLookup::Unsupported);
        assert!(cache.is_unsupported());
    }

    #[test]
    fn known_offset_on_short_parcel_is_missing() {
        let cache = PathDiscoveryCache::new();
        let (parcel, offset) = marshalled_volume("AAAA-BBBB", "/storage/AAAA-BBBB", 10);
        assert!(matches!(cache.lookup(&parcel, "/storage"), PathLookup::Found(_)));
        assert_eq!(cache.lookup(&parcel[..offset], "/storage"), PathLookup::Missing);
        assert_eq!(cache.state(), DiscoveryState::FieldOffset(offset));
    }

    #[test]
    fn settle_keeps_first_writer() {
        let cache = PathDiscoveryCache::new();
        assert_eq!(
            cache.settle(DiscoveryState::FieldOffset(8)),
            DiscoveryState::FieldOffset(8)
        );
        assert_eq!(
            cache.settle(DiscoveryState::Unsupported),
            DiscoveryState::FieldOffset(8)
        );
        assert_eq!(cache.state(), DiscoveryState::FieldOffset(8));
    }

    proptest! {
        #[test]
        fn cached_offset_matches_rescan(
            filler in 0usize..64,
            first in "[0-9A-F]{4}-[0-9A-F]{4}",
            second in "[0-9A-F]{4}-[0-9A-F]{4}",
        ) {
            let cache = PathDiscoveryCache::new();
            let (parcel, offset) = marshalled_volume(&first, &format!("/storage/{first}"), filler);
            prop_assert_eq!(cache.lookup(&parcel, "/storage"), PathLookup::Found(format!("/storage/{first}")));
            prop_assert_eq!(cache.state(), DiscoveryState::FieldOffset(offset));

            let path = format!("/storage/{second}");
            let (parcel, _) = marshalled_volume(&second, &path, filler);
            let rescanned = scan_for_path(&parcel, "/storage").map(|(_, path)| path);
            prop_assert_eq!(cache.lookup(&parcel, "/storage"), PathLookup::Found(path.clone()));
            prop_assert_eq!(rescanned, Some(path));
            prop_assert_eq!(cache.scans(), 1);
        }

        #[test]
        fn scanning_arbitrary_bytes_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let cache = PathDiscoveryCache::new();
            let first = cache.lookup(&bytes, "/storage");
            prop_assert_ne!(cache.state(), DiscoveryState::Unresolved);
            if first == PathLookup::Unsupported {
                prop_assert_eq!(cache.lookup(&bytes, "/storage"), PathLookup::Unsupported);
            }
            prop_assert_eq!(cache.scans(), 1);
        }
    }
}
