use log::{error, trace, warn};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Result;
use crate::gateway::BridgeGateway;
use crate::HostHandle;

/// `Display.getRotation()`
///
/// See [the Surface docs](https://developer.android.com/reference/android/view/Surface#ROTATION_0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum Rotation {
    Rotation0 = 0,
    Rotation90 = 1,
    Rotation180 = 2,
    Rotation270 = 3,
}

impl Rotation {
    /// Decodes a platform rotation, falling back to [`Rotation::Rotation0`]
    /// for values we don't know.
    pub fn from_platform(value: i32) -> Self {
        Rotation::try_from(value).unwrap_or_else(|_| {
            warn!("Unknown display rotation {value}");
            Rotation::Rotation0
        })
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Rotation0 => 0,
            Rotation::Rotation90 => 90,
            Rotation::Rotation180 => 180,
            Rotation::Rotation270 => 270,
        }
    }

    /// Whether width and height are swapped relative to the natural
    /// orientation.
    pub fn is_sideways(&self) -> bool {
        matches!(self, Rotation::Rotation90 | Rotation::Rotation270)
    }
}

/// The fields of `android.util.DisplayMetrics` the native side cares about.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayMetrics {
    pub width_pixels: i32,
    pub height_pixels: i32,
    pub density: f32,
    pub density_dpi: i32,
    pub scaled_density: f32,
    pub xdpi: f32,
    pub ydpi: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayInfo {
    /// `Display.getDisplayId()`; the default display is [`DisplayInfo::DEFAULT_DISPLAY`].
    pub id: i32,
    pub refresh_rate: f32,
    pub rotation: Rotation,
    pub metrics: DisplayMetrics,
}

impl DisplayInfo {
    pub const DEFAULT_DISPLAY: i32 = 0;
}

/// Where display descriptions come from.
pub trait DisplaySource {
    /// The display the activity is shown on.
    fn default_display(&self) -> Result<DisplayInfo>;

    /// Displays suitable for showing a `Presentation`, e.g. HDMI or wireless
    /// displays.
    fn presentation_displays(&self) -> Result<Vec<DisplayInfo>>;
}

/// Forwards the default display followed by each presentation display,
/// returning how many were delivered.
pub fn enumerate_displays<D, G>(source: &D, gateway: &mut G, handle: HostHandle) -> usize
where
    D: DisplaySource,
    G: BridgeGateway,
{
    if handle.is_null() {
        trace!("Not enumerating displays, no native receiver attached");
        return 0;
    }

    let default = match source.default_display() {
        Ok(display) => display,
        Err(err) => {
            error!("Failed to query default display: {err}");
            return 0;
        }
    };
    gateway.display_enumerated(handle, &default);
    let mut count = 1;

    let presentation = source.presentation_displays().unwrap_or_else(|err| {
        error!("Failed to query presentation displays: {err}");
        Vec::new()
    });
    for display in presentation.iter().filter(|d| d.id != default.id) {
        gateway.display_enumerated(handle, display);
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::gateway::testing::{Delivery, RecordingGateway};

    struct FakeDisplays {
        presentation: Option<Vec<DisplayInfo>>,
    }

    fn display(id: i32, rotation: Rotation) -> DisplayInfo {
        DisplayInfo {
            id,
            refresh_rate: 60.0,
            rotation,
            metrics: DisplayMetrics {
                width_pixels: 1920,
                height_pixels: 1080,
                density: 2.0,
                density_dpi: 320,
                scaled_density: 2.0,
                xdpi: 320.0,
                ydpi: 320.0,
            },
        }
    }

    impl DisplaySource for FakeDisplays {
        fn default_display(&self) -> Result<DisplayInfo> {
            Ok(display(DisplayInfo::DEFAULT_DISPLAY, Rotation::Rotation90))
        }

        fn presentation_displays(&self) -> Result<Vec<DisplayInfo>> {
            self.presentation
                .clone()
                .ok_or_else(|| BridgeError::JavaError("SecurityException".into()))
        }
    }

    #[test]
    fn default_display_comes_first() {
        let source = FakeDisplays {
            presentation: Some(vec![
                display(0, Rotation::Rotation90),
                display(2, Rotation::Rotation0),
            ]),
        };
        let handle = HostHandle::from_raw(7);
        let mut gateway = RecordingGateway::default();
        assert_eq!(enumerate_displays(&source, &mut gateway, handle), 2);
        assert_eq!(
            gateway.deliveries,
            vec![
                Delivery::Display(handle, display(0, Rotation::Rotation90)),
                Delivery::Display(handle, display(2, Rotation::Rotation0)),
            ]
        );
    }

    #[test]
    fn presentation_failure_still_reports_default() {
        let source = FakeDisplays { presentation: None };
        let mut gateway = RecordingGateway::default();
        assert_eq!(
            enumerate_displays(&source, &mut gateway, HostHandle::from_raw(7)),
            1
        );
        assert_eq!(
            enumerate_displays(&source, &mut gateway, HostHandle::NULL),
            0
        );
        assert_eq!(gateway.deliveries.len(), 1);
    }

    #[test]
    fn rotation_values() {
        assert_eq!(Rotation::from_platform(3), Rotation::Rotation270);
        assert_eq!(Rotation::from_platform(3).degrees(), 270);
        assert!(Rotation::from_platform(1).is_sideways());
        assert_eq!(Rotation::from_platform(17), Rotation::Rotation0);
        assert_eq!(i32::from(Rotation::Rotation180), 2);
    }
}
