use bitflags::bitflags;
use log::{error, trace};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Result;
use crate::gateway::BridgeGateway;
use crate::HostHandle;

/// The input sources the bridge tells apart when classifying a device.
///
/// Values are the `InputDevice.SOURCE_*` constants. A device reports the
/// union of all its sources, so test membership with
/// [`InputDeviceInfo::has_source()`] rather than converting the bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum Source {
    Unknown = 0,
    Keyboard = 0x0000_0101,
    Dpad = 0x0000_0201,
    /// Face and shoulder buttons of a game controller
    Gamepad = 0x0000_0401,
    Touchscreen = 0x0000_1002,
    Mouse = 0x0000_2002,
    /// Absolute positions on a surface that isn't the display
    Touchpad = 0x0010_0008,
    /// Analog sticks, triggers and hats of a game controller
    Joystick = 0x0100_0010,
}

/// Low byte of a source value, which holds its [`Class`].
const CLASS_MASK: u32 = 0xff;

/// How a [`Source`] reports its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum Class {
    None = 0x00,
    Button = 0x01,
    Pointer = 0x02,
    Trackball = 0x04,
    Position = 0x08,
    Joystick = 0x10,
}

impl Class {
    /// The class of a single source value. A mixed class byte, as found in
    /// a device's combined bitmask, gives [`Class::None`].
    pub fn of(source: u32) -> Self {
        Class::try_from(source & CLASS_MASK).unwrap_or(Class::None)
    }
}

impl From<Source> for Class {
    fn from(source: Source) -> Self {
        Class::of(source.into())
    }
}

/// `InputDevice.getKeyboardType()`. Values from newer platform releases
/// convert to a hidden variant and back without loss.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::FromPrimitive, num_enum::IntoPrimitive,
)]
#[non_exhaustive]
#[repr(u32)]
pub enum KeyboardType {
    /// No keys at all, or nothing the framework would call a keyboard.
    None,

    /// Keys that can't be used for typing, like volume or D-pad buttons.
    NonAlphabetic,

    /// A keyboard with all the letters.
    Alphabetic,

    #[doc(hidden)]
    #[num_enum(catch_all)]
    __Unknown(u32),
}

bitflags! {
    /// Joystick axes a device reports through its motion ranges.
    ///
    /// Only the axes a game controller can meaningfully map are tracked;
    /// others are ignored by [`JoystickAxes::from_motion_axis()`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct JoystickAxes: u32 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const Z = 1 << 2;
        const RX = 1 << 3;
        const RY = 1 << 4;
        const RZ = 1 << 5;
        const HAT_X = 1 << 6;
        const HAT_Y = 1 << 7;
        const LTRIGGER = 1 << 8;
        const RTRIGGER = 1 << 9;
        const RUDDER = 1 << 10;
        const WHEEL = 1 << 11;
        const GAS = 1 << 12;
        const BRAKE = 1 << 13;
        const THROTTLE = 1 << 14;
    }
}

impl JoystickAxes {
    /// Maps a `MotionEvent.AXIS_*` value to its flag.
    pub fn from_motion_axis(axis: i32) -> Self {
        match axis {
            0 => JoystickAxes::X,
            1 => JoystickAxes::Y,
            11 => JoystickAxes::Z,
            12 => JoystickAxes::RX,
            13 => JoystickAxes::RY,
            14 => JoystickAxes::RZ,
            15 => JoystickAxes::HAT_X,
            16 => JoystickAxes::HAT_Y,
            17 => JoystickAxes::LTRIGGER,
            18 => JoystickAxes::RTRIGGER,
            19 => JoystickAxes::THROTTLE,
            20 => JoystickAxes::RUDDER,
            21 => JoystickAxes::WHEEL,
            22 => JoystickAxes::GAS,
            23 => JoystickAxes::BRAKE,
            _ => JoystickAxes::empty(),
        }
    }
}

impl FromIterator<i32> for JoystickAxes {
    fn from_iter<I: IntoIterator<Item = i32>>(axes: I) -> Self {
        axes.into_iter()
            .fold(JoystickAxes::empty(), |acc, axis| {
                acc | JoystickAxes::from_motion_axis(axis)
            })
    }
}

/// Description of one `android.view.InputDevice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub id: i32,
    pub name: String,
    /// Raw `InputDevice.getSources()` bitmask
    pub sources: u32,
    pub keyboard_type: KeyboardType,
    /// Axes of the device's joystick motion ranges, empty unless the device
    /// has a [`Class::Joystick`] source.
    pub joystick_axes: JoystickAxes,
    /// The device has a power key, which usually means it is the phone's
    /// own buttons rather than a real keyboard.
    pub is_power_button: bool,
}

impl InputDeviceInfo {
    pub fn has_source(&self, source: Source) -> bool {
        let bits: u32 = source.into();
        bits != 0 && self.sources & bits == bits
    }

    /// Whether any of the device's sources belong to `class`.
    pub fn has_class(&self, class: Class) -> bool {
        match class {
            Class::None => self.sources & CLASS_MASK == 0,
            class => self.sources & u32::from(class) != 0,
        }
    }

    pub fn is_gamepad(&self) -> bool {
        self.has_source(Source::Gamepad) || self.has_source(Source::Joystick)
    }

    /// A keyboard that can be typed on.
    pub fn is_keyboard(&self) -> bool {
        self.has_source(Source::Keyboard) && self.keyboard_type == KeyboardType::Alphabetic
    }
}

/// Where input device descriptions come from.
pub trait InputDeviceSource {
    fn input_devices(&self) -> Result<Vec<InputDeviceInfo>>;
}

/// Forwards every input device to `gateway`, returning how many were
/// delivered.
pub fn enumerate_input_devices<S, G>(source: &S, gateway: &mut G, handle: HostHandle) -> usize
where
    S: InputDeviceSource,
    G: BridgeGateway,
{
    if handle.is_null() {
        trace!("Not enumerating input devices, no native receiver attached");
        return 0;
    }

    let devices = match source.input_devices() {
        Ok(devices) => devices,
        Err(err) => {
            error!("Failed to enumerate input devices: {err}");
            return 0;
        }
    };
    for device in &devices {
        trace!(
            "Input device {}: {:?} sources={:#x}",
            device.id,
            device.name,
            device.sources
        );
        gateway.input_device_enumerated(handle, device);
    }
    devices.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::gateway::testing::{Delivery, RecordingGateway};

    fn gamepad() -> InputDeviceInfo {
        InputDeviceInfo {
            id: 5,
            name: "Xbox Wireless Controller".to_owned(),
            sources: u32::from(Source::Gamepad)
                | u32::from(Source::Joystick)
                | u32::from(Source::Keyboard),
            keyboard_type: KeyboardType::NonAlphabetic,
            joystick_axes: [0, 1, 11, 14, 15, 16, 17, 18].into_iter().collect(),
            is_power_button: false,
        }
    }

    fn power_keys() -> InputDeviceInfo {
        InputDeviceInfo {
            id: 2,
            name: "gpio-keys".to_owned(),
            sources: Source::Keyboard.into(),
            keyboard_type: KeyboardType::NonAlphabetic,
            joystick_axes: JoystickAxes::empty(),
            is_power_button: true,
        }
    }

    struct FakeDevices(Option<Vec<InputDeviceInfo>>);

    impl InputDeviceSource for FakeDevices {
        fn input_devices(&self) -> Result<Vec<InputDeviceInfo>> {
            self.0
                .clone()
                .ok_or_else(|| BridgeError::JavaError("DeadObjectException".into()))
        }
    }

    #[test]
    fn test_class_from_source() {
        assert_eq!(Class::from(Source::Gamepad), Class::Button);
        assert_eq!(Class::from(Source::Joystick), Class::Joystick);
        assert_eq!(Class::from(Source::Touchscreen), Class::Pointer);
        assert_eq!(Class::from(Source::Touchpad), Class::Position);
        assert_eq!(Class::from(Source::Unknown), Class::None);
        assert_eq!(Class::from(Source::Mouse), Class::Pointer);
        assert_eq!(Class::from(Source::Dpad), Class::Button);
        // Keyboard | Touchscreen mixes two classes
        assert_eq!(Class::of(0x0000_1103), Class::None);
    }

    #[test]
    fn test_keyboard_type_preserves_unknown_values() {
        assert_eq!(KeyboardType::from(2u32), KeyboardType::Alphabetic);
        let future = KeyboardType::from(9u32);
        assert_eq!(u32::from(future), 9);
    }

    #[test]
    fn test_gamepad_classification() {
        let pad = gamepad();
        assert!(pad.is_gamepad());
        assert!(!pad.is_keyboard());
        assert!(pad.has_class(Class::Joystick));
        assert!(!pad.has_class(Class::Pointer));
        assert_eq!(
            pad.joystick_axes,
            JoystickAxes::X
                | JoystickAxes::Y
                | JoystickAxes::Z
                | JoystickAxes::RZ
                | JoystickAxes::HAT_X
                | JoystickAxes::HAT_Y
                | JoystickAxes::LTRIGGER
                | JoystickAxes::RTRIGGER
        );

        let keys = power_keys();
        assert!(!keys.is_gamepad());
        assert!(keys.has_source(Source::Keyboard));
        assert!(!keys.has_source(Source::Unknown));
    }

    #[test]
    fn test_unmapped_axes_are_ignored() {
        // AXIS_VSCROLL, AXIS_GENERIC_1
        let axes: JoystickAxes = [9, 32].into_iter().collect();
        assert!(axes.is_empty());
    }

    #[test]
    fn test_enumerate_forwards_every_device() {
        let source = FakeDevices(Some(vec![power_keys(), gamepad()]));
        let handle = HostHandle::from_raw(0x10);
        let mut gateway = RecordingGateway::default();
        assert_eq!(enumerate_input_devices(&source, &mut gateway, handle), 2);
        assert_eq!(
            gateway.deliveries,
            vec![
                Delivery::InputDevice(handle, power_keys()),
                Delivery::InputDevice(handle, gamepad()),
            ]
        );
    }

    #[test]
    fn test_enumerate_without_receiver_or_on_failure() {
        let mut gateway = RecordingGateway::default();
        let source = FakeDevices(Some(vec![gamepad()]));
        assert_eq!(
            enumerate_input_devices(&source, &mut gateway, HostHandle::NULL),
            0
        );
        let failing = FakeDevices(None);
        assert_eq!(
            enumerate_input_devices(&failing, &mut gateway, HostHandle::from_raw(1)),
            0
        );
        assert!(gateway.deliveries.is_empty());
    }
}
