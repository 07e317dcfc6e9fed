use jni::objects::{JBooleanArray, JIntArray, JObject, JValue};
use jni::JNIEnv;

use super::jni_utils::{get_optional_string, ActivityContext};
use crate::config::{api_level, PlatformCapabilities};
use crate::error::Result;
use crate::input::{Class, InputDeviceInfo, InputDeviceSource, JoystickAxes, KeyboardType};

const KEYCODE_POWER: i32 = 26;
const SOURCE_CLASS_JOYSTICK: i32 = 0x0000_0010;

/// Input devices as reported by `android.view.InputDevice`.
#[derive(Debug, Clone)]
pub struct JniInputDeviceSource {
    ctx: ActivityContext,
    caps: PlatformCapabilities,
}

impl JniInputDeviceSource {
    pub fn new(ctx: &ActivityContext, caps: PlatformCapabilities) -> Self {
        Self {
            ctx: ctx.clone(),
            caps,
        }
    }
}

fn joystick_axes(env: &mut JNIEnv<'_>, device: &JObject<'_>) -> jni::errors::Result<JoystickAxes> {
    let ranges = env
        .call_method(device, "getMotionRanges", "()Ljava/util/List;", &[])?
        .l()?;
    let len = env.call_method(&ranges, "size", "()I", &[])?.i()?;
    let mut axes = Vec::with_capacity(len.max(0) as usize);
    for i in 0..len {
        let range = env
            .call_method(&ranges, "get", "(I)Ljava/lang/Object;", &[JValue::Int(i)])?
            .l()?;
        let source = env.call_method(&range, "getSource", "()I", &[])?.i()?;
        if source & SOURCE_CLASS_JOYSTICK != 0 {
            axes.push(env.call_method(&range, "getAxis", "()I", &[])?.i()?);
        }
        env.delete_local_ref(range)?;
    }
    Ok(axes.into_iter().collect())
}

fn has_power_key(env: &mut JNIEnv<'_>, device: &JObject<'_>) -> jni::errors::Result<bool> {
    let keys: JIntArray = env.new_int_array(1)?;
    env.set_int_array_region(&keys, 0, &[KEYCODE_POWER])?;
    let present = env
        .call_method(device, "hasKeys", "([I)[Z", &[(&keys).into()])?
        .l()?;
    let present = JBooleanArray::from(present);
    let mut buf = [0u8; 1];
    env.get_boolean_array_region(&present, 0, &mut buf)?;
    Ok(buf[0] != 0)
}

fn read_device(
    env: &mut JNIEnv<'_>,
    caps: &PlatformCapabilities,
    id: i32,
) -> jni::errors::Result<Option<InputDeviceInfo>> {
    let device = env
        .call_static_method(
            "android/view/InputDevice",
            "getDevice",
            "(I)Landroid/view/InputDevice;",
            &[JValue::Int(id)],
        )?
        .l()?;
    // The device went away between listing the ids and looking it up
    if device.is_null() {
        return Ok(None);
    }

    let name = env
        .call_method(&device, "getName", "()Ljava/lang/String;", &[])?
        .l()?;
    let name = get_optional_string(env, name)?.unwrap_or_default();
    let sources = env.call_method(&device, "getSources", "()I", &[])?.i()? as u32;
    let keyboard_type = env.call_method(&device, "getKeyboardType", "()I", &[])?.i()?;

    let mut info = InputDeviceInfo {
        id,
        name,
        sources,
        keyboard_type: KeyboardType::from(keyboard_type as u32),
        joystick_axes: JoystickAxes::empty(),
        is_power_button: false,
    };
    if info.has_class(Class::Joystick) {
        info.joystick_axes = joystick_axes(env, &device)?;
    }
    if caps.sdk_version() >= api_level::KITKAT {
        info.is_power_button = has_power_key(env, &device)?;
    }
    Ok(Some(info))
}

impl InputDeviceSource for JniInputDeviceSource {
    fn input_devices(&self) -> Result<Vec<InputDeviceInfo>> {
        let devices = self.ctx.with_env(|env| {
            let ids = env
                .call_static_method("android/view/InputDevice", "getDeviceIds", "()[I", &[])?
                .l()?;
            let ids = JIntArray::from(ids);
            let len = env.get_array_length(&ids)?;
            let mut buf = vec![0; len.max(0) as usize];
            env.get_int_array_region(&ids, 0, &mut buf)?;

            let mut devices = Vec::with_capacity(buf.len());
            for id in buf {
                let device = env.with_local_frame(16, |env| read_device(env, &self.caps, id))?;
                if let Some(device) = device {
                    devices.push(device);
                }
            }
            Ok(devices)
        })?;
        Ok(devices)
    }
}
