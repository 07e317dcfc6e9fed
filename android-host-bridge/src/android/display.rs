use jni::objects::{JObject, JObjectArray};
use jni::JNIEnv;

use super::jni_utils::{system_service, ActivityContext};
use crate::config::{api_level, PlatformCapabilities};
use crate::display::{DisplayInfo, DisplayMetrics, DisplaySource, Rotation};
use crate::error::Result;

const DISPLAY_CATEGORY_PRESENTATION: &str = "android.hardware.display.category.PRESENTATION";

/// Displays as seen by the activity's `WindowManager` and the
/// `DisplayManager` service.
#[derive(Debug, Clone)]
pub struct JniDisplaySource {
    ctx: ActivityContext,
    caps: PlatformCapabilities,
}

impl JniDisplaySource {
    pub fn new(ctx: &ActivityContext, caps: PlatformCapabilities) -> Self {
        Self {
            ctx: ctx.clone(),
            caps,
        }
    }
}

fn read_metrics(
    env: &mut JNIEnv<'_>,
    metrics: &JObject<'_>,
) -> jni::errors::Result<DisplayMetrics> {
    Ok(DisplayMetrics {
        width_pixels: env.get_field(metrics, "widthPixels", "I")?.i()?,
        height_pixels: env.get_field(metrics, "heightPixels", "I")?.i()?,
        density: env.get_field(metrics, "density", "F")?.f()?,
        density_dpi: env.get_field(metrics, "densityDpi", "I")?.i()?,
        scaled_density: env.get_field(metrics, "scaledDensity", "F")?.f()?,
        xdpi: env.get_field(metrics, "xdpi", "F")?.f()?,
        ydpi: env.get_field(metrics, "ydpi", "F")?.f()?,
    })
}

fn read_display(
    env: &mut JNIEnv<'_>,
    display: &JObject<'_>,
    metrics: DisplayMetrics,
) -> jni::errors::Result<DisplayInfo> {
    Ok(DisplayInfo {
        id: env.call_method(display, "getDisplayId", "()I", &[])?.i()?,
        refresh_rate: env.call_method(display, "getRefreshRate", "()F", &[])?.f()?,
        rotation: Rotation::from_platform(env.call_method(display, "getRotation", "()I", &[])?.i()?),
        metrics,
    })
}

impl DisplaySource for JniDisplaySource {
    fn default_display(&self) -> Result<DisplayInfo> {
        let display = self.ctx.with_env(|env| {
            let window_manager = env
                .call_method(
                    self.ctx.activity(),
                    "getWindowManager",
                    "()Landroid/view/WindowManager;",
                    &[],
                )?
                .l()?;
            let display = env
                .call_method(
                    &window_manager,
                    "getDefaultDisplay",
                    "()Landroid/view/Display;",
                    &[],
                )?
                .l()?;
            // The activity's resources account for the window configuration,
            // unlike `Display.getMetrics()`
            let resources = env
                .call_method(
                    self.ctx.activity(),
                    "getResources",
                    "()Landroid/content/res/Resources;",
                    &[],
                )?
                .l()?;
            let metrics = env
                .call_method(
                    &resources,
                    "getDisplayMetrics",
                    "()Landroid/util/DisplayMetrics;",
                    &[],
                )?
                .l()?;
            let metrics = read_metrics(env, &metrics)?;
            read_display(env, &display, metrics)
        })?;
        Ok(display)
    }

    fn presentation_displays(&self) -> Result<Vec<DisplayInfo>> {
        if self.caps.sdk_version() < api_level::JELLY_BEAN_MR1 {
            return Ok(Vec::new());
        }
        let displays = self.ctx.with_env(|env| {
            let manager = system_service(env, self.ctx.activity(), "display")?;
            let category = env.new_string(DISPLAY_CATEGORY_PRESENTATION)?;
            let array = env
                .call_method(
                    &manager,
                    "getDisplays",
                    "(Ljava/lang/String;)[Landroid/view/Display;",
                    &[(&category).into()],
                )?
                .l()?;
            let array = JObjectArray::from(array);
            let len = env.get_array_length(&array)?;
            let mut displays = Vec::with_capacity(len.max(0) as usize);
            for i in 0..len {
                let info = env.with_local_frame(4, |env| -> jni::errors::Result<_> {
                    let display = env.get_object_array_element(&array, i)?;
                    let metrics = env.new_object("android/util/DisplayMetrics", "()V", &[])?;
                    env.call_method(
                        &display,
                        "getMetrics",
                        "(Landroid/util/DisplayMetrics;)V",
                        &[(&metrics).into()],
                    )?;
                    let metrics = read_metrics(env, &metrics)?;
                    read_display(env, &display, metrics)
                })?;
                displays.push(info);
            }
            Ok(displays)
        })?;
        Ok(displays)
    }
}
