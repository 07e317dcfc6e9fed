use jni::objects::JObject;
use jni::JNIEnv;
use log::trace;

use super::jni_utils::ActivityContext;
use crate::config::PlatformCapabilities;
use crate::error::Result;
use crate::gateway::BridgeGateway;
use crate::insets::{
    ContentRectReconciler, Insets, LayoutPass, RawInsets, SystemUiVisibility, VisibilityContext,
};
use crate::{HostHandle, WindowExtent};

/// Native side of the activity's content view.
///
/// The Java view forwards `onApplyWindowInsets()` (and, below API level 23,
/// every layout pass) here along with the insets it was given.
#[derive(Debug)]
pub struct ContentView {
    ctx: ActivityContext,
    caps: PlatformCapabilities,
    reconciler: ContentRectReconciler,
    handle: HostHandle,
}

impl ContentView {
    pub fn new(ctx: &ActivityContext, caps: PlatformCapabilities) -> Self {
        Self {
            ctx: ctx.clone(),
            caps,
            reconciler: ContentRectReconciler::new(),
            handle: HostHandle::NULL,
        }
    }

    pub fn handle(&self) -> HostHandle {
        self.handle
    }

    /// Set by the native side when it attaches, and cleared to
    /// [`HostHandle::NULL`] when it tears down.
    pub fn set_handle(&mut self, handle: HostHandle) {
        self.handle = handle;
    }

    pub fn reconciler(&self) -> &ContentRectReconciler {
        &self.reconciler
    }

    /// Reads the current layout of `view` and forwards the content rect if it
    /// changed. Returns whether anything was delivered.
    ///
    /// `dispatched_insets` is the `WindowInsets` passed to
    /// `onApplyWindowInsets()`; it is only read where the root window insets
    /// aren't available.
    pub fn on_apply_window_insets<G: BridgeGateway>(
        &mut self,
        gateway: &mut G,
        view: &JObject<'_>,
        dispatched_insets: &JObject<'_>,
    ) -> Result<bool> {
        let pass = self
            .ctx
            .with_env(|env| read_layout_pass(env, &self.ctx, &self.caps, view, dispatched_insets))?;
        let Some(pass) = pass else {
            trace!("No window insets available yet");
            return Ok(false);
        };
        Ok(self.reconciler.apply(gateway, self.handle, &pass))
    }

    /// Applies `mode` to the decor view together with the layout flags that
    /// keep the content view behind the system bars.
    pub fn set_ui_visibility(&self, mode: SystemUiVisibility) -> Result<()> {
        let flags = SystemUiVisibility::with_common_layout(mode);
        trace!("Setting system UI visibility {flags:?}");
        self.ctx.with_env(|env| {
            let window = env
                .call_method(self.ctx.activity(), "getWindow", "()Landroid/view/Window;", &[])?
                .l()?;
            let decor = env
                .call_method(&window, "getDecorView", "()Landroid/view/View;", &[])?
                .l()?;
            env.call_method(
                &decor,
                "setSystemUiVisibility",
                "(I)V",
                &[(flags.bits() as i32).into()],
            )?;
            Ok(())
        })?;
        Ok(())
    }
}

fn extent(env: &mut JNIEnv<'_>, view: &JObject<'_>) -> jni::errors::Result<WindowExtent> {
    let width = env.call_method(view, "getWidth", "()I", &[])?.i()?;
    let height = env.call_method(view, "getHeight", "()I", &[])?.i()?;
    Ok(WindowExtent::new(width, height))
}

fn raw_insets(env: &mut JNIEnv<'_>, insets: &JObject<'_>) -> jni::errors::Result<RawInsets> {
    let mut inset = |name: &str| -> jni::errors::Result<i32> {
        env.call_method(insets, name, "()I", &[])?.i()
    };
    Ok(RawInsets {
        system_window: Insets {
            left: inset("getSystemWindowInsetLeft")?,
            top: inset("getSystemWindowInsetTop")?,
            right: inset("getSystemWindowInsetRight")?,
            bottom: inset("getSystemWindowInsetBottom")?,
        },
        stable_top: inset("getStableInsetTop")?,
    })
}

fn read_layout_pass(
    env: &mut JNIEnv<'_>,
    ctx: &ActivityContext,
    caps: &PlatformCapabilities,
    view: &JObject<'_>,
    dispatched_insets: &JObject<'_>,
) -> jni::errors::Result<Option<LayoutPass>> {
    let view_extent = extent(env, view)?;
    let root = env
        .call_method(view, "getRootView", "()Landroid/view/View;", &[])?
        .l()?;
    let window = extent(env, &root)?;

    let insets = if caps.supports_root_insets() {
        let root_insets = env
            .call_method(view, "getRootWindowInsets", "()Landroid/view/WindowInsets;", &[])?
            .l()?;
        if root_insets.is_null() {
            return Ok(None);
        }
        raw_insets(env, &root_insets)?
    } else {
        if dispatched_insets.is_null() {
            return Ok(None);
        }
        raw_insets(env, dispatched_insets)?
    };

    let multi_window_mode = caps.supports_multi_window()
        && env
            .call_method(ctx.activity(), "isInMultiWindowMode", "()Z", &[])?
            .z()?;
    let flags = env
        .call_method(view, "getWindowSystemUiVisibility", "()I", &[])?
        .i()?;
    let visibility = VisibilityContext::from_ui_visibility(
        multi_window_mode,
        SystemUiVisibility::from_bits_retain(flags as u32),
    );

    Ok(Some(LayoutPass {
        view: view_extent,
        window,
        insets,
        visibility,
    }))
}
