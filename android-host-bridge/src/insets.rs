use bitflags::bitflags;
use log::trace;

use crate::gateway::BridgeGateway;
use crate::{HostHandle, Rect, WindowExtent};

bitflags! {
    /// `View.SYSTEM_UI_FLAG_*` visibility flags.
    ///
    /// See [the View docs](https://developer.android.com/reference/android/view/View#SYSTEM_UI_FLAG_VISIBLE)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SystemUiVisibility: u32 {
        const LOW_PROFILE = 0x0000_0001;
        const HIDE_NAVIGATION = 0x0000_0002;
        const FULLSCREEN = 0x0000_0004;
        const LAYOUT_STABLE = 0x0000_0100;
        const LAYOUT_HIDE_NAVIGATION = 0x0000_0200;
        const LAYOUT_FULLSCREEN = 0x0000_0400;
        const IMMERSIVE = 0x0000_0800;
        const IMMERSIVE_STICKY = 0x0000_1000;

        // Forward compatibility with flags we don't know about
        const _ = !0;
    }
}

impl SystemUiVisibility {
    /// Layout flags that are always requested so the content view is laid
    /// out behind the system bars and receives insets for them.
    pub const COMMON_LAYOUT: Self = Self::LAYOUT_FULLSCREEN.union(Self::LAYOUT_HIDE_NAVIGATION);

    /// The flags to apply for a requested visibility `mode`.
    pub fn with_common_layout(mode: Self) -> Self {
        mode | Self::COMMON_LAYOUT
    }

    pub fn navigation_hidden(&self) -> bool {
        self.contains(Self::HIDE_NAVIGATION)
    }
}

/// Insets reserved by the system on each edge of the window.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Insets {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// The inset values read from the root window insets on a layout pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct RawInsets {
    /// `getSystemWindowInset*()`; these fluctuate while the window is resized.
    pub system_window: Insets,

    /// `getStableInsetTop()`; used in place of the system window top in
    /// multi-window mode.
    pub stable_top: i32,
}

/// Window state that decides which insets steal drawing area.
///
/// This is read fresh from the platform on every pass, never cached.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct VisibilityContext {
    pub multi_window_mode: bool,
    pub navigation_bar_hidden: bool,
}

impl VisibilityContext {
    pub fn from_ui_visibility(multi_window_mode: bool, flags: SystemUiVisibility) -> Self {
        Self {
            multi_window_mode,
            navigation_bar_hidden: flags.navigation_hidden(),
        }
    }

    /// Whether the navigation bar insets apply to the content rect.
    ///
    /// In multi-window mode the navigation bar is always present, whatever
    /// visibility flags the app has set.
    pub fn applies_navigation_insets(&self) -> bool {
        self.multi_window_mode || !self.navigation_bar_hidden
    }
}

/// Everything read from the view hierarchy on one layout pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct LayoutPass {
    /// Size of the content view itself; zero until it has been laid out.
    pub view: WindowExtent,
    /// Size of the root view, reported to the native side as the window size.
    pub window: WindowExtent,
    pub insets: RawInsets,
    pub visibility: VisibilityContext,
}

impl LayoutPass {
    /// The usable content rectangle for this pass, or `None` while layout
    /// hasn't settled.
    pub fn content_rect(&self) -> Option<Rect> {
        if self.view.is_empty() || self.window.is_empty() {
            return None;
        }

        let system = &self.insets.system_window;
        let mut rect = Rect::new(0, system.top, self.window.width, self.window.height);
        if self.visibility.multi_window_mode {
            rect.top = self.insets.stable_top;
        }
        if self.visibility.applies_navigation_insets() {
            rect.left += system.left;
            rect.right -= system.right;
            rect.bottom -= system.bottom;
        }
        Some(rect.normalized())
    }
}

/// The content rect and window size last forwarded to the native side.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct InsetSnapshot {
    pub rect: Rect,
    pub extent: WindowExtent,
}

/// Turns the stream of layout passes into content rect changes.
///
/// The framework re-applies insets on every layout pass, which happens many
/// times per second during animations, so only passes that actually change
/// the rectangle or the window size produce a delivery.
#[derive(Debug, Default)]
pub struct ContentRectReconciler {
    snapshot: InsetSnapshot,
}

impl ContentRectReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last snapshot that was accepted.
    pub fn snapshot(&self) -> InsetSnapshot {
        self.snapshot
    }

    /// Computes the content rect for `pass` and, if it differs from the last
    /// one delivered, records and returns it.
    ///
    /// Nothing is recorded while `handle` is null, so a change that couldn't
    /// be delivered stays pending.
    pub fn reconcile(&mut self, handle: HostHandle, pass: &LayoutPass) -> Option<InsetSnapshot> {
        let Some(rect) = pass.content_rect() else {
            trace!("Skipping inset pass, layout not settled: {:?}", pass.view);
            return None;
        };
        let candidate = InsetSnapshot {
            rect,
            extent: pass.window,
        };
        if candidate == self.snapshot {
            return None;
        }
        if handle.is_null() {
            trace!("Content rect changed to {candidate:?} with no native receiver attached");
            return None;
        }

        trace!("Content rect changed: {:?} -> {candidate:?}", self.snapshot);
        self.snapshot = candidate;
        Some(candidate)
    }

    /// [`reconcile()`](Self::reconcile) and forward any change to `gateway`.
    pub fn apply<G: BridgeGateway>(
        &mut self,
        gateway: &mut G,
        handle: HostHandle,
        pass: &LayoutPass,
    ) -> bool {
        match self.reconcile(handle, pass) {
            Some(snapshot) => {
                gateway.on_content_rect_changed(handle, snapshot.rect, snapshot.extent);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{Delivery, RecordingGateway};

    const HANDLE: HostHandle = HostHandle::from_raw(0xdead_beef);

    fn portrait_pass(bottom: i32, navigation_bar_hidden: bool) -> LayoutPass {
        LayoutPass {
            view: WindowExtent::new(1080, 1920),
            window: WindowExtent::new(1080, 1920),
            insets: RawInsets {
                system_window: Insets {
                    left: 0,
                    top: 80,
                    right: 0,
                    bottom,
                },
                stable_top: 80,
            },
            visibility: VisibilityContext {
                multi_window_mode: false,
                navigation_bar_hidden,
            },
        }
    }

    #[test]
    fn hidden_navigation_bar_keeps_full_height() {
        let mut reconciler = ContentRectReconciler::new();
        let snapshot = reconciler
            .reconcile(HANDLE, &portrait_pass(0, true))
            .unwrap();
        assert_eq!(snapshot.rect, Rect::new(0, 80, 1080, 1920));
        assert_eq!(snapshot.extent, WindowExtent::new(1080, 1920));
    }

    #[test]
    fn visible_navigation_bar_takes_bottom_inset() {
        let mut reconciler = ContentRectReconciler::new();
        let snapshot = reconciler
            .reconcile(HANDLE, &portrait_pass(120, false))
            .unwrap();
        assert_eq!(snapshot.rect, Rect::new(0, 80, 1080, 1800));
    }

    #[test]
    fn hidden_navigation_bar_ignores_side_insets() {
        let mut pass = portrait_pass(120, true);
        pass.insets.system_window.left = 30;
        pass.insets.system_window.right = 40;
        let snapshot = ContentRectReconciler::new()
            .reconcile(HANDLE, &pass)
            .unwrap();
        assert_eq!(snapshot.rect, Rect::new(0, 80, 1080, 1920));
    }

    #[test]
    fn identical_pass_delivered_once() {
        let mut reconciler = ContentRectReconciler::new();
        let mut gateway = RecordingGateway::default();
        let pass = portrait_pass(0, true);
        assert!(reconciler.apply(&mut gateway, HANDLE, &pass));
        assert!(!reconciler.apply(&mut gateway, HANDLE, &pass));
        assert_eq!(
            gateway.deliveries,
            vec![Delivery::ContentRect(
                HANDLE,
                Rect::new(0, 80, 1080, 1920),
                WindowExtent::new(1080, 1920)
            )]
        );
    }

    #[test]
    fn window_size_change_alone_is_delivered() {
        let mut reconciler = ContentRectReconciler::new();
        let mut pass = portrait_pass(0, true);
        assert!(reconciler.reconcile(HANDLE, &pass).is_some());

        // Same rect, taller root view
        pass.window.height = 2000;
        pass.insets.system_window.bottom = 80;
        pass.visibility.navigation_bar_hidden = false;
        let snapshot = reconciler.reconcile(HANDLE, &pass).unwrap();
        assert_eq!(snapshot.rect, Rect::new(0, 80, 1080, 1920));
        assert_eq!(snapshot.extent, WindowExtent::new(1080, 2000));
    }

    #[test]
    fn unsettled_layout_is_ignored() {
        let mut reconciler = ContentRectReconciler::new();
        let mut pass = portrait_pass(0, true);
        pass.view = WindowExtent::new(0, 1920);
        assert_eq!(reconciler.reconcile(HANDLE, &pass), None);
        pass.view = WindowExtent::new(1080, 1920);
        pass.window = WindowExtent::new(1080, 0);
        assert_eq!(reconciler.reconcile(HANDLE, &pass), None);
        assert_eq!(reconciler.snapshot(), InsetSnapshot::default());
    }

    #[test]
    fn multi_window_uses_stable_top_and_navigation_insets() {
        let mut pass = portrait_pass(120, true);
        pass.insets.system_window.top = 0;
        pass.insets.stable_top = 63;
        pass.insets.system_window.left = 10;
        pass.visibility.multi_window_mode = true;
        let snapshot = ContentRectReconciler::new()
            .reconcile(HANDLE, &pass)
            .unwrap();
        assert_eq!(snapshot.rect, Rect::new(10, 63, 1080, 1800));
    }

    #[test]
    fn null_handle_keeps_change_pending() {
        let mut reconciler = ContentRectReconciler::new();
        let pass = portrait_pass(0, true);
        assert_eq!(reconciler.reconcile(HostHandle::NULL, &pass), None);
        assert_eq!(reconciler.snapshot(), InsetSnapshot::default());

        let mut gateway = RecordingGateway::default();
        assert!(!reconciler.apply(&mut gateway, HostHandle::NULL, &pass));
        assert!(gateway.deliveries.is_empty());

        assert!(reconciler.reconcile(HANDLE, &pass).is_some());
    }

    #[test]
    fn oversized_insets_are_normalized() {
        let mut pass = portrait_pass(2500, false);
        pass.insets.system_window.left = 700;
        pass.insets.system_window.right = 700;
        let snapshot = ContentRectReconciler::new()
            .reconcile(HANDLE, &pass)
            .unwrap();
        assert_eq!(snapshot.rect, Rect::new(700, 80, 700, 80));
    }

    #[test]
    fn common_layout_flags_always_applied() {
        let flags = SystemUiVisibility::with_common_layout(
            SystemUiVisibility::HIDE_NAVIGATION | SystemUiVisibility::IMMERSIVE_STICKY,
        );
        assert_eq!(flags.bits(), 0x0000_1602);
        assert!(flags.navigation_hidden());
        assert_eq!(
            SystemUiVisibility::with_common_layout(SystemUiVisibility::empty()),
            SystemUiVisibility::COMMON_LAYOUT
        );
    }

    #[test]
    fn visibility_from_flags() {
        let visibility =
            VisibilityContext::from_ui_visibility(false, SystemUiVisibility::from_bits_retain(0x2));
        assert!(visibility.navigation_bar_hidden);
        assert!(!visibility.applies_navigation_insets());
        let visibility =
            VisibilityContext::from_ui_visibility(true, SystemUiVisibility::HIDE_NAVIGATION);
        assert!(visibility.applies_navigation_insets());
    }
}
