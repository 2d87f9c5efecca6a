/// Window surface seen by the presentation layer

use std::time::Duration;
use crate::present::Extent2D;

/// Window that presentation targets
///
/// Implemented by the windowing side (e.g. `WindowSurface` in the Vulkan
/// backend). The resize flag is set by the window's event handling and
/// cleared by the renderer once the swap chain has been rebuilt.
///
/// Creating the API-specific presentation handle (a `VkSurfaceKHR` for
/// Vulkan) is not part of this trait, since its signature depends on the
/// graphics API. Backends expose it on their own surface type, e.g.
/// `WindowSurface::create_presentation_handle`, and call it while building
/// their `PresentDevice`.
///
/// `current_extent` must reflect the window's size at the time of the call:
/// the renderer polls it in a loop while the window is minimized.
pub trait Surface: Send + Sync {
    /// Current drawable size in pixels, (0, 0) while minimized
    fn current_extent(&self) -> Extent2D;

    /// True when the window was resized since the last swap chain rebuild
    fn resize_pending(&self) -> bool;

    /// Acknowledge a pending resize
    fn clear_resize_flag(&self);

    /// Block while the window has no drawable area
    ///
    /// Called in a loop while `current_extent` is degenerate. The default
    /// simply sleeps; windowing layers that can pump events should do so.
    fn wait_events(&self, interval: Duration) {
        std::thread::sleep(interval);
    }
}
