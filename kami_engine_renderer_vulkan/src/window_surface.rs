/// WindowSurface - winit window seen by the presentation layer
///
/// Wraps the application's window, tracks pending resizes and creates the
/// `VkSurfaceKHR` the device presents to.

use ash::vk;
use kami_engine::kami::present::{Extent2D, Surface};
use kami_engine::kami::{Error, Result};
use kami_engine::engine_error;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use winit::window::Window;

const SOURCE: &str = "kami::vulkan";

/// winit-backed presentation surface
///
/// The application forwards `WindowEvent::Resized` to [`notify_resized`];
/// the renderer clears the flag once the swap chain has been rebuilt.
///
/// `current_extent` queries the window directly (`inner_size`,
/// `is_minimized`) rather than a size cached from events. Swap chain
/// recreation usually runs inside the winit event handler, where the event
/// loop cannot be pumped, so while minimized the renderer sleeps between
/// queries. Applications driving their own loop (e.g. with
/// `EventLoopExtPumpEvents`) can install [`with_event_pump`] instead.
///
/// [`notify_resized`]: WindowSurface::notify_resized
/// [`with_event_pump`]: WindowSurface::with_event_pump
pub struct WindowSurface {
    window: Arc<Window>,
    resized: AtomicBool,
    event_pump: Option<Box<dyn Fn(Duration) + Send + Sync>>,
}

impl WindowSurface {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            resized: AtomicBool::new(false),
            event_pump: None,
        }
    }

    /// Process window events while the renderer waits for a drawable area
    ///
    /// `pump` receives the poll interval and should block at most that long.
    pub fn with_event_pump<F>(mut self, pump: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_pump = Some(Box::new(pump));
        self
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Record that the window's drawable size changed
    pub fn notify_resized(&self) {
        self.resized.store(true, Ordering::Release);
    }

    /// Instance extensions needed to present to this window's display
    pub fn required_instance_extensions(&self) -> Result<Vec<*const c_char>> {
        let display_handle = self.window.display_handle()
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;

        let extensions = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to get required extensions: {:?}", e);
                Error::InitializationFailed(format!("Failed to get required extensions: {:?}", e))
            })?;

        Ok(extensions.to_vec())
    }

    /// Create the platform surface for this window
    ///
    /// The caller owns the returned handle and destroys it with the surface
    /// loader before destroying `instance`.
    pub fn create_presentation_handle(
        &self,
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Result<vk::SurfaceKHR> {
        let display_handle = self.window.display_handle()
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
        let window_handle = self.window.window_handle()
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;

        unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })
        }
    }
}

impl Surface for WindowSurface {
    fn current_extent(&self) -> Extent2D {
        // Some platforms keep reporting the restored size while minimized
        if self.window.is_minimized() == Some(true) {
            return Extent2D::new(0, 0);
        }
        let size = self.window.inner_size();
        Extent2D::new(size.width, size.height)
    }

    fn resize_pending(&self) -> bool {
        self.resized.load(Ordering::Acquire)
    }

    fn clear_resize_flag(&self) {
        self.resized.store(false, Ordering::Release);
    }

    fn wait_events(&self, interval: Duration) {
        match &self.event_pump {
            Some(pump) => pump(interval),
            None => std::thread::sleep(interval),
        }
    }
}
