/*!
# Kami Engine - Vulkan Presentation Backend

Vulkan implementation of the kami_engine presentation traits.

This crate provides a `PresentDevice` built on Ash, a swap chain presentation
with gpu-allocator backed depth buffers, and a winit window surface.

```no_run
use kami_engine::kami::Renderer;
use kami_engine_renderer_vulkan::kami::{VulkanConfig, VulkanDevice, WindowSurface};
use std::sync::Arc;

# fn run(window: Arc<winit::window::Window>) -> kami_engine::kami::Result<()> {
let surface = Arc::new(WindowSurface::new(window));
let device = Arc::new(VulkanDevice::new(surface.clone(), VulkanConfig::default())?);
let mut renderer = Renderer::new(device, surface, Default::default())?;

if let Some(cmd) = renderer.begin_frame()? {
    renderer.begin_swap_chain_render_pass(cmd)?;
    renderer.end_swap_chain_render_pass(cmd)?;
    renderer.end_frame()?;
}
# Ok(())
# }
```
*/

mod vulkan_format;
mod vulkan_device;
mod vulkan_presentation;
mod window_surface;

#[cfg(feature = "vulkan-validation")]
mod debug;

/// Public API of the Vulkan backend
pub mod kami {
    pub use crate::vulkan_device::{DebugSeverity, VulkanConfig, VulkanDevice};
    pub use crate::vulkan_presentation::VulkanPresentation;
    pub use crate::window_surface::WindowSurface;

    #[cfg(feature = "vulkan-validation")]
    pub use crate::debug::{print_validation_stats_report, validation_stats, ValidationStats};
}
