/// Device-side presentation traits
///
/// The core never names a graphics API. A backend implements `PresentDevice`
/// for its logical device and `PresentationSurface` for the swap chain object
/// it creates (images, views, depth buffer, render pass, framebuffers).

use std::fmt::Debug;
use crate::error::Result;
use crate::present::{
    ClearValue, Extent2D, Format, PresentMode, PresentationDesc, Rect2D, SurfaceCapabilities,
    SurfaceFormat, SwapchainStatus, Viewport,
};

/// Backend swap chain with its attachments
///
/// Dropping it releases every backend resource it owns. The device keeps
/// it alive until the replacing presentation has been created.
pub trait PresentationSurface: Send + Sync {
    /// Handle of the render pass compatible with this presentation
    type RenderPass: Copy + Eq + Debug;

    /// Number of images actually created (may exceed the requested minimum)
    fn image_count(&self) -> usize;

    fn extent(&self) -> Extent2D;

    fn color_format(&self) -> Format;

    fn depth_format(&self) -> Format;

    fn render_pass(&self) -> Self::RenderPass;
}

/// Logical device able to present to one surface
pub trait PresentDevice: Send + Sync {
    type Semaphore: Copy + Eq + Debug + Send + Sync;
    type Fence: Copy + Eq + Debug + Send + Sync;
    type CommandBuffer: Copy + Eq + Debug + Send + Sync;
    type Presentation: PresentationSurface;

    // ===== SURFACE QUERIES =====

    fn surface_capabilities(&self) -> Result<SurfaceCapabilities>;

    fn surface_formats(&self) -> Result<Vec<SurfaceFormat>>;

    fn present_modes(&self) -> Result<Vec<PresentMode>>;

    /// Whether `format` can back an optimal-tiling depth/stencil attachment
    fn supports_depth_format(&self, format: Format) -> bool;

    // ===== PRESENTATION =====

    /// Create the swap chain and its attachments
    ///
    /// `previous` is the presentation being replaced, if any; the backend may
    /// hand it to the platform so in-flight images are retired gracefully.
    fn create_presentation(
        &self,
        desc: &PresentationDesc,
        previous: Option<&Self::Presentation>,
    ) -> Result<Self::Presentation>;

    /// Acquire the next image, signalling `image_available` when it is ready
    ///
    /// The index is only meaningful when the status is usable.
    fn acquire_next_image(
        &self,
        presentation: &Self::Presentation,
        image_available: Self::Semaphore,
    ) -> (u32, SwapchainStatus);

    /// Queue `image_index` for display once `wait` is signalled
    fn present(
        &self,
        presentation: &Self::Presentation,
        image_index: u32,
        wait: Self::Semaphore,
    ) -> SwapchainStatus;

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&self) -> Result<Self::Semaphore>;

    fn create_fence(&self, signaled: bool) -> Result<Self::Fence>;

    fn destroy_semaphore(&self, semaphore: Self::Semaphore);

    fn destroy_fence(&self, fence: Self::Fence);

    /// Block until the fence is signalled (no timeout)
    fn wait_for_fence(&self, fence: Self::Fence) -> Result<()>;

    fn reset_fence(&self, fence: Self::Fence) -> Result<()>;

    /// Submit one command buffer to the graphics queue
    ///
    /// Waits on `wait` at the color-attachment-output stage, signals `signal`
    /// and `fence` on completion.
    fn submit(
        &self,
        command_buffer: Self::CommandBuffer,
        wait: Self::Semaphore,
        signal: Self::Semaphore,
        fence: Self::Fence,
    ) -> Result<()>;

    /// Block until the device has no pending work
    fn wait_idle(&self) -> Result<()>;

    // ===== COMMAND BUFFERS =====

    /// Allocate `count` primary command buffers from the device's pool
    fn allocate_command_buffers(&self, count: usize) -> Result<Vec<Self::CommandBuffer>>;

    fn free_command_buffers(&self, command_buffers: &[Self::CommandBuffer]);

    fn begin_command_buffer(&self, command_buffer: Self::CommandBuffer) -> Result<()>;

    fn end_command_buffer(&self, command_buffer: Self::CommandBuffer) -> Result<()>;

    // ===== RECORDING =====

    /// Begin the presentation's render pass on the framebuffer of `image_index`
    fn cmd_begin_render_pass(
        &self,
        command_buffer: Self::CommandBuffer,
        presentation: &Self::Presentation,
        image_index: u32,
        clear_values: &[ClearValue],
    );

    fn cmd_set_viewport(&self, command_buffer: Self::CommandBuffer, viewport: Viewport);

    fn cmd_set_scissor(&self, command_buffer: Self::CommandBuffer, scissor: Rect2D);

    fn cmd_end_render_pass(&self, command_buffer: Self::CommandBuffer);
}
