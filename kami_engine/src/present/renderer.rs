/// Frame orchestration: begin/end frame protocol and swap chain recreation
///
/// The renderer owns the active swap chain and one reusable command buffer per
/// swap chain image. It is driven from a single thread:
///
/// ```text
/// loop {
///     if let Some(cmd) = renderer.begin_frame()? {
///         renderer.begin_swap_chain_render_pass(cmd)?;
///         // record draws
///         renderer.end_swap_chain_render_pass(cmd)?;
///         renderer.end_frame()?;
///     }
/// }
/// ```

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::present::negotiation::choose_extent;
use crate::present::sync::MAX_FRAMES_IN_FLIGHT;
use crate::present::{
    ClearValue, ColorSpace, Extent2D, Format, PresentDevice, PresentMode, PresentationSurface,
    Rect2D, Surface, SurfaceFormat, SwapChain, SwapchainStatus, Viewport,
};
use crate::{engine_bail, engine_contract, engine_debug, engine_err, engine_error, engine_warn};

const SOURCE: &str = "kami::Renderer";

// ============================================================================
// RendererConfig
// ============================================================================

/// Presentation preferences
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Exact (format, color space) pair to look for first
    pub preferred_surface_format: SurfaceFormat,

    /// Present modes in order of preference; FIFO is the implicit fallback
    pub preferred_present_modes: Vec<PresentMode>,

    /// Depth formats in order of preference
    pub depth_format_candidates: Vec<Format>,

    /// Color attachment clear value (RGBA)
    pub clear_color: [f32; 4],

    /// Sleep between surface polls while the window is minimized
    pub resize_poll_interval: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            preferred_surface_format: SurfaceFormat::new(
                Format::B8G8R8A8_SRGB,
                ColorSpace::SrgbNonlinear,
            ),
            preferred_present_modes: vec![PresentMode::Mailbox],
            depth_format_candidates: vec![
                Format::D32_FLOAT,
                Format::D32_FLOAT_S8_UINT,
                Format::D24_UNORM_S8_UINT,
            ],
            clear_color: [0.01, 0.01, 0.01, 1.0],
            resize_poll_interval: Duration::from_millis(16),
        }
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Frame protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    FrameStarted,
}

/// Drives presentation for one surface
pub struct Renderer<D: PresentDevice, S: Surface> {
    device: Arc<D>,
    surface: Arc<S>,
    config: RendererConfig,

    /// `None` only if a recreation failed
    swap_chain: Option<SwapChain<D>>,

    /// One per swap chain image, indexed by image index
    command_buffers: Vec<D::CommandBuffer>,

    current_image_index: u32,
    current_frame_index: usize,
    state: FrameState,

    /// Latched until `take_render_pass_changed`
    render_pass_changed: bool,
}

impl<D: PresentDevice, S: Surface> Renderer<D, S> {
    /// Create the renderer and its first swap chain
    ///
    /// Blocks while the surface is minimized.
    pub fn new(device: Arc<D>, surface: Arc<S>, config: RendererConfig) -> Result<Self> {
        let mut renderer = Self {
            device,
            surface,
            config,
            swap_chain: None,
            command_buffers: Vec::new(),
            current_image_index: 0,
            current_frame_index: 0,
            state: FrameState::Idle,
            render_pass_changed: false,
        };

        renderer.recreate_swap_chain()?;

        Ok(renderer)
    }

    // ===== FRAME PROTOCOL =====

    /// Start a frame
    ///
    /// Returns `Ok(None)` when the swap chain was stale and has been rebuilt;
    /// the caller skips this iteration and must not call `end_frame`.
    pub fn begin_frame(&mut self) -> Result<Option<D::CommandBuffer>> {
        engine_contract!(
            self.state == FrameState::Idle,
            SOURCE,
            "begin_frame called while a frame is already in progress"
        );

        let (image_index, status) = self.active_swap_chain_mut()?.acquire_next_image();

        match status {
            SwapchainStatus::Stale => {
                self.recreate_swap_chain()?;
                return Ok(None);
            }
            SwapchainStatus::Fatal(reason) => {
                engine_bail!(SOURCE, "Failed to acquire swap chain image: {}", reason);
            }
            SwapchainStatus::Ok | SwapchainStatus::Suboptimal => {}
        }

        let command_buffer = self
            .command_buffers
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| {
                engine_err!(
                    SOURCE,
                    "Acquired image index {} has no command buffer ({} allocated)",
                    image_index,
                    self.command_buffers.len()
                )
            })?;

        self.device.begin_command_buffer(command_buffer)?;

        self.current_image_index = image_index;
        self.state = FrameState::FrameStarted;

        Ok(Some(command_buffer))
    }

    /// Finish recording, submit and present the current frame
    ///
    /// Rebuilds the swap chain once if presentation reported it stale or
    /// suboptimal, or if the surface was resized.
    pub fn end_frame(&mut self) -> Result<()> {
        engine_contract!(
            self.state == FrameState::FrameStarted,
            SOURCE,
            "end_frame called while no frame is in progress"
        );
        self.state = FrameState::Idle;

        let command_buffer = self.command_buffers[self.current_image_index as usize];
        self.device.end_command_buffer(command_buffer)?;

        let image_index = self.current_image_index;
        let status = self
            .active_swap_chain_mut()?
            .submit_command_buffers(command_buffer, image_index);

        self.current_frame_index = (self.current_frame_index + 1) % MAX_FRAMES_IN_FLIGHT;

        if let SwapchainStatus::Fatal(reason) = &status {
            engine_bail!(SOURCE, "Failed to present swap chain image: {}", reason);
        }

        if status.needs_recreation() || self.surface.resize_pending() {
            self.recreate_swap_chain()?;
        }

        Ok(())
    }

    /// Begin the swap chain render pass on the frame's command buffer
    ///
    /// Clears color and depth, then sets a full-extent viewport and scissor.
    pub fn begin_swap_chain_render_pass(&self, command_buffer: D::CommandBuffer) -> Result<()> {
        self.check_frame_command_buffer(command_buffer, "begin_swap_chain_render_pass")?;

        let swap_chain = self.active_swap_chain()?;
        let extent = swap_chain.extent();
        let clear_values = [
            ClearValue::Color(self.config.clear_color),
            ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
        ];

        self.device.cmd_begin_render_pass(
            command_buffer,
            swap_chain.presentation(),
            self.current_image_index,
            &clear_values,
        );
        self.device.cmd_set_viewport(command_buffer, Viewport::full(extent));
        self.device.cmd_set_scissor(command_buffer, Rect2D::full(extent));

        Ok(())
    }

    pub fn end_swap_chain_render_pass(&self, command_buffer: D::CommandBuffer) -> Result<()> {
        self.check_frame_command_buffer(command_buffer, "end_swap_chain_render_pass")?;
        self.device.cmd_end_render_pass(command_buffer);
        Ok(())
    }

    fn check_frame_command_buffer(&self, command_buffer: D::CommandBuffer, operation: &str) -> Result<()> {
        engine_contract!(
            self.state == FrameState::FrameStarted,
            SOURCE,
            "{} called while no frame is in progress",
            operation
        );
        let expected = self.command_buffers[self.current_image_index as usize];
        engine_contract!(
            command_buffer == expected,
            SOURCE,
            "{} called on {:?}, but the current frame records into {:?}",
            operation,
            command_buffer,
            expected
        );
        Ok(())
    }

    // ===== SWAP CHAIN RECREATION =====

    /// Rebuild the swap chain for the current surface extent
    ///
    /// Polls while the surface or the device reports no drawable area, waits
    /// for the device to go idle, then replaces the swap chain with one built from its predecessor.
    pub fn recreate_swap_chain(&mut self) -> Result<()> {
        engine_contract!(
            self.state == FrameState::Idle,
            SOURCE,
            "Cannot recreate the swap chain while a frame is in progress"
        );

        let mut extent = self.drawable_extent()?;
        if extent.is_degenerate() {
            engine_warn!(
                SOURCE,
                "Surface extent is {}x{}, waiting for the window to be restored",
                extent.width,
                extent.height
            );
            while extent.is_degenerate() {
                self.surface.wait_events(self.config.resize_poll_interval);
                extent = self.drawable_extent()?;
            }
        }

        self.device.wait_idle()?;

        let previous_format = self.swap_chain.as_ref().map(|s| s.swap_format());
        let swap_chain = match self.swap_chain.take() {
            None => SwapChain::new(Arc::clone(&self.device), extent, &self.config)?,
            Some(previous) => {
                SwapChain::from_predecessor(Arc::clone(&self.device), extent, &self.config, previous)?
            }
        };

        if let Some(previous_format) = previous_format {
            if !swap_chain.compare_swap_format(&previous_format) {
                engine_warn!(
                    SOURCE,
                    "Swap chain format changed ({:?} -> {:?}), render pass clients must rebuild their pipelines",
                    previous_format,
                    swap_chain.swap_format()
                );
                self.render_pass_changed = true;
            }
        }

        let image_count = swap_chain.image_count();
        self.swap_chain = Some(swap_chain);
        self.surface.clear_resize_flag();

        if image_count != self.command_buffers.len() {
            self.reallocate_command_buffers(image_count)?;
        }

        Ok(())
    }

    /// Extent a swap chain would be built at right now
    ///
    /// The window and the device can disagree (a minimized window may still
    /// report its old size while the device reports a fixed 0x0), so the
    /// window size is resolved against the device's current capabilities.
    fn drawable_extent(&self) -> Result<Extent2D> {
        let requested = self.surface.current_extent();
        if requested.is_degenerate() {
            return Ok(requested);
        }
        Ok(choose_extent(requested, &self.device.surface_capabilities()?))
    }

    fn reallocate_command_buffers(&mut self, count: usize) -> Result<()> {
        if !self.command_buffers.is_empty() {
            self.device.free_command_buffers(&self.command_buffers);
            self.command_buffers.clear();
        }

        self.command_buffers = self.device.allocate_command_buffers(count)?;

        engine_debug!(SOURCE, "Allocated {} command buffers", count);
        Ok(())
    }

    /// True once after a recreation changed the swap format
    ///
    /// Pipelines built against the old render pass must be rebuilt.
    pub fn take_render_pass_changed(&mut self) -> bool {
        std::mem::take(&mut self.render_pass_changed)
    }

    // ===== ACCESSORS =====

    fn active_swap_chain(&self) -> Result<&SwapChain<D>> {
        self.swap_chain
            .as_ref()
            .ok_or_else(|| engine_err!(SOURCE, "No swap chain (a previous recreation failed)"))
    }

    fn active_swap_chain_mut(&mut self) -> Result<&mut SwapChain<D>> {
        self.swap_chain
            .as_mut()
            .ok_or_else(|| engine_err!(SOURCE, "No swap chain (a previous recreation failed)"))
    }

    /// Command buffer of the frame in progress
    pub fn current_command_buffer(&self) -> Result<D::CommandBuffer> {
        engine_contract!(
            self.state == FrameState::FrameStarted,
            SOURCE,
            "Cannot get command buffer when frame not in progress"
        );
        Ok(self.command_buffers[self.current_image_index as usize])
    }

    /// Frame slot of the frame in progress
    pub fn frame_index(&self) -> Result<usize> {
        engine_contract!(
            self.state == FrameState::FrameStarted,
            SOURCE,
            "Cannot get frame index when frame not in progress"
        );
        Ok(self.current_frame_index)
    }

    pub fn render_pass(&self) -> Result<<D::Presentation as PresentationSurface>::RenderPass> {
        Ok(self.active_swap_chain()?.render_pass())
    }

    pub fn is_frame_in_progress(&self) -> bool {
        self.state == FrameState::FrameStarted
    }

    pub fn frame_state(&self) -> FrameState {
        self.state
    }

    /// Extent of the active swap chain, (0, 0) without one
    pub fn extent(&self) -> Extent2D {
        self.swap_chain.as_ref().map(|s| s.extent()).unwrap_or_default()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.extent().aspect_ratio()
    }

    pub fn image_count(&self) -> usize {
        self.swap_chain.as_ref().map_or(0, |s| s.image_count())
    }

    pub fn command_buffer_count(&self) -> usize {
        self.command_buffers.len()
    }

    pub fn swap_chain(&self) -> Option<&SwapChain<D>> {
        self.swap_chain.as_ref()
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }
}

impl<D: PresentDevice, S: Surface> Drop for Renderer<D, S> {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            engine_error!(SOURCE, "wait_idle failed during shutdown: {}", e);
        }

        if !self.command_buffers.is_empty() {
            self.device.free_command_buffers(&self.command_buffers);
            self.command_buffers.clear();
        }

        self.swap_chain = None;
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
