/// Swap chain: presentation surface + frame synchronization
///
/// Owns the backend presentation and a `SyncSet`, and implements the
/// acquire / submit / present protocol on top of the `PresentDevice` traits.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::present::negotiation::negotiate;
use crate::present::sync::SyncSet;
use crate::present::{
    Extent2D, Format, PresentDevice, PresentationSurface, RendererConfig, SwapFormat,
    SwapchainStatus,
};
use crate::{engine_debug, engine_error, engine_info};

/// Active swap chain for one surface
///
/// Created once at startup and rebuilt (through `from_predecessor`) whenever
/// the surface extent changes or presentation reports the chain as stale.
pub struct SwapChain<D: PresentDevice> {
    /// Sync primitives, destroyed before the presentation
    sync: SyncSet<D>,

    /// Backend swap chain, images, depth buffers, render pass, framebuffers
    presentation: D::Presentation,

    device: Arc<D>,
    swap_format: SwapFormat,
    extent: Extent2D,
}

impl<D: PresentDevice> SwapChain<D> {
    /// Build the first swap chain for a surface of `extent`
    pub fn new(device: Arc<D>, extent: Extent2D, config: &RendererConfig) -> Result<Self> {
        Self::build(device, extent, config, None, 0)
    }

    /// Build a swap chain replacing `previous`
    ///
    /// The predecessor's presentation is handed to the device during
    /// construction, then the predecessor is released. Its frame slot index
    /// carries over to the new chain.
    pub fn from_predecessor(
        device: Arc<D>,
        extent: Extent2D,
        config: &RendererConfig,
        previous: SwapChain<D>,
    ) -> Result<Self> {
        engine_info!(
            "kami::SwapChain",
            "Recreating swap chain: {}x{} -> {}x{}",
            previous.extent.width,
            previous.extent.height,
            extent.width,
            extent.height
        );

        let current_frame = previous.current_frame();
        let swap_chain = Self::build(device, extent, config, Some(&previous), current_frame)?;
        drop(previous);
        Ok(swap_chain)
    }

    fn build(
        device: Arc<D>,
        extent: Extent2D,
        config: &RendererConfig,
        previous: Option<&SwapChain<D>>,
        current_frame: usize,
    ) -> Result<Self> {
        reject_degenerate(extent)?;

        // A fixed surface extent overrides the request and can itself be 0x0
        let desc = negotiate(device.as_ref(), extent, config)?;
        reject_degenerate(desc.extent)?;

        let presentation =
            device.create_presentation(&desc, previous.map(|p| &p.presentation))?;

        let sync = SyncSet::starting_at(Arc::clone(&device), presentation.image_count(), current_frame)?;

        let swap_format = SwapFormat {
            color: presentation.color_format(),
            depth: presentation.depth_format(),
        };

        engine_debug!(
            "kami::SwapChain",
            "Swap chain ready: {} images, {}x{}",
            presentation.image_count(),
            presentation.extent().width,
            presentation.extent().height
        );

        Ok(Self {
            sync,
            extent: presentation.extent(),
            presentation,
            device,
            swap_format,
        })
    }

    /// Acquire the next presentable image
    ///
    /// Blocks on the current frame slot's fence, then on the fence of the last
    /// submission that used the returned image, if any. The index is only
    /// valid when the status is usable.
    pub fn acquire_next_image(&mut self) -> (u32, SwapchainStatus) {
        let slot = self.sync.current_slot();

        if let Err(e) = self.device.wait_for_fence(slot.in_flight) {
            return (0, SwapchainStatus::Fatal(e.to_string()));
        }

        let (image_index, status) = self
            .device
            .acquire_next_image(&self.presentation, slot.image_available);

        if !status.is_usable() {
            return (image_index, status);
        }

        if let Some(fence) = self.sync.images_in_flight().pending(image_index as usize) {
            if let Err(e) = self.device.wait_for_fence(fence) {
                return (image_index, SwapchainStatus::Fatal(e.to_string()));
            }
        }

        (image_index, status)
    }

    /// Submit `command_buffer` for `image_index` and present the image
    ///
    /// The frame slot advances whatever the outcome.
    pub fn submit_command_buffers(
        &mut self,
        command_buffer: D::CommandBuffer,
        image_index: u32,
    ) -> SwapchainStatus {
        let status = self.submit_and_present(command_buffer, image_index);
        self.sync.advance();
        status
    }

    fn submit_and_present(&mut self, command_buffer: D::CommandBuffer, image_index: u32) -> SwapchainStatus {
        let slot = self.sync.current_slot();
        let index = image_index as usize;

        if let Some(fence) = self.sync.images_in_flight().pending(index) {
            if let Err(e) = self.device.wait_for_fence(fence) {
                return SwapchainStatus::Fatal(e.to_string());
            }
        }
        self.sync.images_in_flight_mut().guard(index, slot.in_flight);

        if let Err(e) = self.device.reset_fence(slot.in_flight) {
            return SwapchainStatus::Fatal(e.to_string());
        }

        if let Err(e) = self.device.submit(
            command_buffer,
            slot.image_available,
            slot.render_finished,
            slot.in_flight,
        ) {
            return SwapchainStatus::Fatal(e.to_string());
        }

        self.device
            .present(&self.presentation, image_index, slot.render_finished)
    }

    /// True iff both color and depth formats match `other`
    pub fn compare_swap_format(&self, other: &SwapFormat) -> bool {
        self.swap_format == *other
    }

    pub fn swap_format(&self) -> SwapFormat {
        self.swap_format
    }

    pub fn color_format(&self) -> Format {
        self.swap_format.color
    }

    pub fn depth_format(&self) -> Format {
        self.swap_format.depth
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    pub fn extent_aspect_ratio(&self) -> f32 {
        self.extent.aspect_ratio()
    }

    pub fn image_count(&self) -> usize {
        self.presentation.image_count()
    }

    pub fn render_pass(&self) -> <D::Presentation as PresentationSurface>::RenderPass {
        self.presentation.render_pass()
    }

    /// Frame slot used by the next acquire
    pub fn current_frame(&self) -> usize {
        self.sync.current_frame()
    }

    pub fn presentation(&self) -> &D::Presentation {
        &self.presentation
    }
}

fn reject_degenerate(extent: Extent2D) -> Result<()> {
    if extent.is_degenerate() {
        let message = format!(
            "Cannot build a swap chain for a degenerate extent {}x{}",
            extent.width, extent.height
        );
        engine_error!("kami::SwapChain", "{}", message);
        return Err(Error::InvalidResource(message));
    }
    Ok(())
}

#[cfg(test)]
#[path = "swap_chain_tests.rs"]
mod tests;
