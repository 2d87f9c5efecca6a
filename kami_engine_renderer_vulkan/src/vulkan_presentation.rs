/// VulkanPresentation - swap chain images and their attachments
///
/// Owns the `VkSwapchainKHR`, one color view per image, one depth image per
/// image (allocated through gpu-allocator), the render pass that targets them
/// and one framebuffer per image.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use kami_engine::kami::present::{
    Extent2D, Format, PresentMode, PresentationDesc, PresentationSurface,
};
use kami_engine::kami::{Error, Result};
use kami_engine::{engine_debug, engine_error};
use std::sync::{Arc, Mutex};

use crate::vulkan_device::VulkanDevice;
use crate::vulkan_format::{
    color_space_to_vk, extent_to_vk, format_to_vk, present_mode_to_vk, vk_format_to_format,
};

const SOURCE: &str = "kami::vulkan";

/// Vulkan swap chain with depth attachments, render pass and framebuffers
///
/// Built field by field: if construction fails half way, `Drop` releases
/// whatever was already created (destroying a null handle is a no-op).
pub struct VulkanPresentation {
    device: ash::Device,
    swapchain_loader: ash::khr::swapchain::Device,
    allocator: Arc<Mutex<Allocator>>,

    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,

    depth_images: Vec<vk::Image>,
    depth_allocations: Vec<Allocation>,
    depth_views: Vec<vk::ImageView>,

    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,

    extent: Extent2D,
    color_format: vk::Format,
    depth_format: vk::Format,
    present_mode: PresentMode,
}

impl VulkanPresentation {
    /// Create the presentation described by `desc`
    ///
    /// `old_swapchain` is the swap chain being replaced (or null); it is only
    /// retired here, its owner destroys it afterwards.
    pub(crate) fn new(
        device: &VulkanDevice,
        desc: &PresentationDesc,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<Self> {
        let mut presentation = Self {
            device: device.device().clone(),
            swapchain_loader: device.swapchain_loader().clone(),
            allocator: device.allocator(),
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            depth_images: Vec::new(),
            depth_allocations: Vec::new(),
            depth_views: Vec::new(),
            render_pass: vk::RenderPass::null(),
            framebuffers: Vec::new(),
            extent: desc.extent,
            color_format: format_to_vk(desc.surface_format.format),
            depth_format: format_to_vk(desc.depth_format),
            present_mode: desc.present_mode,
        };

        presentation.create_swapchain(device, desc, old_swapchain)?;
        presentation.create_image_views()?;
        presentation.create_depth_resources()?;
        presentation.create_render_pass()?;
        presentation.create_framebuffers()?;

        engine_debug!(
            SOURCE,
            "Created presentation {}x{} with {} images ({:?}, depth {:?})",
            presentation.extent.width,
            presentation.extent.height,
            presentation.images.len(),
            presentation.color_format,
            presentation.depth_format
        );

        Ok(presentation)
    }

    fn create_swapchain(
        &mut self,
        device: &VulkanDevice,
        desc: &PresentationDesc,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<()> {
        let capabilities = device.raw_surface_capabilities()?;

        let queue_family_indices = [device.graphics_queue_family(), device.present_queue_family()];
        let concurrent = queue_family_indices[0] != queue_family_indices[1];

        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(device.surface())
            .min_image_count(desc.min_image_count)
            .image_format(self.color_format)
            .image_color_space(color_space_to_vk(desc.surface_format.color_space))
            .image_extent(extent_to_vk(desc.extent))
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode_to_vk(desc.present_mode))
            .clipped(true)
            .old_swapchain(old_swapchain);

        create_info = if concurrent {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_family_indices)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        unsafe {
            self.swapchain = self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;

            self.images = self.swapchain_loader
                .get_swapchain_images(self.swapchain)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to get swapchain images: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
                })?;
        }

        Ok(())
    }

    fn create_view(&self, image: vk::Image, format: vk::Format, aspect_mask: vk::ImageAspectFlags) -> Result<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe {
            self.device.create_image_view(&create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create image view: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create image view: {:?}", e))
                })
        }
    }

    fn create_image_views(&mut self) -> Result<()> {
        for i in 0..self.images.len() {
            let view = self.create_view(self.images[i], self.color_format, vk::ImageAspectFlags::COLOR)?;
            self.image_views.push(view);
        }
        Ok(())
    }

    fn create_depth_resources(&mut self) -> Result<()> {
        let mut aspect_mask = vk::ImageAspectFlags::DEPTH;
        if vk_format_to_format(self.depth_format).has_stencil() {
            aspect_mask |= vk::ImageAspectFlags::STENCIL;
        }

        for _ in 0..self.images.len() {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(self.depth_format)
                .extent(vk::Extent3D {
                    width: self.extent.width,
                    height: self.extent.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = unsafe {
                let image = self.device.create_image(&image_info, None)
                    .map_err(|e| {
                        engine_error!(SOURCE, "Failed to create depth image: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create depth image: {:?}", e))
                    })?;
                self.depth_images.push(image);

                let requirements = self.device.get_image_memory_requirements(image);

                let allocation = self.allocator
                    .lock()
                    .map_err(|_| {
                        engine_error!(SOURCE, "GPU allocator lock poisoned");
                        Error::BackendError("GPU allocator lock poisoned".to_string())
                    })?
                    .allocate(&AllocationCreateDesc {
                        name: "swapchain_depth_image",
                        requirements,
                        location: MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_e| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        engine_error!(
                            SOURCE,
                            "Out of GPU memory for depth image ({}x{}, {:.2} MB)",
                            self.extent.width,
                            self.extent.height,
                            size_mb
                        );
                        Error::OutOfMemory
                    })?;

                let bind_result = self.device.bind_image_memory(image, allocation.memory(), allocation.offset());
                self.depth_allocations.push(allocation);
                bind_result.map_err(|e| {
                    engine_error!(SOURCE, "Failed to bind depth image memory: {:?}", e);
                    Error::InitializationFailed(format!("Failed to bind depth image memory: {:?}", e))
                })?;
                image
            };

            let view = self.create_view(image, self.depth_format, aspect_mask)?;
            self.depth_views.push(view);
        }

        Ok(())
    }

    fn create_render_pass(&mut self) -> Result<()> {
        let attachments = [
            vk::AttachmentDescription::default()
                .format(self.color_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
            vk::AttachmentDescription::default()
                .format(self.depth_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        ];

        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };

        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)];

        // Wait for the presentation engine to release the image and for the
        // previous frame's depth writes before clearing
        let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        let dependencies = [vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stages)
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        unsafe {
            self.render_pass = self.device.create_render_pass(&create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create render pass: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create render pass: {:?}", e))
                })?;
        }

        Ok(())
    }

    fn create_framebuffers(&mut self) -> Result<()> {
        for (&color_view, &depth_view) in self.image_views.iter().zip(self.depth_views.iter()) {
            let attachments = [color_view, depth_view];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(self.render_pass)
                .attachments(&attachments)
                .width(self.extent.width)
                .height(self.extent.height)
                .layers(1);

            let framebuffer = unsafe {
                self.device.create_framebuffer(&create_info, None)
                    .map_err(|e| {
                        engine_error!(SOURCE, "Failed to create framebuffer: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create framebuffer: {:?}", e))
                    })?
            };
            self.framebuffers.push(framebuffer);
        }

        Ok(())
    }

    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn framebuffer(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index as usize).copied()
    }

    pub fn image_view(&self, image_index: u32) -> Option<vk::ImageView> {
        self.image_views.get(image_index as usize).copied()
    }

    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }
}

impl PresentationSurface for VulkanPresentation {
    type RenderPass = vk::RenderPass;

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn color_format(&self) -> Format {
        vk_format_to_format(self.color_format)
    }

    fn depth_format(&self) -> Format {
        vk_format_to_format(self.depth_format)
    }

    fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }
}

impl Drop for VulkanPresentation {
    fn drop(&mut self) {
        unsafe {
            for &framebuffer in &self.framebuffers {
                self.device.destroy_framebuffer(framebuffer, None);
            }
            self.device.destroy_render_pass(self.render_pass, None);

            for &view in &self.depth_views {
                self.device.destroy_image_view(view, None);
            }
            for &image in &self.depth_images {
                self.device.destroy_image(image, None);
            }

            let mut allocator = self.allocator.lock().unwrap_or_else(|p| p.into_inner());
            for allocation in self.depth_allocations.drain(..) {
                if let Err(e) = allocator.free(allocation) {
                    engine_error!(SOURCE, "Failed to free depth image memory: {:?}", e);
                }
            }
            drop(allocator);

            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
