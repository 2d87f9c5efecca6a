/// VulkanDevice - Vulkan implementation of the PresentDevice trait
///
/// Owns the instance, the window's surface, the logical device and its
/// queues, the command pool frame command buffers come from, and the GPU
/// allocator backing depth attachments.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use kami_engine::kami::present::{
    ClearValue, Format, PresentDevice, PresentMode, PresentationDesc,
    PresentationSurface, Rect2D, SurfaceCapabilities, SurfaceFormat, SwapchainStatus, Viewport,
};
use kami_engine::kami::{Error, Result};
use kami_engine::{engine_debug, engine_error, engine_info, engine_warn};
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::os::raw::c_char;
use std::sync::{Arc, Mutex};

use crate::vulkan_format::{
    acquire_status, clear_value_to_vk, extent_to_vk, format_to_vk, present_status, rect_to_vk,
    viewport_to_vk, vk_capabilities_to_capabilities, vk_present_mode_to_present_mode,
    vk_result_to_error, vk_surface_format,
};
use crate::vulkan_presentation::VulkanPresentation;
use crate::window_surface::WindowSurface;

const SOURCE: &str = "kami::vulkan";

/// Verbosity of the validation layer messenger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugSeverity {
    ErrorsOnly,
    #[default]
    ErrorsAndWarnings,
    All,
}

/// Vulkan backend configuration
#[derive(Debug, Clone)]
pub struct VulkanConfig {
    pub app_name: String,
    pub app_version: u32,
    /// Request `VK_LAYER_KHRONOS_validation` (needs the `vulkan-validation` feature)
    pub enable_validation: bool,
    pub debug_severity: DebugSeverity,
    /// Count validation messages per severity and group duplicates
    pub enable_validation_stats: bool,
}

impl Default for VulkanConfig {
    fn default() -> Self {
        Self {
            app_name: "Kami Application".to_string(),
            app_version: vk::make_api_version(0, 1, 0, 0),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::default(),
            enable_validation_stats: true,
        }
    }
}

/// Rank of a physical device type, higher is preferred
pub(crate) fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 4,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 1,
        _ => 0,
    }
}

/// Pick (graphics, present) queue families
///
/// A family that can do both is preferred so the swap chain images can stay
/// in exclusive sharing mode.
pub(crate) fn select_queue_families(
    families: &[vk::QueueFamilyProperties],
    supports_present: impl Fn(u32) -> bool,
) -> Option<(u32, u32)> {
    let graphics: Vec<u32> = families
        .iter()
        .enumerate()
        .filter(|(_, qf)| qf.queue_count > 0 && qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|(i, _)| i as u32)
        .collect();
    let present: Vec<u32> = (0..families.len() as u32)
        .filter(|&i| supports_present(i))
        .collect();

    if let Some(&both) = graphics.iter().find(|i| present.contains(i)) {
        return Some((both, both));
    }
    Some((*graphics.first()?, *present.first()?))
}

/// Objects created so far by `VulkanDevice::new`
///
/// Destroyed in reverse creation order when a later step fails. Every field
/// may still be unset (or null), so dropping an empty guard does nothing.
#[derive(Default)]
struct InitGuard {
    instance: Option<ash::Instance>,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface: Option<(ash::khr::surface::Instance, vk::SurfaceKHR)>,
    device: Option<ash::Device>,
    command_pool: vk::CommandPool,
}

impl InitGuard {
    /// Hand ownership of everything over to the finished device
    fn disarm(mut self) {
        self.instance = None;
        #[cfg(feature = "vulkan-validation")]
        {
            self.debug_messenger = None;
        }
        self.surface = None;
        self.device = None;
        self.command_pool = vk::CommandPool::null();
    }
}

impl Drop for InitGuard {
    fn drop(&mut self) {
        if self.instance.is_none() {
            return;
        }
        engine_warn!(SOURCE, "Vulkan device creation failed, releasing partially created objects");
        unsafe {
            if let Some(device) = self.device.take() {
                if self.command_pool != vk::CommandPool::null() {
                    device.destroy_command_pool(self.command_pool, None);
                }
                device.destroy_device(None);
            }
            if let Some((surface_loader, surface)) = self.surface.take() {
                surface_loader.destroy_surface(surface, None);
            }
            #[cfg(feature = "vulkan-validation")]
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            if let Some(instance) = self.instance.take() {
                instance.destroy_instance(None);
            }
        }
    }
}

/// Vulkan logical device presenting to one window surface
pub struct VulkanDevice {
    _entry: ash::Entry,
    instance: ash::Instance,

    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,

    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    /// Kept alive for as long as `surface` exists
    _window_surface: Arc<WindowSurface>,

    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    swapchain_loader: ash::khr::swapchain::Device,

    graphics_queue: vk::Queue,
    graphics_queue_family: u32,
    present_queue: vk::Queue,
    present_queue_family: u32,

    command_pool: vk::CommandPool,

    /// Dropped explicitly before the device is destroyed
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,
}

impl VulkanDevice {
    /// Create a device able to present to `window_surface`
    pub fn new(window_surface: Arc<WindowSurface>, config: VulkanConfig) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            let app_name = CString::new(config.app_name.clone())
                .map_err(|e| {
                    engine_error!(SOURCE, "Invalid application name: {}", e);
                    Error::InitializationFailed(format!("Invalid application name: {}", e))
                })?;

            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(config.app_version)
                .engine_name(c"Kami")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let validation = Self::validation_enabled(&entry, &config);

            #[cfg_attr(not(feature = "vulkan-validation"), allow(unused_mut))]
            let mut extension_names = window_surface.required_instance_extensions()?;
            #[cfg_attr(not(feature = "vulkan-validation"), allow(unused_mut))]
            let mut layer_names: Vec<*const c_char> = Vec::new();

            #[cfg(feature = "vulkan-validation")]
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;
            let mut guard = InitGuard {
                instance: Some(instance.clone()),
                #[cfg(feature = "vulkan-validation")]
                debug_messenger: None,
                surface: None,
                device: None,
                command_pool: vk::CommandPool::null(),
            };

            #[cfg(feature = "vulkan-validation")]
            let debug_messenger = if validation {
                let messenger = Self::create_debug_messenger(&entry, &instance, &config)?;
                guard.debug_messenger = Some(messenger.clone());
                Some(messenger)
            } else {
                None
            };

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            let surface = window_surface.create_presentation_handle(&entry, &instance)?;
            guard.surface = Some((surface_loader.clone(), surface));

            let (physical_device, graphics_queue_family, present_queue_family) =
                Self::pick_physical_device(&instance, &surface_loader, surface)?;

            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_queue_family)
                    .queue_priorities(&queue_priorities),
            ];
            if present_queue_family != graphics_queue_family {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_queue_family)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_features = vk::PhysicalDeviceFeatures::default();

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;
            guard.device = Some(device.clone());

            let graphics_queue = device.get_device_queue(graphics_queue_family, 0);
            let present_queue = device.get_device_queue(present_queue_family, 0);
            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

            let pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = device.create_command_pool(&pool_create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create command pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
                })?;
            guard.command_pool = command_pool;

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            guard.disarm();

            engine_info!(
                SOURCE,
                "Vulkan device ready (graphics family {}, present family {}, validation {})",
                graphics_queue_family,
                present_queue_family,
                validation
            );

            Ok(Self {
                _entry: entry,
                instance,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
                surface_loader,
                surface,
                _window_surface: window_surface,
                physical_device,
                device,
                swapchain_loader,
                graphics_queue,
                graphics_queue_family,
                present_queue,
                present_queue_family,
                command_pool,
                allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
            })
        }
    }

    /// Whether validation layers will actually be enabled
    #[cfg(feature = "vulkan-validation")]
    fn validation_enabled(entry: &ash::Entry, config: &VulkanConfig) -> bool {
        if !config.enable_validation {
            return false;
        }
        let available = unsafe { entry.enumerate_instance_layer_properties() }
            .map(|layers| {
                layers.iter().any(|layer| {
                    layer.layer_name_as_c_str() == Ok(c"VK_LAYER_KHRONOS_validation")
                })
            })
            .unwrap_or(false);
        if !available {
            engine_warn!(SOURCE, "VK_LAYER_KHRONOS_validation not available, continuing without validation");
        }
        available
    }

    #[cfg(not(feature = "vulkan-validation"))]
    fn validation_enabled(_entry: &ash::Entry, config: &VulkanConfig) -> bool {
        if config.enable_validation {
            engine_warn!(SOURCE, "Validation requested but the vulkan-validation feature is disabled");
        }
        false
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &VulkanConfig,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        crate::debug::init_debug_state(config.enable_validation_stats);

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(crate::debug::severity_flags(config.debug_severity))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to create debug messenger: {:?}", e);
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?;

        Ok((debug_utils, messenger))
    }

    /// Best physical device that can present to `surface`
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32, u32)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to enumerate physical devices: {:?}", e);
                Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
            })?;

        let mut best: Option<(u32, vk::PhysicalDevice, u32, u32)> = None;

        for physical_device in physical_devices {
            let has_swapchain = instance
                .enumerate_device_extension_properties(physical_device)
                .map(|extensions| {
                    extensions.iter().any(|ext| {
                        ext.extension_name_as_c_str() == Ok(ash::khr::swapchain::NAME)
                    })
                })
                .unwrap_or(false);
            if !has_swapchain {
                continue;
            }

            let families = instance.get_physical_device_queue_family_properties(physical_device);
            let Some((graphics, present)) = select_queue_families(&families, |i| {
                surface_loader
                    .get_physical_device_surface_support(physical_device, i, surface)
                    .unwrap_or(false)
            }) else {
                continue;
            };

            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .unwrap_or_default();
            let modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .unwrap_or_default();
            if formats.is_empty() || modes.is_empty() {
                continue;
            }

            let properties = instance.get_physical_device_properties(physical_device);
            let score = device_type_score(properties.device_type);
            engine_debug!(
                SOURCE,
                "Candidate GPU {:?} ({:?}, score {})",
                properties.device_name_as_c_str().unwrap_or(c"?"),
                properties.device_type,
                score
            );

            if best.map_or(true, |(best_score, ..)| score > best_score) {
                best = Some((score, physical_device, graphics, present));
            }
        }

        best.map(|(_, physical_device, graphics, present)| (physical_device, graphics, present))
            .ok_or_else(|| {
                engine_error!(SOURCE, "No GPU can present to this window");
                Error::InitializationFailed("No GPU can present to this window".to_string())
            })
    }

    // ===== ACCESSORS =====

    pub fn command_pool(&self) -> vk::CommandPool {
        self.command_pool
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub(crate) fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    pub(crate) fn present_queue_family(&self) -> u32 {
        self.present_queue_family
    }

    pub(crate) fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub(crate) fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    pub(crate) fn allocator(&self) -> Arc<Mutex<Allocator>> {
        Arc::clone(&self.allocator)
    }

    pub(crate) fn raw_surface_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| fail("get_physical_device_surface_capabilities", e))
        }
    }
}

/// Log a failed Vulkan call and map it onto the engine error
fn fail(context: &str, result: vk::Result) -> Error {
    engine_error!(SOURCE, "{} failed: {:?}", context, result);
    vk_result_to_error(result, context)
}

impl PresentDevice for VulkanDevice {
    type Semaphore = vk::Semaphore;
    type Fence = vk::Fence;
    type CommandBuffer = vk::CommandBuffer;
    type Presentation = VulkanPresentation;

    // ===== SURFACE QUERIES =====

    fn surface_capabilities(&self) -> Result<SurfaceCapabilities> {
        self.raw_surface_capabilities()
            .map(|caps| vk_capabilities_to_capabilities(&caps))
    }

    fn surface_formats(&self) -> Result<Vec<SurfaceFormat>> {
        unsafe {
            let formats = self.surface_loader
                .get_physical_device_surface_formats(self.physical_device, self.surface)
                .map_err(|e| fail("get_physical_device_surface_formats", e))?;
            Ok(formats.iter().map(vk_surface_format).collect())
        }
    }

    fn present_modes(&self) -> Result<Vec<PresentMode>> {
        unsafe {
            let modes = self.surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, self.surface)
                .map_err(|e| fail("get_physical_device_surface_present_modes", e))?;
            Ok(modes.into_iter().filter_map(vk_present_mode_to_present_mode).collect())
        }
    }

    fn supports_depth_format(&self, format: Format) -> bool {
        if !format.is_depth() {
            return false;
        }
        let properties = unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format_to_vk(format))
        };
        properties
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    }

    // ===== PRESENTATION =====

    fn create_presentation(
        &self,
        desc: &PresentationDesc,
        previous: Option<&VulkanPresentation>,
    ) -> Result<VulkanPresentation> {
        let old_swapchain = previous
            .map(|p| p.swapchain())
            .unwrap_or(vk::SwapchainKHR::null());
        VulkanPresentation::new(self, desc, old_swapchain)
    }

    fn acquire_next_image(
        &self,
        presentation: &VulkanPresentation,
        image_available: vk::Semaphore,
    ) -> (u32, SwapchainStatus) {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                presentation.swapchain(),
                u64::MAX,
                image_available,
                vk::Fence::null(),
            )
        };
        acquire_status(result)
    }

    fn present(
        &self,
        presentation: &VulkanPresentation,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> SwapchainStatus {
        let wait_semaphores = [wait];
        let swapchains = [presentation.swapchain()];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.swapchain_loader.queue_present(self.present_queue, &present_info)
        };
        present_status(result)
    }

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        unsafe {
            self.device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| fail("create_semaphore", e))
        }
    }

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        unsafe {
            self.device
                .create_fence(&vk::FenceCreateInfo::default().flags(flags), None)
                .map_err(|e| fail("create_fence", e))
        }
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) }
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) }
    }

    fn wait_for_fence(&self, fence: vk::Fence) -> Result<()> {
        unsafe {
            self.device
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| fail("wait_for_fences", e))
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        unsafe {
            self.device
                .reset_fences(&[fence])
                .map_err(|e| fail("reset_fences", e))
        }
    }

    fn submit(
        &self,
        command_buffer: vk::CommandBuffer,
        wait: vk::Semaphore,
        signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()> {
        let wait_semaphores = [wait];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [signal];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .queue_submit(self.graphics_queue, &[submit_info], fence)
                .map_err(|e| fail("queue_submit", e))
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| fail("device_wait_idle", e))
        }
    }

    // ===== COMMAND BUFFERS =====

    fn allocate_command_buffers(&self, count: usize) -> Result<Vec<vk::CommandBuffer>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count as u32);

        unsafe {
            self.device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| fail("allocate_command_buffers", e))
        }
    }

    fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        if command_buffers.is_empty() {
            return;
        }
        unsafe { self.device.free_command_buffers(self.command_pool, command_buffers) }
    }

    fn begin_command_buffer(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        unsafe {
            self.device
                .begin_command_buffer(command_buffer, &vk::CommandBufferBeginInfo::default())
                .map_err(|e| fail("begin_command_buffer", e))
        }
    }

    fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        unsafe {
            self.device
                .end_command_buffer(command_buffer)
                .map_err(|e| fail("end_command_buffer", e))
        }
    }

    // ===== RECORDING =====

    fn cmd_begin_render_pass(
        &self,
        command_buffer: vk::CommandBuffer,
        presentation: &VulkanPresentation,
        image_index: u32,
        clear_values: &[ClearValue],
    ) {
        let Some(framebuffer) = presentation.framebuffer(image_index) else {
            engine_error!(SOURCE, "No framebuffer for swap chain image {}", image_index);
            return;
        };

        let vk_clear_values: Vec<vk::ClearValue> =
            clear_values.iter().copied().map(clear_value_to_vk).collect();

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(presentation.render_pass())
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: extent_to_vk(presentation.extent()),
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    fn cmd_set_viewport(&self, command_buffer: vk::CommandBuffer, viewport: Viewport) {
        unsafe {
            self.device
                .cmd_set_viewport(command_buffer, 0, &[viewport_to_vk(viewport)]);
        }
    }

    fn cmd_set_scissor(&self, command_buffer: vk::CommandBuffer, scissor: Rect2D) {
        unsafe {
            self.device
                .cmd_set_scissor(command_buffer, 0, &[rect_to_vk(scissor)]);
        }
    }

    fn cmd_end_render_pass(&self, command_buffer: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(command_buffer) }
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                engine_error!(SOURCE, "device_wait_idle failed during shutdown: {:?}", e);
            }

            self.device.destroy_command_pool(self.command_pool, None);

            // The allocator frees its memory blocks through the device
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);

            #[cfg(feature = "vulkan-validation")]
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
