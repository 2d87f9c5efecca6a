/// Conversions between engine presentation types and `ash::vk` types

use ash::prelude::VkResult;
use ash::vk;
use kami_engine::kami::Error;
use kami_engine::kami::present::{
    ClearValue, ColorSpace, Extent2D, Format, PresentMode, Rect2D, SurfaceCapabilities,
    SurfaceFormat, SwapchainStatus, Viewport,
};

// ===== FORMATS =====

pub(crate) fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::Undefined => vk::Format::UNDEFINED,
        Format::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        Format::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        Format::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        Format::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        Format::D32_FLOAT => vk::Format::D32_SFLOAT,
        Format::D32_FLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
        Format::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        Format::Other(raw) => vk::Format::from_raw(raw),
    }
}

pub(crate) fn vk_format_to_format(format: vk::Format) -> Format {
    match format {
        vk::Format::UNDEFINED => Format::Undefined,
        vk::Format::B8G8R8A8_SRGB => Format::B8G8R8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM => Format::B8G8R8A8_UNORM,
        vk::Format::R8G8B8A8_SRGB => Format::R8G8B8A8_SRGB,
        vk::Format::R8G8B8A8_UNORM => Format::R8G8B8A8_UNORM,
        vk::Format::D32_SFLOAT => Format::D32_FLOAT,
        vk::Format::D32_SFLOAT_S8_UINT => Format::D32_FLOAT_S8_UINT,
        vk::Format::D24_UNORM_S8_UINT => Format::D24_UNORM_S8_UINT,
        other => Format::Other(other.as_raw()),
    }
}

pub(crate) fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::Other(raw) => vk::ColorSpaceKHR::from_raw(raw),
    }
}

pub(crate) fn vk_color_space_to_color_space(color_space: vk::ColorSpaceKHR) -> ColorSpace {
    match color_space {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => ColorSpace::SrgbNonlinear,
        other => ColorSpace::Other(other.as_raw()),
    }
}

pub(crate) fn vk_surface_format(format: &vk::SurfaceFormatKHR) -> SurfaceFormat {
    SurfaceFormat::new(
        vk_format_to_format(format.format),
        vk_color_space_to_color_space(format.color_space),
    )
}

// ===== PRESENT MODES =====

pub(crate) fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
    }
}

/// `None` for modes the engine does not use (shared refresh, ...)
pub(crate) fn vk_present_mode_to_present_mode(mode: vk::PresentModeKHR) -> Option<PresentMode> {
    match mode {
        vk::PresentModeKHR::IMMEDIATE => Some(PresentMode::Immediate),
        vk::PresentModeKHR::MAILBOX => Some(PresentMode::Mailbox),
        vk::PresentModeKHR::FIFO => Some(PresentMode::Fifo),
        vk::PresentModeKHR::FIFO_RELAXED => Some(PresentMode::FifoRelaxed),
        _ => None,
    }
}

// ===== EXTENTS / CAPABILITIES =====

pub(crate) fn extent_to_vk(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D {
        width: extent.width,
        height: extent.height,
    }
}

pub(crate) fn vk_extent_to_extent(extent: vk::Extent2D) -> Extent2D {
    Extent2D::new(extent.width, extent.height)
}

/// A current extent of `u32::MAX` means the window decides the size
pub(crate) fn vk_capabilities_to_capabilities(caps: &vk::SurfaceCapabilitiesKHR) -> SurfaceCapabilities {
    let current_extent = if caps.current_extent.width == u32::MAX {
        None
    } else {
        Some(vk_extent_to_extent(caps.current_extent))
    };

    SurfaceCapabilities {
        min_image_count: caps.min_image_count,
        max_image_count: caps.max_image_count,
        current_extent,
        min_image_extent: vk_extent_to_extent(caps.min_image_extent),
        max_image_extent: vk_extent_to_extent(caps.max_image_extent),
    }
}

// ===== RECORDING =====

pub(crate) fn clear_value_to_vk(value: ClearValue) -> vk::ClearValue {
    match value {
        ClearValue::Color(float32) => vk::ClearValue {
            color: vk::ClearColorValue { float32 },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
    }
}

pub(crate) fn viewport_to_vk(viewport: Viewport) -> vk::Viewport {
    vk::Viewport {
        x: viewport.x,
        y: viewport.y,
        width: viewport.width,
        height: viewport.height,
        min_depth: viewport.min_depth,
        max_depth: viewport.max_depth,
    }
}

pub(crate) fn rect_to_vk(rect: Rect2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: rect.x, y: rect.y },
        extent: vk::Extent2D {
            width: rect.width,
            height: rect.height,
        },
    }
}

// ===== RESULTS =====

/// Map a failed `vk::Result` onto the engine error taxonomy
pub(crate) fn vk_result_to_error(result: vk::Result, context: &str) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            Error::OutOfMemory
        }
        other => Error::BackendError(format!("{}: {:?}", context, other)),
    }
}

/// Classify the result of `vkAcquireNextImageKHR`
pub(crate) fn acquire_status(result: VkResult<(u32, bool)>) -> (u32, SwapchainStatus) {
    match result {
        Ok((index, false)) => (index, SwapchainStatus::Ok),
        Ok((index, true)) => (index, SwapchainStatus::Suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => (0, SwapchainStatus::Stale),
        Err(e) => (0, SwapchainStatus::Fatal(format!("acquire_next_image: {:?}", e))),
    }
}

/// Classify the result of `vkQueuePresentKHR`
pub(crate) fn present_status(result: VkResult<bool>) -> SwapchainStatus {
    match result {
        Ok(false) => SwapchainStatus::Ok,
        Ok(true) => SwapchainStatus::Suboptimal,
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => SwapchainStatus::Stale,
        Err(e) => SwapchainStatus::Fatal(format!("queue_present: {:?}", e)),
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
