/// Swap chain parameter negotiation
///
/// Pure, deterministic selection functions: given the same surface report they
/// always pick the same format, present mode, extent, image count and depth format.

use crate::error::{Error, Result};
use crate::present::{
    Extent2D, Format, PresentDevice, PresentMode, PresentationDesc, RendererConfig,
    SurfaceCapabilities, SurfaceFormat,
};
use crate::{engine_debug, engine_error};

/// First exact (format, color space) match, else the first supported format
///
/// Returns `None` only when the surface reports no formats at all.
pub fn choose_surface_format(
    available: &[SurfaceFormat],
    preferred: SurfaceFormat,
) -> Option<SurfaceFormat> {
    available
        .iter()
        .find(|f| **f == preferred)
        .or_else(|| available.first())
        .copied()
}

/// First preferred mode the surface supports, else FIFO (always available)
pub fn choose_present_mode(available: &[PresentMode], preferred: &[PresentMode]) -> PresentMode {
    preferred
        .iter()
        .find(|mode| available.contains(mode))
        .copied()
        .unwrap_or(PresentMode::Fifo)
}

/// A fixed surface extent wins; otherwise the requested extent is clamped
/// into the surface's image-extent bounds
pub fn choose_extent(requested: Extent2D, capabilities: &SurfaceCapabilities) -> Extent2D {
    match capabilities.current_extent {
        Some(fixed) => fixed,
        None => requested.clamp(capabilities.min_image_extent, capabilities.max_image_extent),
    }
}

/// One image more than the minimum, bounded by the maximum (0 = unbounded)
pub fn choose_image_count(capabilities: &SurfaceCapabilities) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// First candidate the device supports as a depth attachment
pub fn find_depth_format<F>(candidates: &[Format], supports: F) -> Option<Format>
where
    F: Fn(Format) -> bool,
{
    candidates.iter().copied().find(|&format| supports(format))
}

/// Query the device and run every selection step for a swap chain of `extent`
pub fn negotiate<D: PresentDevice>(
    device: &D,
    extent: Extent2D,
    config: &RendererConfig,
) -> Result<PresentationDesc> {
    let capabilities = device.surface_capabilities()?;
    let formats = device.surface_formats()?;
    let modes = device.present_modes()?;

    let surface_format = choose_surface_format(&formats, config.preferred_surface_format)
        .ok_or_else(|| {
            engine_error!("kami::SwapChain", "Surface reports no supported formats");
            Error::InitializationFailed("Surface reports no supported formats".to_string())
        })?;

    let depth_format = find_depth_format(&config.depth_format_candidates, |format| {
        device.supports_depth_format(format)
    })
    .ok_or_else(|| {
        engine_error!(
            "kami::SwapChain",
            "None of the depth formats {:?} is supported",
            config.depth_format_candidates
        );
        Error::InitializationFailed("No supported depth format".to_string())
    })?;

    let desc = PresentationDesc {
        extent: choose_extent(extent, &capabilities),
        surface_format,
        present_mode: choose_present_mode(&modes, &config.preferred_present_modes),
        min_image_count: choose_image_count(&capabilities),
        depth_format,
    };

    engine_debug!(
        "kami::SwapChain",
        "Negotiated {}x{} {:?}/{:?}, {:?}, {} images, depth {:?}",
        desc.extent.width,
        desc.extent.height,
        desc.surface_format.format,
        desc.surface_format.color_space,
        desc.present_mode,
        desc.min_image_count,
        desc.depth_format
    );

    Ok(desc)
}

#[cfg(test)]
#[path = "negotiation_tests.rs"]
mod tests;
