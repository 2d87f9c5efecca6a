/// Presentation data model - extents, formats, capabilities, clear values

/// Width and height of a surface or swap chain image, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero width or height (minimized window) cannot back a swap chain
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width / height, or 0.0 for a degenerate extent
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_degenerate() {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }

    /// Clamp each dimension into `[min, max]`
    ///
    /// Values already inside the bounds are returned unchanged.
    pub fn clamp(&self, min: Extent2D, max: Extent2D) -> Extent2D {
        Extent2D {
            width: self.width.max(min.width).min(max.width.max(min.width)),
            height: self.height.max(min.height).min(max.height.max(min.height)),
        }
    }
}

/// Pixel formats the engine reasons about
///
/// `Other` carries a raw backend value the engine has no name for, so
/// negotiation stays total over whatever the surface reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    Undefined,

    // Color formats
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,

    // Depth / depth-stencil formats
    D32_FLOAT,
    D32_FLOAT_S8_UINT,
    D24_UNORM_S8_UINT,

    Other(i32),
}

impl Format {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            Format::D32_FLOAT | Format::D32_FLOAT_S8_UINT | Format::D24_UNORM_S8_UINT
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, Format::D32_FLOAT_S8_UINT | Format::D24_UNORM_S8_UINT)
    }
}

/// Color space of presentable images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonlinear,
    Other(i32),
}

/// (pixel format, color space) pair supported by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: Format,
    pub color_space: ColorSpace,
}

impl SurfaceFormat {
    pub const fn new(format: Format, color_space: ColorSpace) -> Self {
        Self { format, color_space }
    }
}

/// Policy for handing finished images to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// No vsync, may tear
    Immediate,
    /// Low latency triple buffering, newest image replaces the queued one
    Mailbox,
    /// Strict vsync queue, always supported
    Fifo,
    /// Vsync unless the application is late
    FifoRelaxed,
}

/// Surface limits reported by the device for the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means no upper bound
    pub max_image_count: u32,
    /// Fixed extent imposed by the surface, `None` when the window size decides
    pub current_extent: Option<Extent2D>,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
}

/// Color + depth formats of a swap chain; render pass compatibility follows it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapFormat {
    pub color: Format,
    pub depth: Format,
}

/// Negotiated parameters handed to `PresentDevice::create_presentation`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentationDesc {
    pub extent: Extent2D,
    pub surface_format: SurfaceFormat,
    pub present_mode: PresentMode,
    pub min_image_count: u32,
    pub depth_format: Format,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering the whole extent with the [0, 1] depth range
    pub fn full(extent: Extent2D) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn full(extent: Extent2D) -> Self {
        Self { x: 0, y: 0, width: extent.width, height: extent.height }
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
