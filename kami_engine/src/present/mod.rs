//! Presentation: swap chain negotiation, frame synchronization and the
//! begin/end frame protocol

mod types;
mod status;
pub mod negotiation;
mod surface;
mod device;
pub mod sync;
mod swap_chain;
mod renderer;

#[cfg(test)]
pub mod mock_device;

pub use types::{
    ClearValue, ColorSpace, Extent2D, Format, PresentMode, PresentationDesc, Rect2D,
    SurfaceCapabilities, SurfaceFormat, SwapFormat, Viewport,
};
pub use status::SwapchainStatus;
pub use surface::Surface;
pub use device::{PresentDevice, PresentationSurface};
pub use sync::{FrameSlot, ImageInFlightTable, SyncSet, MAX_FRAMES_IN_FLIGHT};
pub use swap_chain::SwapChain;
pub use renderer::{FrameState, Renderer, RendererConfig};
