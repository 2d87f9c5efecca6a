/*!
# Kami Engine

Core types and orchestration for presenting frames to a resizable window surface.

This crate owns the presentation lifecycle without naming any graphics API:
swap-chain negotiation, per-frame synchronization, swap-chain recreation and the
begin/end frame protocol. Backends (see `kami_engine_renderer_vulkan`) plug in by
implementing the `Surface`, `PresentDevice` and `PresentationSurface` traits.

## Architecture

- **SyncSet**: per-frame-slot semaphores/fences plus the image-in-flight table
- **SwapChain**: presentation surface + SyncSet, acquire / submit / present
- **Renderer**: frame state machine, command buffers, swap chain recreation
- **Surface / PresentDevice**: traits implemented by the window and the backend
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod present;

// Main kami namespace module
pub mod kami {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine facade (logging)
    pub use crate::engine::Engine;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Presentation sub-module with all swap chain / renderer types
    pub mod present {
        pub use crate::present::*;
    }

    pub use crate::present::{Renderer, RendererConfig, SwapChain};
}
