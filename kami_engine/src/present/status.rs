/// Outcome of acquiring or presenting a swap chain image

use std::fmt;

/// Closed status returned by `SwapChain::acquire_next_image` and
/// `SwapChain::submit_command_buffers`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapchainStatus {
    /// Image acquired / presented normally
    Ok,
    /// Usable, but the swap chain no longer matches the surface exactly
    Suboptimal,
    /// Swap chain is out of date and must be recreated before use
    Stale,
    /// Unrecoverable failure with the backend's reason
    Fatal(String),
}

impl SwapchainStatus {
    /// The acquired image index may be rendered into
    pub fn is_usable(&self) -> bool {
        matches!(self, SwapchainStatus::Ok | SwapchainStatus::Suboptimal)
    }

    /// Recreating the swap chain is required or advisable
    pub fn needs_recreation(&self) -> bool {
        matches!(self, SwapchainStatus::Suboptimal | SwapchainStatus::Stale)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, SwapchainStatus::Fatal(_))
    }
}

impl fmt::Display for SwapchainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapchainStatus::Ok => write!(f, "ok"),
            SwapchainStatus::Suboptimal => write!(f, "suboptimal"),
            SwapchainStatus::Stale => write!(f, "stale"),
            SwapchainStatus::Fatal(reason) => write!(f, "fatal: {}", reason),
        }
    }
}
