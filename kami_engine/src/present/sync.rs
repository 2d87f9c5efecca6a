/// Frame synchronization primitives
///
/// Frame slots and swap chain images are independent: the CPU cycles through
/// `MAX_FRAMES_IN_FLIGHT` slots while the presentation engine hands out image
/// indices in any order. The image-in-flight table links the two so an image
/// is never re-recorded while a previous submission still renders into it.

use std::sync::Arc;
use crate::error::Result;
use crate::present::PresentDevice;

/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Semaphores and fence owned by one frame slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot<S, F> {
    /// Signalled by acquire when the image can be written
    pub image_available: S,
    /// Signalled by the submission, waited on by present
    pub render_finished: S,
    /// Signalled when the slot's submission completes (created signaled)
    pub in_flight: F,
}

/// Per-image record of the fence guarding its last submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInFlightTable<F> {
    fences: Vec<Option<F>>,
}

impl<F: Copy> ImageInFlightTable<F> {
    /// One empty entry per swap chain image
    pub fn new(image_count: usize) -> Self {
        Self {
            fences: vec![None; image_count],
        }
    }

    /// Fence of the last submission that rendered into `image_index`
    pub fn pending(&self, image_index: usize) -> Option<F> {
        self.fences.get(image_index).copied().flatten()
    }

    /// Record `fence` as guarding `image_index`
    ///
    /// Out-of-range indices are ignored.
    pub fn guard(&mut self, image_index: usize, fence: F) {
        if let Some(entry) = self.fences.get_mut(image_index) {
            *entry = Some(fence);
        }
    }

    pub fn len(&self) -> usize {
        self.fences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }
}

/// All synchronization state of one swap chain
///
/// Destroys its semaphores and fences on drop; the owner must make sure the
/// device is idle first.
pub struct SyncSet<D: PresentDevice> {
    device: Arc<D>,
    slots: Vec<FrameSlot<D::Semaphore, D::Fence>>,
    images_in_flight: ImageInFlightTable<D::Fence>,
    current_frame: usize,
}

impl<D: PresentDevice> SyncSet<D> {
    /// Create `MAX_FRAMES_IN_FLIGHT` slots and an empty table for `image_count` images
    pub fn new(device: Arc<D>, image_count: usize) -> Result<Self> {
        Self::starting_at(device, image_count, 0)
    }

    /// Same as `new`, but the slot cursor starts at `current_frame`
    ///
    /// Used when a swap chain replaces a predecessor so the frame sequence
    /// continues where it left off.
    pub fn starting_at(device: Arc<D>, image_count: usize, current_frame: usize) -> Result<Self> {
        let mut sync = Self {
            device,
            slots: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT),
            images_in_flight: ImageInFlightTable::new(image_count),
            current_frame: current_frame % MAX_FRAMES_IN_FLIGHT,
        };

        // On error, `sync` is dropped and destroys what was already created
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            let image_available = sync.device.create_semaphore()?;
            let render_finished = match sync.device.create_semaphore() {
                Ok(semaphore) => semaphore,
                Err(e) => {
                    sync.device.destroy_semaphore(image_available);
                    return Err(e);
                }
            };
            let in_flight = match sync.device.create_fence(true) {
                Ok(fence) => fence,
                Err(e) => {
                    sync.device.destroy_semaphore(image_available);
                    sync.device.destroy_semaphore(render_finished);
                    return Err(e);
                }
            };
            sync.slots.push(FrameSlot {
                image_available,
                render_finished,
                in_flight,
            });
        }

        Ok(sync)
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn current_slot(&self) -> FrameSlot<D::Semaphore, D::Fence> {
        self.slots[self.current_frame]
    }

    /// Move to the next slot, wrapping at `MAX_FRAMES_IN_FLIGHT`
    pub fn advance(&mut self) {
        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
    }

    pub fn images_in_flight(&self) -> &ImageInFlightTable<D::Fence> {
        &self.images_in_flight
    }

    pub fn images_in_flight_mut(&mut self) -> &mut ImageInFlightTable<D::Fence> {
        &mut self.images_in_flight
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl<D: PresentDevice> Drop for SyncSet<D> {
    fn drop(&mut self) {
        for slot in self.slots.drain(..) {
            self.device.destroy_semaphore(slot.image_available);
            self.device.destroy_semaphore(slot.render_finished);
            self.device.destroy_fence(slot.in_flight);
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
