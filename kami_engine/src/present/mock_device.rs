/// Scriptable in-memory device and surface for unit tests
///
/// Handles are plain `u32` ids. Every device call is appended to a shared
/// event log so tests can assert on ordering (fence waits before reuse,
/// predecessor kept alive until its replacement exists, ...).

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::present::{
    ClearValue, ColorSpace, Extent2D, Format, PresentDevice, PresentMode, PresentationDesc,
    PresentationSurface, Rect2D, Surface, SurfaceCapabilities, SurfaceFormat, SwapchainStatus,
    Viewport,
};

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    CreateSemaphore(u32),
    CreateFence { fence: u32, signaled: bool },
    DestroySemaphore(u32),
    DestroyFence(u32),
    WaitFence(u32),
    ResetFence(u32),
    CreatePresentation { id: u32, extent: Extent2D, image_count: usize, previous: Option<u32> },
    DropPresentation(u32),
    Acquire { presentation: u32, semaphore: u32, image_index: u32 },
    Submit { command_buffer: u32, wait: u32, signal: u32, fence: u32 },
    Present { presentation: u32, image_index: u32, wait: u32 },
    AllocateCommandBuffers(Vec<u32>),
    FreeCommandBuffers(Vec<u32>),
    BeginCommandBuffer(u32),
    EndCommandBuffer(u32),
    BeginRenderPass { command_buffer: u32, image_index: u32, clear_values: Vec<ClearValue> },
    SetViewport(Viewport),
    SetScissor(Rect2D),
    EndRenderPass(u32),
    WaitIdle,
}

type EventLog = Arc<Mutex<Vec<MockEvent>>>;

fn record(log: &EventLog, event: MockEvent) {
    if let Ok(mut events) = log.lock() {
        events.push(event);
    }
}

/// Presentation created by `MockDevice`
#[derive(Debug)]
pub struct MockPresentation {
    id: u32,
    extent: Extent2D,
    image_count: usize,
    color_format: Format,
    depth_format: Format,
    events: EventLog,
}

impl MockPresentation {
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl PresentationSurface for MockPresentation {
    type RenderPass = u32;

    fn image_count(&self) -> usize {
        self.image_count
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn color_format(&self) -> Format {
        self.color_format
    }

    fn depth_format(&self) -> Format {
        self.depth_format
    }

    fn render_pass(&self) -> u32 {
        self.id
    }
}

impl Drop for MockPresentation {
    fn drop(&mut self) {
        record(&self.events, MockEvent::DropPresentation(self.id));
    }
}

struct MockState {
    next_id: u32,
    capabilities: SurfaceCapabilities,
    capabilities_script: VecDeque<SurfaceCapabilities>,
    formats: Vec<SurfaceFormat>,
    present_modes: Vec<PresentMode>,
    depth_formats: Vec<Format>,
    image_count: Option<usize>,
    acquire_script: VecDeque<SwapchainStatus>,
    acquire_indices: VecDeque<u32>,
    present_script: VecDeque<SwapchainStatus>,
    next_image: u32,
    fail_fence_creation_at: Option<usize>,
    fences_created: usize,
    live_semaphores: HashSet<u32>,
    live_fences: HashSet<u32>,
    live_command_buffers: HashSet<u32>,
}

impl MockState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory `PresentDevice`
pub struct MockDevice {
    state: Mutex<MockState>,
    events: EventLog,
}

impl MockDevice {
    /// Device reporting B8G8R8A8_SRGB/sRGB, FIFO + Mailbox, 2..=3 images,
    /// a window-driven extent and every depth format
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 0,
                capabilities: SurfaceCapabilities {
                    min_image_count: 2,
                    max_image_count: 3,
                    current_extent: None,
                    min_image_extent: Extent2D::new(1, 1),
                    max_image_extent: Extent2D::new(4096, 4096),
                },
                capabilities_script: VecDeque::new(),
                formats: vec![
                    SurfaceFormat::new(Format::B8G8R8A8_UNORM, ColorSpace::SrgbNonlinear),
                    SurfaceFormat::new(Format::B8G8R8A8_SRGB, ColorSpace::SrgbNonlinear),
                ],
                present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
                depth_formats: vec![
                    Format::D32_FLOAT,
                    Format::D32_FLOAT_S8_UINT,
                    Format::D24_UNORM_S8_UINT,
                ],
                image_count: None,
                acquire_script: VecDeque::new(),
                acquire_indices: VecDeque::new(),
                present_script: VecDeque::new(),
                next_image: 0,
                fail_fence_creation_at: None,
                fences_created: 0,
                live_semaphores: HashSet::new(),
                live_fences: HashSet::new(),
                live_command_buffers: HashSet::new(),
            }),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // ===== SCRIPTING =====

    pub fn set_capabilities(&self, capabilities: SurfaceCapabilities) {
        self.state().capabilities = capabilities;
    }

    /// Capabilities returned by the next queries, in order, before falling
    /// back to the ones set with `set_capabilities`
    pub fn push_capabilities(&self, capabilities: SurfaceCapabilities) {
        self.state().capabilities_script.push_back(capabilities);
    }

    pub fn set_surface_formats(&self, formats: Vec<SurfaceFormat>) {
        self.state().formats = formats;
    }

    pub fn set_present_modes(&self, modes: Vec<PresentMode>) {
        self.state().present_modes = modes;
    }

    pub fn set_supported_depth_formats(&self, formats: Vec<Format>) {
        self.state().depth_formats = formats;
    }

    /// Force the number of images created, regardless of the requested minimum
    pub fn set_image_count(&self, count: Option<usize>) {
        self.state().image_count = count;
    }

    /// Status returned by the next acquire (Ok once the script is exhausted)
    pub fn push_acquire_status(&self, status: SwapchainStatus) {
        self.state().acquire_script.push_back(status);
    }

    /// Image index returned by the next acquire (round-robin once exhausted)
    pub fn push_acquire_index(&self, index: u32) {
        self.state().acquire_indices.push_back(index);
    }

    /// Status returned by the next present (Ok once the script is exhausted)
    pub fn push_present_status(&self, status: SwapchainStatus) {
        self.state().present_script.push_back(status);
    }

    /// Make the n-th fence creation (0-based, counted from now) fail
    pub fn fail_fence_creation_at(&self, n: usize) {
        let mut state = self.state();
        state.fail_fence_creation_at = Some(state.fences_created + n);
    }

    // ===== INSPECTION =====

    pub fn events(&self) -> Vec<MockEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn clear_events(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    pub fn count_events<P: Fn(&MockEvent) -> bool>(&self, predicate: P) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }

    pub fn live_semaphores(&self) -> usize {
        self.state().live_semaphores.len()
    }

    pub fn live_fences(&self) -> usize {
        self.state().live_fences.len()
    }

    pub fn live_command_buffers(&self) -> usize {
        self.state().live_command_buffers.len()
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentDevice for MockDevice {
    type Semaphore = u32;
    type Fence = u32;
    type CommandBuffer = u32;
    type Presentation = MockPresentation;

    fn surface_capabilities(&self) -> Result<SurfaceCapabilities> {
        let mut state = self.state();
        let capabilities = state.capabilities;
        Ok(state.capabilities_script.pop_front().unwrap_or(capabilities))
    }

    fn surface_formats(&self) -> Result<Vec<SurfaceFormat>> {
        Ok(self.state().formats.clone())
    }

    fn present_modes(&self) -> Result<Vec<PresentMode>> {
        Ok(self.state().present_modes.clone())
    }

    fn supports_depth_format(&self, format: Format) -> bool {
        self.state().depth_formats.contains(&format)
    }

    fn create_presentation(
        &self,
        desc: &PresentationDesc,
        previous: Option<&MockPresentation>,
    ) -> Result<MockPresentation> {
        let mut state = self.state();
        let id = state.next_id();
        let image_count = state.image_count.unwrap_or(desc.min_image_count as usize);
        state.next_image = 0;
        drop(state);

        record(
            &self.events,
            MockEvent::CreatePresentation {
                id,
                extent: desc.extent,
                image_count,
                previous: previous.map(|p| p.id),
            },
        );

        Ok(MockPresentation {
            id,
            extent: desc.extent,
            image_count,
            color_format: desc.surface_format.format,
            depth_format: desc.depth_format,
            events: Arc::clone(&self.events),
        })
    }

    fn acquire_next_image(
        &self,
        presentation: &MockPresentation,
        image_available: u32,
    ) -> (u32, SwapchainStatus) {
        let mut state = self.state();
        let status = state.acquire_script.pop_front().unwrap_or(SwapchainStatus::Ok);
        let image_index = match state.acquire_indices.pop_front() {
            Some(index) => index,
            None => {
                let index = state.next_image % presentation.image_count.max(1) as u32;
                state.next_image = state.next_image.wrapping_add(1);
                index
            }
        };
        drop(state);

        record(
            &self.events,
            MockEvent::Acquire {
                presentation: presentation.id,
                semaphore: image_available,
                image_index,
            },
        );
        (image_index, status)
    }

    fn present(&self, presentation: &MockPresentation, image_index: u32, wait: u32) -> SwapchainStatus {
        let status = self.state().present_script.pop_front().unwrap_or(SwapchainStatus::Ok);
        record(
            &self.events,
            MockEvent::Present {
                presentation: presentation.id,
                image_index,
                wait,
            },
        );
        status
    }

    fn create_semaphore(&self) -> Result<u32> {
        let mut state = self.state();
        let id = state.next_id();
        state.live_semaphores.insert(id);
        drop(state);
        record(&self.events, MockEvent::CreateSemaphore(id));
        Ok(id)
    }

    fn create_fence(&self, signaled: bool) -> Result<u32> {
        let mut state = self.state();
        let index = state.fences_created;
        state.fences_created += 1;
        if state.fail_fence_creation_at == Some(index) {
            state.fail_fence_creation_at = None;
            return Err(Error::OutOfMemory);
        }
        let id = state.next_id();
        state.live_fences.insert(id);
        drop(state);
        record(&self.events, MockEvent::CreateFence { fence: id, signaled });
        Ok(id)
    }

    fn destroy_semaphore(&self, semaphore: u32) {
        self.state().live_semaphores.remove(&semaphore);
        record(&self.events, MockEvent::DestroySemaphore(semaphore));
    }

    fn destroy_fence(&self, fence: u32) {
        self.state().live_fences.remove(&fence);
        record(&self.events, MockEvent::DestroyFence(fence));
    }

    fn wait_for_fence(&self, fence: u32) -> Result<()> {
        record(&self.events, MockEvent::WaitFence(fence));
        Ok(())
    }

    fn reset_fence(&self, fence: u32) -> Result<()> {
        record(&self.events, MockEvent::ResetFence(fence));
        Ok(())
    }

    fn submit(&self, command_buffer: u32, wait: u32, signal: u32, fence: u32) -> Result<()> {
        record(
            &self.events,
            MockEvent::Submit {
                command_buffer,
                wait,
                signal,
                fence,
            },
        );
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        record(&self.events, MockEvent::WaitIdle);
        Ok(())
    }

    fn allocate_command_buffers(&self, count: usize) -> Result<Vec<u32>> {
        let mut state = self.state();
        let ids: Vec<u32> = (0..count).map(|_| state.next_id()).collect();
        state.live_command_buffers.extend(ids.iter().copied());
        drop(state);
        record(&self.events, MockEvent::AllocateCommandBuffers(ids.clone()));
        Ok(ids)
    }

    fn free_command_buffers(&self, command_buffers: &[u32]) {
        let mut state = self.state();
        for id in command_buffers {
            state.live_command_buffers.remove(id);
        }
        drop(state);
        record(&self.events, MockEvent::FreeCommandBuffers(command_buffers.to_vec()));
    }

    fn begin_command_buffer(&self, command_buffer: u32) -> Result<()> {
        record(&self.events, MockEvent::BeginCommandBuffer(command_buffer));
        Ok(())
    }

    fn end_command_buffer(&self, command_buffer: u32) -> Result<()> {
        record(&self.events, MockEvent::EndCommandBuffer(command_buffer));
        Ok(())
    }

    fn cmd_begin_render_pass(
        &self,
        command_buffer: u32,
        _presentation: &MockPresentation,
        image_index: u32,
        clear_values: &[ClearValue],
    ) {
        record(
            &self.events,
            MockEvent::BeginRenderPass {
                command_buffer,
                image_index,
                clear_values: clear_values.to_vec(),
            },
        );
    }

    fn cmd_set_viewport(&self, _command_buffer: u32, viewport: Viewport) {
        record(&self.events, MockEvent::SetViewport(viewport));
    }

    fn cmd_set_scissor(&self, _command_buffer: u32, scissor: Rect2D) {
        record(&self.events, MockEvent::SetScissor(scissor));
    }

    fn cmd_end_render_pass(&self, command_buffer: u32) {
        record(&self.events, MockEvent::EndRenderPass(command_buffer));
    }
}

/// Window whose size follows a script
///
/// Each `wait_events` call moves to the next scripted extent, which lets a
/// test model "minimized for N polls, then restored".
pub struct MockSurface {
    extent: Mutex<Extent2D>,
    after_wait: Mutex<VecDeque<Extent2D>>,
    resized: AtomicBool,
    wait_calls: AtomicUsize,
}

impl MockSurface {
    pub fn new(extent: Extent2D) -> Self {
        Self {
            extent: Mutex::new(extent),
            after_wait: Mutex::new(VecDeque::new()),
            resized: AtomicBool::new(false),
            wait_calls: AtomicUsize::new(0),
        }
    }

    /// Change the size and raise the resize flag, like a window event would
    pub fn resize(&self, extent: Extent2D) {
        if let Ok(mut current) = self.extent.lock() {
            *current = extent;
        }
        self.resized.store(true, Ordering::SeqCst);
    }

    /// Extents taken, in order, by successive `wait_events` calls
    pub fn script_extents_after_wait(&self, extents: Vec<Extent2D>) {
        if let Ok(mut queue) = self.after_wait.lock() {
            queue.extend(extents);
        }
    }

    pub fn wait_calls(&self) -> usize {
        self.wait_calls.load(Ordering::SeqCst)
    }
}

impl Surface for MockSurface {
    fn current_extent(&self) -> Extent2D {
        self.extent.lock().map(|e| *e).unwrap_or_default()
    }

    fn resize_pending(&self) -> bool {
        self.resized.load(Ordering::SeqCst)
    }

    fn clear_resize_flag(&self) {
        self.resized.store(false, Ordering::SeqCst);
    }

    fn wait_events(&self, _interval: Duration) {
        self.wait_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.after_wait.lock().ok().and_then(|mut queue| queue.pop_front());
        if let (Some(next), Ok(mut current)) = (next, self.extent.lock()) {
            *current = next;
        }
    }
}
