//! Integration tests for swap chain negotiation and the frame loop
//!
//! Uses a minimal headless device implemented against the public traits.
//! No GPU required.
//!
//! Run with: cargo test --test presentation_integration_tests

use kami_engine::kami::present::negotiation::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format,
    find_depth_format,
};
use kami_engine::kami::present::{
    ClearValue, ColorSpace, Extent2D, Format, PresentDevice, PresentMode, PresentationDesc,
    PresentationSurface, Rect2D, Surface, SurfaceCapabilities, SurfaceFormat, SwapchainStatus,
    Viewport,
};
use kami_engine::kami::{Error, Renderer, RendererConfig, Result};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// HEADLESS DEVICE
// ============================================================================

struct HeadlessPresentation {
    desc: PresentationDesc,
    generation: u32,
}

impl PresentationSurface for HeadlessPresentation {
    type RenderPass = u32;

    fn image_count(&self) -> usize {
        self.desc.min_image_count as usize
    }

    fn extent(&self) -> Extent2D {
        self.desc.extent
    }

    fn color_format(&self) -> Format {
        self.desc.surface_format.format
    }

    fn depth_format(&self) -> Format {
        self.desc.depth_format
    }

    fn render_pass(&self) -> u32 {
        self.generation
    }
}

#[derive(Default)]
struct HeadlessDevice {
    next_handle: AtomicU32,
    generations: AtomicU32,
    acquired: AtomicU32,
    presents: AtomicUsize,
    present_script: Mutex<Vec<SwapchainStatus>>,
}

impl HeadlessDevice {
    fn handle(&self) -> u32 {
        self.next_handle.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl PresentDevice for HeadlessDevice {
    type Semaphore = u32;
    type Fence = u32;
    type CommandBuffer = u32;
    type Presentation = HeadlessPresentation;

    fn surface_capabilities(&self) -> Result<SurfaceCapabilities> {
        Ok(SurfaceCapabilities {
            min_image_count: 2,
            max_image_count: 0,
            current_extent: None,
            min_image_extent: Extent2D::new(1, 1),
            max_image_extent: Extent2D::new(8192, 8192),
        })
    }

    fn surface_formats(&self) -> Result<Vec<SurfaceFormat>> {
        Ok(vec![SurfaceFormat::new(Format::B8G8R8A8_SRGB, ColorSpace::SrgbNonlinear)])
    }

    fn present_modes(&self) -> Result<Vec<PresentMode>> {
        Ok(vec![PresentMode::Fifo])
    }

    fn supports_depth_format(&self, format: Format) -> bool {
        format == Format::D24_UNORM_S8_UINT
    }

    fn create_presentation(
        &self,
        desc: &PresentationDesc,
        _previous: Option<&HeadlessPresentation>,
    ) -> Result<HeadlessPresentation> {
        Ok(HeadlessPresentation {
            desc: *desc,
            generation: self.generations.fetch_add(1, Ordering::SeqCst),
        })
    }

    fn acquire_next_image(&self, presentation: &HeadlessPresentation, _s: u32) -> (u32, SwapchainStatus) {
        let n = self.acquired.fetch_add(1, Ordering::SeqCst);
        (n % presentation.image_count() as u32, SwapchainStatus::Ok)
    }

    fn present(&self, _p: &HeadlessPresentation, _index: u32, _wait: u32) -> SwapchainStatus {
        self.presents.fetch_add(1, Ordering::SeqCst);
        self.present_script.lock().unwrap().pop().unwrap_or(SwapchainStatus::Ok)
    }

    fn create_semaphore(&self) -> Result<u32> {
        Ok(self.handle())
    }

    fn create_fence(&self, _signaled: bool) -> Result<u32> {
        Ok(self.handle())
    }

    fn destroy_semaphore(&self, _semaphore: u32) {}

    fn destroy_fence(&self, _fence: u32) {}

    fn wait_for_fence(&self, _fence: u32) -> Result<()> {
        Ok(())
    }

    fn reset_fence(&self, _fence: u32) -> Result<()> {
        Ok(())
    }

    fn submit(&self, _cmd: u32, _wait: u32, _signal: u32, _fence: u32) -> Result<()> {
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn allocate_command_buffers(&self, count: usize) -> Result<Vec<u32>> {
        Ok((0..count).map(|_| self.handle()).collect())
    }

    fn free_command_buffers(&self, _command_buffers: &[u32]) {}

    fn begin_command_buffer(&self, _cmd: u32) -> Result<()> {
        Ok(())
    }

    fn end_command_buffer(&self, _cmd: u32) -> Result<()> {
        Ok(())
    }

    fn cmd_begin_render_pass(&self, _cmd: u32, _p: &HeadlessPresentation, _index: u32, _clear: &[ClearValue]) {}

    fn cmd_set_viewport(&self, _cmd: u32, _viewport: Viewport) {}

    fn cmd_set_scissor(&self, _cmd: u32, _scissor: Rect2D) {}

    fn cmd_end_render_pass(&self, _cmd: u32) {}
}

struct FixedSurface {
    extent: Mutex<Extent2D>,
    resized: AtomicBool,
}

impl Surface for FixedSurface {
    fn current_extent(&self) -> Extent2D {
        *self.extent.lock().unwrap()
    }

    fn resize_pending(&self) -> bool {
        self.resized.load(Ordering::SeqCst)
    }

    fn clear_resize_flag(&self) {
        self.resized.store(false, Ordering::SeqCst);
    }

    fn wait_events(&self, _interval: Duration) {}
}

fn headless_renderer() -> (Arc<HeadlessDevice>, Arc<FixedSurface>, Renderer<HeadlessDevice, FixedSurface>) {
    let device = Arc::new(HeadlessDevice::default());
    let surface = Arc::new(FixedSurface {
        extent: Mutex::new(Extent2D::new(800, 600)),
        resized: AtomicBool::new(false),
    });
    let renderer = Renderer::new(device.clone(), surface.clone(), RendererConfig::default())
        .expect("headless renderer should build");
    (device, surface, renderer)
}

// ============================================================================
// NEGOTIATION TESTS
// ============================================================================

#[test]
fn test_integration_negotiation_is_deterministic() {
    let formats = [
        SurfaceFormat::new(Format::R8G8B8A8_UNORM, ColorSpace::SrgbNonlinear),
        SurfaceFormat::new(Format::B8G8R8A8_SRGB, ColorSpace::SrgbNonlinear),
    ];
    let preferred = RendererConfig::default().preferred_surface_format;

    let first = choose_surface_format(&formats, preferred);
    for _ in 0..10 {
        assert_eq!(choose_surface_format(&formats, preferred), first);
    }
    assert_eq!(first, Some(preferred));
}

#[test]
fn test_integration_negotiation_fallbacks() {
    assert_eq!(choose_present_mode(&[PresentMode::Fifo], &[PresentMode::Mailbox]), PresentMode::Fifo);

    let caps = SurfaceCapabilities {
        min_image_count: 2,
        max_image_count: 0,
        current_extent: None,
        min_image_extent: Extent2D::new(16, 16),
        max_image_extent: Extent2D::new(1920, 1080),
    };
    assert_eq!(choose_image_count(&caps), 3);
    assert_eq!(choose_extent(Extent2D::new(4000, 8), &caps), Extent2D::new(1920, 16));

    let depth = find_depth_format(&RendererConfig::default().depth_format_candidates, |f| {
        f.has_stencil()
    });
    assert_eq!(depth, Some(Format::D32_FLOAT_S8_UINT));
}

// ============================================================================
// FRAME LOOP TESTS
// ============================================================================

#[test]
fn test_integration_frame_loop() {
    let (device, _surface, mut renderer) = headless_renderer();

    assert_eq!(renderer.image_count(), 3);
    assert_eq!(renderer.swap_chain().unwrap().depth_format(), Format::D24_UNORM_S8_UINT);

    for _ in 0..10 {
        let cmd = renderer.begin_frame().unwrap().expect("frame should start");
        renderer.begin_swap_chain_render_pass(cmd).unwrap();
        renderer.end_swap_chain_render_pass(cmd).unwrap();
        renderer.end_frame().unwrap();
    }

    assert_eq!(device.presents.load(Ordering::SeqCst), 10);
    assert_eq!(renderer.render_pass().unwrap(), 0);
}

#[test]
fn test_integration_resize_rebuilds_swap_chain() {
    let (device, surface, mut renderer) = headless_renderer();

    *surface.extent.lock().unwrap() = Extent2D::new(1024, 768);
    surface.resized.store(true, Ordering::SeqCst);

    renderer.begin_frame().unwrap().unwrap();
    renderer.end_frame().unwrap();

    assert_eq!(renderer.extent(), Extent2D::new(1024, 768));
    assert_eq!(device.generations.load(Ordering::SeqCst), 2);
    assert!(!surface.resize_pending());
    assert!(!renderer.take_render_pass_changed());
}

#[test]
fn test_integration_stale_present_rebuilds() {
    let (device, _surface, mut renderer) = headless_renderer();

    device.present_script.lock().unwrap().push(SwapchainStatus::Stale);
    renderer.begin_frame().unwrap().unwrap();
    renderer.end_frame().unwrap();

    assert_eq!(device.generations.load(Ordering::SeqCst), 2);
    assert_eq!(renderer.render_pass().unwrap(), 1);
}

#[test]
fn test_integration_contract_violation() {
    let (_device, _surface, mut renderer) = headless_renderer();

    let result = renderer.end_frame();
    match result {
        Err(err @ Error::ContractViolation(_)) => assert!(err.is_contract_violation()),
        other => panic!("expected a contract violation, got {:?}", other),
    }
}
