use std::time::Duration;

use anyhow::{bail, Result};
use image::RgbaImage;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::gpu::GpuState;
use crate::sampling::plan_scanline_window;

/// Widget that plays an animation as a running partial average.
///
/// Each render folds a circular window of consecutive frames, every one
/// weighted by the reciprocal of the full frame count, so animations longer
/// than the window render a dimmer partial average. `tick` advances the
/// window one frame per elapsed frame interval and always renders, which
/// makes it double as the expose handler.
pub struct ScanlineViewer {
    gpu: GpuState,
    current: usize,
    carry: Duration,
    frame_interval: Duration,
}

impl ScanlineViewer {
    /// Creates a viewer rendering into the given window-like target.
    pub fn new<T>(target: &T, size: PhysicalSize<u32>) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        Ok(Self::from_state(GpuState::new(target, size)?))
    }

    /// Creates a headless viewer rendering into an offscreen target.
    pub fn offscreen(size: PhysicalSize<u32>) -> Result<Self> {
        Ok(Self::from_state(GpuState::offscreen(size)?))
    }

    fn from_state(gpu: GpuState) -> Self {
        Self {
            gpu,
            current: 0,
            carry: Duration::ZERO,
            frame_interval: Duration::from_millis(100),
        }
    }

    /// Playback rate in frames per second.
    pub fn set_frame_rate(&mut self, fps: f32) -> Result<()> {
        if !fps.is_finite() || fps <= 0.0 {
            bail!("frame rate must be positive, got {fps}");
        }
        let interval = Duration::from_secs_f32(1.0 / fps);
        if interval.is_zero() {
            bail!("frame rate {fps} is too fast to schedule");
        }
        self.frame_interval = interval;
        Ok(())
    }

    /// Loads a new animation, rewinds to frame 0, and renders it.
    pub fn load_frames(&mut self, frames: &[RgbaImage]) -> Result<()> {
        self.gpu.load_frames(frames)?;
        self.current = 0;
        self.carry = Duration::ZERO;
        self.render()
    }

    /// Jumps to the given frame (wrapped into range) and renders.
    pub fn set_frame(&mut self, index: usize) -> Result<()> {
        if !self.gpu.has_frames() {
            bail!("no animation loaded; call load_frames first");
        }
        self.current = index % self.gpu.frame_count();
        self.render()
    }

    /// Advances playback by `delta` and renders the current window. The
    /// render happens even when no frame boundary was crossed.
    pub fn tick(&mut self, delta: Duration) -> Result<()> {
        if !self.gpu.has_frames() {
            bail!("no animation loaded; call load_frames first");
        }
        self.carry += delta;
        while self.carry >= self.frame_interval {
            self.carry -= self.frame_interval;
            self.current = (self.current + 1) % self.gpu.frame_count();
        }
        self.render()
    }

    pub fn current_frame(&self) -> usize {
        self.current
    }

    /// Flips the presented image vertically from the next render on.
    pub fn set_flip(&mut self, flip: bool) {
        self.gpu.set_flip(flip);
    }

    /// Resizes the output target; the next `tick` repaints it.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    /// Renders offscreen and returns the window composite as tightly
    /// packed RGBA bytes.
    pub fn render_to_pixels(&mut self) -> Result<Vec<u8>> {
        if !self.gpu.has_frames() {
            bail!("no animation loaded; call load_frames first");
        }
        self.render()?;
        self.gpu.read_pixels()
    }

    /// Dimensions of the loaded frames, `(0, 0)` before the first load.
    pub fn frame_size(&self) -> (u32, u32) {
        self.gpu.frame_size()
    }

    pub fn frame_count(&self) -> usize {
        self.gpu.frame_count()
    }

    fn render(&mut self) -> Result<()> {
        let plan = plan_scanline_window(self.gpu.frame_count(), self.current)?;
        self.gpu.render_window(&plan)
    }
}
