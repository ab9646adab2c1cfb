use anyhow::{bail, Result};
use image::RgbaImage;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::gpu::GpuState;
use crate::sampling::{blend_legs, SamplingPolicy};
use crate::types::BlendOptions;

/// Widget that folds a whole animation into one weighted composite.
///
/// The composite is a weighted arithmetic mean of the sampled frames; no
/// per-pixel median is computed, the widget just keeps its long-standing
/// name. Every entry point renders synchronously before returning, and
/// `stop`-mode drops leave the output scaled down rather than renormalised.
pub struct MedianRenderer {
    gpu: GpuState,
    options: BlendOptions,
}

impl MedianRenderer {
    /// Creates a widget rendering into the given window-like target.
    pub fn new<T>(target: &T, size: PhysicalSize<u32>) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        Ok(Self {
            gpu: GpuState::new(target, size)?,
            options: BlendOptions::default(),
        })
    }

    /// Creates a headless widget rendering into an offscreen target that
    /// `render_to_pixels` reads back.
    pub fn offscreen(size: PhysicalSize<u32>) -> Result<Self> {
        Ok(Self {
            gpu: GpuState::offscreen(size)?,
            options: BlendOptions::default(),
        })
    }

    /// Loads a new animation and renders it immediately, with the given
    /// options if present or the previously set ones otherwise.
    pub fn set_gif(&mut self, frames: &[RgbaImage], options: Option<BlendOptions>) -> Result<()> {
        self.gpu.load_frames(frames)?;
        if let Some(options) = options {
            self.options = options;
        }
        self.render()
    }

    /// Replaces the sampling options and re-renders immediately.
    pub fn set_options(&mut self, options: BlendOptions) -> Result<()> {
        self.options = options;
        self.render()
    }

    pub fn options(&self) -> BlendOptions {
        self.options
    }

    /// Flips the presented image vertically from the next render on.
    pub fn set_flip(&mut self, flip: bool) {
        self.gpu.set_flip(flip);
    }

    /// Resizes the output target and the accumulation targets behind it.
    /// The old composite is gone afterwards; call `redraw` to repaint.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    /// Re-renders the current composite, e.g. after an expose or resize.
    pub fn redraw(&mut self) -> Result<()> {
        self.render()
    }

    /// Renders offscreen and returns the composite as tightly packed RGBA
    /// bytes, row by row from the top.
    pub fn render_to_pixels(&mut self) -> Result<Vec<u8>> {
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
        if !self.gpu.has_frames() {
            bail!("no animation loaded; call set_gif first");
        }
        let policy = SamplingPolicy::new(self.gpu.frame_count(), self.options.sample_count)?;
        let legs = blend_legs(&self.options);
        self.gpu
            .render_composite(&legs, &policy, self.options.wrap_mode)
    }
}
