use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::trace;
use winit::dpi::PhysicalSize;

use crate::sampling::{plan_batches, BatchPlan, BlendLeg, SamplingPolicy};
use crate::types::{WrapMode, FRAME_BATCH};

use super::context::GpuContext;
use super::frames::FrameStore;
use super::pipeline::BlendPipelines;
use super::targets::{AccumSource, RenderTargetPair};
use super::uniforms::{AccumulateParams, PresentParams};

/// GPU half shared by both widgets: owns the context, the pipelines, the
/// loaded frames, and the accumulation target pair, and encodes the passes
/// one composite needs.
///
/// Every render entry point is synchronous; all passes are encoded and
/// submitted before the call returns, so callers serialise reloads and
/// resizes simply by holding `&mut self`.
pub(crate) struct GpuState {
    context: GpuContext,
    pipelines: BlendPipelines,
    frames: FrameStore,
    targets: RenderTargetPair,
    flip: bool,
}

impl GpuState {
    pub(crate) fn new<T>(target: &T, size: PhysicalSize<u32>) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        Ok(Self::from_context(GpuContext::new(target, size)?))
    }

    pub(crate) fn offscreen(size: PhysicalSize<u32>) -> Result<Self> {
        Ok(Self::from_context(GpuContext::offscreen(size)?))
    }

    fn from_context(context: GpuContext) -> Self {
        let pipelines = BlendPipelines::new(&context.device, context.output_format);
        let frames = FrameStore::new(&context.device, &context.queue);
        let targets = RenderTargetPair::new(&context.device, context.size);
        Self {
            context,
            pipelines,
            frames,
            targets,
            flip: false,
        }
    }

    pub(crate) fn set_flip(&mut self, flip: bool) {
        self.flip = flip;
    }

    pub(crate) fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn has_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    pub(crate) fn frame_size(&self) -> (u32, u32) {
        self.frames.frame_size()
    }

    pub(crate) fn is_offscreen(&self) -> bool {
        self.context.is_offscreen()
    }

    /// Uploads a new frame sequence and recreates the accumulation pair so
    /// no stale composite survives the reload.
    pub(crate) fn load_frames(&mut self, frames: &[image::RgbaImage]) -> Result<()> {
        self.frames
            .load(&self.context.device, &self.context.queue, frames)?;
        self.targets = RenderTargetPair::new(&self.context.device, self.context.size);
        Ok(())
    }

    /// Resizes the output target and reallocates the accumulation pair to
    /// match. Zero-sized requests are ignored.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        self.targets = RenderTargetPair::new(&self.context.device, self.context.size);
    }

    /// Renders a full composite: every leg accumulated in order, each leg
    /// folding onto the previous leg's output, then the result presented.
    pub(crate) fn render_composite(
        &mut self,
        legs: &[BlendLeg],
        policy: &SamplingPolicy,
        wrap: WrapMode,
    ) -> Result<()> {
        // Acquire early; for windowed contexts this is the call that blocks.
        let frame = self.context.acquire_frame()?;
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("composite encoder"),
                });

        let mut source = AccumSource::Empty;
        for leg in legs {
            source = self.accumulate(&mut encoder, policy, leg, wrap, source);
        }
        self.encode_present_pass(&mut encoder, source, &frame.view);

        self.context.queue.submit(std::iter::once(encoder.finish()));
        if let Some(swapchain) = frame.swapchain {
            swapchain.present();
        }
        Ok(())
    }

    /// Renders one pre-planned batch (the scanline window) and presents it.
    pub(crate) fn render_window(&mut self, plan: &BatchPlan) -> Result<()> {
        let frame = self.context.acquire_frame()?;
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("scanline encoder"),
                });

        let source = self.encode_accumulate_pass(&mut encoder, plan, AccumSource::Empty);
        self.encode_present_pass(&mut encoder, source, &frame.view);

        self.context.queue.submit(std::iter::once(encoder.finish()));
        if let Some(swapchain) = frame.swapchain {
            swapchain.present();
        }
        Ok(())
    }

    /// Reads the offscreen target back as tightly packed RGBA bytes.
    pub(crate) fn read_pixels(&self) -> Result<Vec<u8>> {
        self.context.read_pixels()
    }

    /// Runs one accumulate leg: partitions the walk into batches and
    /// encodes one pass per batch, bouncing between the pair slots.
    /// Returns the slot holding the running sum afterwards.
    fn accumulate(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        policy: &SamplingPolicy,
        leg: &BlendLeg,
        wrap: WrapMode,
        initial_source: AccumSource,
    ) -> AccumSource {
        let plans = plan_batches(
            policy,
            leg.initial_index,
            leg.increment,
            wrap,
            leg.weight_multiplier,
        );
        trace!(
            batches = plans.len(),
            initial_index = leg.initial_index,
            increment = leg.increment,
            "encoding accumulate leg"
        );
        let mut source = initial_source;
        for plan in &plans {
            source = self.encode_accumulate_pass(encoder, plan, source);
        }
        source
    }

    fn encode_accumulate_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        plan: &BatchPlan,
        source: AccumSource,
    ) -> AccumSource {
        let destination = source.destination();
        let source_view = self.source_view(source);

        let mut frame_views = [self.frames.empty_view(); FRAME_BATCH];
        for (slot, sample) in plan.samples.iter().enumerate() {
            if let Some(frame) = sample.frame {
                frame_views[slot] = self.frames.frame_view(frame);
            }
        }

        let params = AccumulateParams::from_plan(plan);
        let uniform_bind_group = self.pipelines.create_uniform_bind_group(
            &self.context.device,
            "accumulate uniforms",
            bytemuck::bytes_of(&params),
        );
        let texture_bind_group = self.pipelines.create_accumulate_texture_bind_group(
            &self.context.device,
            source_view,
            &frame_views,
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("accumulate pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.targets.view(destination),
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipelines.accumulate);
        pass.set_bind_group(0, &uniform_bind_group, &[]);
        pass.set_bind_group(1, &texture_bind_group, &[]);
        pass.draw(0..3, 0..1);

        AccumSource::Slot(destination)
    }

    fn encode_present_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: AccumSource,
        output: &wgpu::TextureView,
    ) {
        let params = PresentParams::new(self.flip);
        let uniform_bind_group = self.pipelines.create_uniform_bind_group(
            &self.context.device,
            "present uniforms",
            bytemuck::bytes_of(&params),
        );
        let texture_bind_group = self
            .pipelines
            .create_present_texture_bind_group(&self.context.device, self.source_view(source));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("present pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipelines.present);
        pass.set_bind_group(0, &uniform_bind_group, &[]);
        pass.set_bind_group(1, &texture_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn source_view(&self, source: AccumSource) -> &wgpu::TextureView {
        match source {
            AccumSource::Empty => self.frames.empty_view(),
            AccumSource::Slot(slot) => self.targets.view(slot),
        }
    }
}
