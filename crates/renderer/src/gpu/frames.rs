use anyhow::{bail, Result};
use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

/// Uploaded animation frames plus the shared empty placeholder.
///
/// The placeholder is a 1x1 transparent-black texture created once at
/// pipeline initialisation and bound wherever a pass needs a texture
/// without a frame: unused batch slots, dropped `stop` samples, and the
/// initial accumulation source.
pub(crate) struct FrameStore {
    frames: Vec<wgpu::TextureView>,
    empty: wgpu::TextureView,
    frame_size: (u32, u32),
}

impl FrameStore {
    pub(crate) fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            frames: Vec::new(),
            empty: create_empty_texture(device, queue),
            frame_size: (0, 0),
        }
    }

    /// Replaces the held sequence with freshly uploaded textures.
    ///
    /// Frames are expected to share dimensions; mismatches stretch during
    /// sampling rather than fail, so only debug builds flag them.
    pub(crate) fn load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frames: &[RgbaImage],
    ) -> Result<()> {
        if frames.is_empty() {
            bail!("animation has no frames");
        }
        let (width, height) = frames[0].dimensions();
        let mut uploaded = Vec::with_capacity(frames.len());
        for (index, frame) in frames.iter().enumerate() {
            debug_assert_eq!(
                frame.dimensions(),
                (width, height),
                "frame {index} dimensions differ from frame 0"
            );
            uploaded.push(upload_frame(device, queue, index, frame));
        }
        self.frames = uploaded;
        self.frame_size = (width, height);
        tracing::info!(
            frames = self.frames.len(),
            width,
            height,
            "loaded animation frames"
        );
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Dimensions of the loaded frames, `(0, 0)` before the first load.
    pub(crate) fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    /// View for a valid frame index; callers resolve indices through the
    /// sampling policy first.
    pub(crate) fn frame_view(&self, index: usize) -> &wgpu::TextureView {
        &self.frames[index]
    }

    pub(crate) fn empty_view(&self) -> &wgpu::TextureView {
        &self.empty
    }
}

fn upload_frame(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    index: usize,
    frame: &RgbaImage,
) -> wgpu::TextureView {
    let (width, height) = frame.dimensions();
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(&format!("animation frame #{index}")),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        frame.as_raw(),
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_empty_texture(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
    let data = [0u8, 0, 0, 0];
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("empty placeholder texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &data,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
