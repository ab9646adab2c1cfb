use anyhow::{anyhow, bail, Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

/// Where finished composites end up: a swapchain surface for windowed hosts
/// or an offscreen colour target for export and tests.
enum OutputTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

/// One acquired output frame. `swapchain` is `Some` for windowed contexts
/// and must be presented after the submit that draws into `view`.
pub(crate) struct FrameTarget {
    pub view: wgpu::TextureView,
    pub swapchain: Option<wgpu::SurfaceTexture>,
}

/// Device, queue, and the output target composites are presented to.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub size: PhysicalSize<u32>,
    pub output_format: wgpu::TextureFormat,
    target: OutputTarget,
}

impl GpuContext {
    /// Builds a context rendering to the given window-like target.
    ///
    /// Prefers a non-sRGB surface format so the blend arithmetic reaches the
    /// screen without an extra transfer-function step; readback stays
    /// offscreen-only.
    pub(crate) fn new<T>(target: &T, initial_size: PhysicalSize<u32>) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = Self::create_instance();

        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let adapter = Self::request_adapter(&instance, Some(&surface))?;
        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        Self::check_dimensions(&adapter, size)?;
        let (device, queue) = Self::request_device(&adapter)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or_else(|| {
                let fallback = surface_caps.formats[0];
                tracing::warn!(
                    ?fallback,
                    "no linear (non-sRGB) surface format available; falling back"
                );
                fallback
            });

        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .unwrap_or_else(|| surface_caps.present_modes[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            device,
            queue,
            size,
            output_format: surface_format,
            target: OutputTarget::Surface { surface, config },
        })
    }

    /// Builds a windowless context rendering into an `Rgba8Unorm` texture
    /// that `read_pixels` can copy back.
    pub(crate) fn offscreen(initial_size: PhysicalSize<u32>) -> Result<Self> {
        let instance = Self::create_instance();
        let adapter = Self::request_adapter(&instance, None)?;
        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        Self::check_dimensions(&adapter, size)?;
        let (device, queue) = Self::request_device(&adapter)?;
        let texture = create_offscreen_texture(&device, size);

        Ok(Self {
            _instance: instance,
            device,
            queue,
            size,
            output_format: OFFSCREEN_FORMAT,
            target: OutputTarget::Offscreen { texture },
        })
    }

    fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        })
    }

    fn request_adapter(
        instance: &wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<wgpu::Adapter> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );
        Ok(adapter)
    }

    fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("gifmelt device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")
    }

    fn check_dimensions(adapter: &wgpu::Adapter, size: PhysicalSize<u32>) -> Result<()> {
        let max_dimension = adapter.limits().max_texture_dimension_2d;
        if size.width > max_dimension || size.height > max_dimension {
            bail!(
                "GPU max texture dimension is {max_dimension}, requested target is {}x{}",
                size.width,
                size.height
            );
        }
        Ok(())
    }

    /// Reconfigures the output target for a new size. Zero-sized requests
    /// (minimised windows) are ignored.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        match &mut self.target {
            OutputTarget::Surface { surface, config } => {
                config.width = new_size.width;
                config.height = new_size.height;
                surface.configure(&self.device, config);
            }
            OutputTarget::Offscreen { texture } => {
                *texture = create_offscreen_texture(&self.device, new_size);
            }
        }
    }

    /// Acquires the output frame for one present pass.
    pub(crate) fn acquire_frame(&mut self) -> Result<FrameTarget> {
        match &mut self.target {
            OutputTarget::Surface { surface, .. } => {
                let frame = surface
                    .get_current_texture()
                    .context("failed to acquire swapchain frame")?;
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(FrameTarget {
                    view,
                    swapchain: Some(frame),
                })
            }
            OutputTarget::Offscreen { texture } => Ok(FrameTarget {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                swapchain: None,
            }),
        }
    }

    pub(crate) fn is_offscreen(&self) -> bool {
        matches!(self.target, OutputTarget::Offscreen { .. })
    }

    /// Copies the offscreen target back to the CPU as tightly packed RGBA
    /// rows. Buffer copies need 256-byte row alignment, so the copy goes
    /// through a padded staging buffer that is re-tightened here.
    pub(crate) fn read_pixels(&self) -> Result<Vec<u8>> {
        let OutputTarget::Offscreen { texture } = &self.target else {
            bail!("pixel readback is only available on offscreen contexts");
        };

        let width = self.size.width;
        let height = self.size.height;
        let unpadded_bytes_per_row = width * 4;
        let padded_bytes_per_row =
            unpadded_bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
                * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gifmelt readback buffer"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("gifmelt readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .context("failed to wait for readback")?;
        receiver
            .recv()
            .context("readback completion channel closed")?
            .context("failed to map readback buffer")?;

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        for row in mapped.chunks(padded_bytes_per_row as usize) {
            pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
        }
        drop(mapped);
        buffer.unmap();
        Ok(pixels)
    }
}

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn create_offscreen_texture(device: &wgpu::Device, size: PhysicalSize<u32>) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("gifmelt offscreen target"),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
