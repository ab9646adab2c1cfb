use wgpu::util::DeviceExt;

use crate::types::FRAME_BATCH;

use super::compile::{
    accumulate_shader_source, create_shader_module, frame_binding_count, present_shader_source,
};
use super::targets::ACCUMULATION_FORMAT;

/// Render pipelines for the two pass kinds plus the layouts their bind
/// groups are built against.
///
/// Group 0 carries the per-pass uniform buffer; group 1 carries the shared
/// sampler, the source texture, and (for accumulate passes) the frame slots.
pub(crate) struct BlendPipelines {
    pub accumulate: wgpu::RenderPipeline,
    pub present: wgpu::RenderPipeline,
    pub uniform_layout: wgpu::BindGroupLayout,
    pub accumulate_texture_layout: wgpu::BindGroupLayout,
    pub present_texture_layout: wgpu::BindGroupLayout,
    pub sampler: wgpu::Sampler,
}

impl BlendPipelines {
    pub(crate) fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat) -> Self {
        let accumulate_source = accumulate_shader_source();
        assert_eq!(
            frame_binding_count(&accumulate_source),
            FRAME_BATCH,
            "assembled accumulate shader disagrees with FRAME_BATCH"
        );
        let accumulate_module =
            create_shader_module(device, "accumulate shader", &accumulate_source);
        let present_module =
            create_shader_module(device, "present shader", &present_shader_source());

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let accumulate_texture_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("accumulate texture layout"),
                entries: &build_texture_layout_entries(FRAME_BATCH),
            });
        let present_texture_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("present texture layout"),
                entries: &build_texture_layout_entries(0),
            });

        let accumulate = create_pass_pipeline(
            device,
            "accumulate pipeline",
            &accumulate_module,
            &uniform_layout,
            &accumulate_texture_layout,
            ACCUMULATION_FORMAT,
        );
        let present = create_pass_pipeline(
            device,
            "present pipeline",
            &present_module,
            &uniform_layout,
            &present_texture_layout,
            output_format,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            accumulate,
            present,
            uniform_layout,
            accumulate_texture_layout,
            present_texture_layout,
            sampler,
        }
    }

    /// Builds the uniform bind group for one pass from a freshly created
    /// buffer. Each pass gets its own buffer so no pass can observe the
    /// weights of another in the same submission.
    pub(crate) fn create_uniform_bind_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        contents: &[u8],
    ) -> wgpu::BindGroup {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    /// Binds the sampler, the pass source, and one view per frame slot for
    /// an accumulate pass.
    pub(crate) fn create_accumulate_texture_bind_group(
        &self,
        device: &wgpu::Device,
        source: &wgpu::TextureView,
        frame_views: &[&wgpu::TextureView; FRAME_BATCH],
    ) -> wgpu::BindGroup {
        let mut entries = Vec::with_capacity(FRAME_BATCH + 2);
        entries.push(wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::TextureView(source),
        });
        for (slot, view) in frame_views.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: (slot as u32) + 2,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("accumulate texture bind group"),
            layout: &self.accumulate_texture_layout,
            entries: &entries,
        })
    }

    pub(crate) fn create_present_texture_bind_group(
        &self,
        device: &wgpu::Device,
        source: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("present texture bind group"),
            layout: &self.present_texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(source),
                },
            ],
        })
    }
}

fn build_texture_layout_entries(frame_slots: usize) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(frame_slots + 2);
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });
    for slot in 0..=frame_slots {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: (slot as u32) + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
    }
    entries
}

fn create_pass_pipeline(
    device: &wgpu::Device,
    label: &str,
    module: &wgpu::ShaderModule,
    uniform_layout: &wgpu::BindGroupLayout,
    texture_layout: &wgpu::BindGroupLayout,
    target_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[uniform_layout, texture_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_layout_covers_sampler_source_and_frames() {
        let entries = build_texture_layout_entries(FRAME_BATCH);
        assert_eq!(entries.len(), FRAME_BATCH + 2);
        assert!(matches!(entries[0].ty, wgpu::BindingType::Sampler(_)));
        for (index, entry) in entries.iter().enumerate() {
            assert_eq!(entry.binding, index as u32);
        }
    }

    #[test]
    fn present_layout_has_no_frame_slots() {
        let entries = build_texture_layout_entries(0);
        assert_eq!(entries.len(), 2);
    }
}
