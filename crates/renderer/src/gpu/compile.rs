//! WGSL assembly for the accumulation and present passes.
//!
//! The accumulate shader binds a fixed number of frame textures per pass.
//! Its binding declarations and unrolled weighted sum are generated from
//! `FRAME_BATCH`, so the shader cannot drift from the host-side batching;
//! `BlendPipelines::new` re-counts the generated bindings as a final check.

use crate::types::FRAME_BATCH;

/// Full-screen triangle shared by both passes. The v axis is inverted so
/// uv (0, 0) lands on the first texture row at the top of the target,
/// keeping orientation identical across chained passes.
const FULLSCREEN_VERTEX: &str = "\
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -3.0),
        vec2<f32>(3.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let pos = positions[index];
    var out: VertexOutput;
    out.position = vec4<f32>(pos, 0.0, 1.0);
    out.uv = vec2<f32>(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    return out;
}
";

const PRESENT_FRAGMENT: &str = "\
struct PresentParams {
    flip: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

@group(0) @binding(0) var<uniform> params: PresentParams;
@group(1) @binding(0) var frame_sampler: sampler;
@group(1) @binding(1) var source_texture: texture_2d<f32>;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var uv = in.uv;
    if params.flip != 0u {
        uv.y = 1.0 - uv.y;
    }
    return textureSample(source_texture, frame_sampler, uv);
}
";

/// Assembles the accumulate shader: the running sum sampled from the source
/// plus one weighted term per frame slot, fully unrolled.
pub(crate) fn accumulate_shader_source() -> String {
    let mut source = String::new();
    source.push_str(&format!(
        "struct AccumulateParams {{\n    weights: array<vec4<f32>, {FRAME_BATCH}>,\n}}\n\n"
    ));
    source.push_str("@group(0) @binding(0) var<uniform> params: AccumulateParams;\n");
    source.push_str("@group(1) @binding(0) var frame_sampler: sampler;\n");
    source.push_str("@group(1) @binding(1) var source_texture: texture_2d<f32>;\n");
    for slot in 0..FRAME_BATCH {
        source.push_str(&format!(
            "@group(1) @binding({binding}) var frame_{slot}: texture_2d<f32>;\n",
            binding = slot + 2
        ));
    }
    source.push('\n');
    source.push_str(FULLSCREEN_VERTEX);
    source.push_str("\n@fragment\nfn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {\n");
    source.push_str("    var color = textureSample(source_texture, frame_sampler, in.uv);\n");
    for slot in 0..FRAME_BATCH {
        source.push_str(&format!(
            "    color += params.weights[{slot}].x * textureSample(frame_{slot}, frame_sampler, in.uv);\n"
        ));
    }
    source.push_str("    return color;\n}\n");
    source
}

pub(crate) fn present_shader_source() -> String {
    format!("{FULLSCREEN_VERTEX}\n{PRESENT_FRAGMENT}")
}

/// Counts the per-frame texture bindings declared by an assembled shader.
pub(crate) fn frame_binding_count(source: &str) -> usize {
    source
        .lines()
        .filter(|line| {
            let line = line.trim_start();
            line.starts_with("@group(1)")
                && line.contains("var frame_")
                && line.contains("texture_2d")
        })
        .count()
}

pub(crate) fn create_shader_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_shader_declares_every_frame_slot() {
        let source = accumulate_shader_source();
        assert_eq!(frame_binding_count(&source), FRAME_BATCH);
        assert!(source.contains(&format!("array<vec4<f32>, {FRAME_BATCH}>")));
    }

    #[test]
    fn accumulate_shader_folds_source_before_frames() {
        let source = accumulate_shader_source();
        let sum_start = source
            .find("var color = textureSample(source_texture")
            .expect("source term missing");
        let first_frame_term = source
            .find("params.weights[0].x * textureSample(frame_0")
            .expect("frame term missing");
        assert!(sum_start < first_frame_term);
        assert!(source.contains(&format!(
            "params.weights[{last}].x * textureSample(frame_{last}",
            last = FRAME_BATCH - 1
        )));
    }

    #[test]
    fn present_shader_flips_only_on_request() {
        let source = present_shader_source();
        assert!(source.contains("if params.flip != 0u"));
        assert!(source.contains("uv.y = 1.0 - uv.y"));
    }

    #[test]
    fn sampler_binding_is_not_counted_as_a_frame() {
        let source = accumulate_shader_source();
        assert!(source.contains("var frame_sampler: sampler"));
        assert_eq!(frame_binding_count("@group(1) @binding(0) var frame_sampler: sampler;"), 0);
    }
}
