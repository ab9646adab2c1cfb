//! GPU orchestration for the frame-blending pipeline.
//!
//! - `context` owns wgpu instance/device wiring plus the output target, a
//!   swapchain surface or an offscreen texture with CPU readback.
//! - `frames` uploads decoded animation frames and the shared empty
//!   placeholder texture.
//! - `targets` allocates the two half-float colour targets accumulation
//!   passes bounce between.
//! - `compile` assembles the WGSL for the accumulate and present passes
//!   from the frame-slot constant.
//! - `uniforms` packs per-pass weight tables and present options into
//!   std140-compatible blocks.
//! - `pipeline` builds the two render pipelines and their bind groups.
//! - `state` glues everything together and exposes the `GpuState` API the
//!   widgets drive.

mod compile;
mod context;
mod frames;
mod pipeline;
mod state;
mod targets;
mod uniforms;

pub(crate) use state::GpuState;
