//! Renderer crate for gifmelt.
//!
//! The crate blends the decoded frames of an animation on the GPU into either
//! a time-blended still (the median widget) or a continuously advancing
//! scanline loop. The overall flow is:
//!
//! ```text
//!   CLI / gifmelt
//!          │ ViewerConfig
//!          ▼
//!   run_viewer ──▶ MedianRenderer / ScanlineViewer ──▶ GpuState
//!          │                 │
//!          │                 └─▶ sampling::plan_batches ─▶ accumulate passes
//!          │                                                     │
//!          └────────────── winit event loop                      └─▶ present
//! ```
//!
//! `GpuState` owns all GPU resources (surface or offscreen target, device,
//! pipelines, frame textures, ping-pong accumulation targets); the widgets
//! translate their options into sampling plans and drive it. Everything here
//! is synchronous: each widget call blocks until its passes are submitted.

mod gpu;
mod median;
pub mod sampling;
mod scanline;
mod types;
mod window;

pub use median::MedianRenderer;
pub use scanline::ScanlineViewer;
pub use types::{BlendOptions, SampleMode, ViewerConfig, ViewerMode, WrapMode, FRAME_BATCH};
pub use window::run_viewer;

pub use winit::dpi::PhysicalSize;
