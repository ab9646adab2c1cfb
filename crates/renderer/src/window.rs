//! Windowed preview runtime driving either widget over a winit event loop.
//!
//! Median previews repaint on demand; scanline playback paces redraws with
//! `ControlFlow::WaitUntil` at the configured frame rate. Minimal keys:
//! Esc/q quits, Space pauses scanline playback, Left/Right step the
//! current frame.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use image::RgbaImage;
use tracing::{error, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::median::MedianRenderer;
use crate::scanline::ScanlineViewer;
use crate::types::{ViewerConfig, ViewerMode};

enum Widget {
    Median(MedianRenderer),
    Scanline(ScanlineViewer),
}

impl Widget {
    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        match self {
            Widget::Median(median) => median.resize(new_size),
            Widget::Scanline(viewer) => viewer.resize(new_size),
        }
    }
}

/// Opens a preview window for the given frames and runs until closed.
pub fn run_viewer(frames: Vec<RgbaImage>, config: ViewerConfig) -> Result<()> {
    if frames.is_empty() {
        bail!("animation has no frames");
    }
    if !config.frame_rate.is_finite() || config.frame_rate <= 0.0 {
        bail!("frame rate must be positive, got {}", config.frame_rate);
    }

    let event_loop = EventLoop::new()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let (frame_width, frame_height) = frames[0].dimensions();
    let (width, height) = config.window_size.unwrap_or((frame_width, frame_height));
    let mut size = PhysicalSize::new(width.max(1), height.max(1));

    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let mut widget = match config.mode {
        ViewerMode::Median => {
            let mut median = MedianRenderer::new(window.as_ref(), size)?;
            median.set_flip(config.flip);
            median.set_gif(&frames, Some(config.options))?;
            Widget::Median(median)
        }
        ViewerMode::Scanline => {
            let mut viewer = ScanlineViewer::new(window.as_ref(), size)?;
            viewer.set_flip(config.flip);
            viewer.set_frame_rate(config.frame_rate)?;
            viewer.load_frames(&frames)?;
            let start = config
                .options
                .current_frame
                .rem_euclid(viewer.frame_count() as i64) as usize;
            if start != 0 {
                viewer.set_frame(start)?;
            }
            Widget::Scanline(viewer)
        }
    };

    let tick_interval = Duration::from_secs_f32(1.0 / config.frame_rate);
    let mut paused = false;
    let mut last_tick = Instant::now();
    window.request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state != ElementState::Pressed || event.repeat {
                        return;
                    }
                    let quit = matches!(event.logical_key, Key::Named(NamedKey::Escape))
                        || matches!(event.logical_key, Key::Character(ref value) if value.as_str() == "q");
                    if quit {
                        elwt.exit();
                        return;
                    }
                    match event.logical_key {
                        Key::Named(NamedKey::Space) => {
                            if matches!(widget, Widget::Scanline(_)) {
                                paused = !paused;
                                if !paused {
                                    last_tick = Instant::now();
                                    window.request_redraw();
                                }
                            }
                        }
                        Key::Named(NamedKey::ArrowLeft) => {
                            if let Err(err) = step_frame(&mut widget, -1) {
                                error!(error = %err, "failed to step frame");
                            }
                        }
                        Key::Named(NamedKey::ArrowRight) => {
                            if let Err(err) = step_frame(&mut widget, 1) {
                                error!(error = %err, "failed to step frame");
                            }
                        }
                        _ => {}
                    }
                }
                WindowEvent::Resized(new_size) => {
                    size = new_size;
                    widget.resize(new_size);
                    window.request_redraw();
                }
                WindowEvent::ScaleFactorChanged {
                    mut inner_size_writer,
                    ..
                } => {
                    let _ = inner_size_writer.request_inner_size(size);
                }
                WindowEvent::RedrawRequested => {
                    let render_result = match &mut widget {
                        Widget::Median(median) => median.redraw(),
                        Widget::Scanline(viewer) => {
                            let now = Instant::now();
                            let delta = if paused {
                                Duration::ZERO
                            } else {
                                now.saturating_duration_since(last_tick)
                            };
                            last_tick = now;
                            viewer.tick(delta)
                        }
                    };
                    if let Err(err) = render_result {
                        match err.downcast_ref::<wgpu::SurfaceError>() {
                            Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                widget.resize(size);
                                window.request_redraw();
                            }
                            Some(wgpu::SurfaceError::OutOfMemory) => {
                                error!("surface out of memory; exiting preview");
                                elwt.exit();
                            }
                            Some(wgpu::SurfaceError::Timeout) => {
                                warn!("surface timeout; retrying next frame");
                            }
                            Some(other) => {
                                warn!(error = ?other, "surface error; retrying next frame");
                            }
                            None => {
                                error!(error = %err, "render failed");
                                elwt.exit();
                            }
                        }
                    }
                }
                _ => {}
            },
            Event::AboutToWait => match (&widget, paused) {
                (Widget::Scanline(_), false) => {
                    let deadline = last_tick + tick_interval;
                    if Instant::now() >= deadline {
                        window.request_redraw();
                    }
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                }
                _ => {
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            },
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

/// Steps the visible frame by `direction`: the median widget re-renders
/// around a shifted current frame, the scanline widget jumps its window.
fn step_frame(widget: &mut Widget, direction: i64) -> Result<()> {
    match widget {
        Widget::Median(median) => {
            let mut options = median.options();
            options.current_frame += direction;
            median.set_options(options)
        }
        Widget::Scanline(viewer) => {
            let count = viewer.frame_count() as i64;
            let next = (viewer.current_frame() as i64 + direction).rem_euclid(count);
            viewer.set_frame(next as usize)
        }
    }
}
