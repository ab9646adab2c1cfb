use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use renderer::{
    BlendOptions, MedianRenderer, PhysicalSize, ScanlineViewer, ViewerConfig, ViewerMode,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{self, Cli};
use crate::load::{load_animation, LoadedAnimation};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let LoadedAnimation { frames, native_fps } = load_animation(&cli.input)?;

    let options = BlendOptions {
        current_frame: cli.frame,
        frame_increment: cli.increment,
        sample_mode: cli.sample_mode,
        sample_count: cli.samples.unwrap_or(frames.len() as u32),
        wrap_mode: cli.wrap,
    };
    let title = cli
        .input
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| format!("gifmelt: {name}"))
        .unwrap_or_else(|| "gifmelt".to_string());
    let config = ViewerConfig {
        title,
        mode: cli.mode,
        options,
        frame_rate: cli.fps.unwrap_or(native_fps),
        window_size: cli.size,
        flip: cli.flip,
    };

    match cli.export {
        Some(path) => export_still(&frames, &config, &path),
        None => renderer::run_viewer(frames, config),
    }
}

/// Renders the composite on an offscreen device and writes it out as a PNG.
fn export_still(frames: &[RgbaImage], config: &ViewerConfig, path: &Path) -> Result<()> {
    let format = cli::parse_export_format(path).map_err(|message| anyhow!(message))?;

    let (frame_width, frame_height) = frames[0].dimensions();
    let (width, height) = config.window_size.unwrap_or((frame_width, frame_height));
    let size = PhysicalSize::new(width.max(1), height.max(1));

    let pixels = match config.mode {
        ViewerMode::Median => {
            let mut renderer = MedianRenderer::offscreen(size)?;
            renderer.set_flip(config.flip);
            renderer.set_gif(frames, Some(config.options))?;
            renderer.render_to_pixels()?
        }
        ViewerMode::Scanline => {
            let mut viewer = ScanlineViewer::offscreen(size)?;
            viewer.set_flip(config.flip);
            viewer.load_frames(frames)?;
            let start = config
                .options
                .current_frame
                .rem_euclid(frames.len() as i64) as usize;
            viewer.set_frame(start)?;
            viewer.render_to_pixels()?
        }
    };

    let image = RgbaImage::from_raw(size.width, size.height, pixels)
        .ok_or_else(|| anyhow!("readback does not match the export dimensions"))?;
    image
        .save_with_format(path, format)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(
        path = %path.display(),
        width = size.width,
        height = size.height,
        mode = %config.mode,
        "exported composite"
    );
    Ok(())
}
