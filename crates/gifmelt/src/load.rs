//! Decodes the input animation into RGBA frames plus its native timing.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Delay, ImageReader, RgbaImage};
use tracing::info;

/// Playback rate used when the file carries no usable frame timing.
pub const DEFAULT_FPS: f32 = 10.0;

const MIN_FPS: f32 = 0.1;
const MAX_FPS: f32 = 100.0;

#[derive(Debug)]
pub struct LoadedAnimation {
    pub frames: Vec<RgbaImage>,
    /// Frame rate derived from the first frame's delay.
    pub native_fps: f32,
}

pub fn load_animation(path: &Path) -> Result<LoadedAnimation> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("gif") => load_gif(path),
        _ => load_still(path),
    }
}

fn load_gif(path: &Path) -> Result<LoadedAnimation> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let decoder = GifDecoder::new(BufReader::new(file))
        .with_context(|| format!("failed to read GIF header of {}", path.display()))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .with_context(|| format!("failed to decode GIF frames of {}", path.display()))?;
    if frames.is_empty() {
        bail!("{} contains no frames", path.display());
    }

    let native_fps = frame_rate_from_delay(frames[0].delay());
    let frames: Vec<RgbaImage> = frames.into_iter().map(|frame| frame.into_buffer()).collect();

    let (width, height) = frames[0].dimensions();
    if frames.iter().any(|frame| frame.dimensions() != (width, height)) {
        bail!("{} has frames of mixed dimensions", path.display());
    }

    info!(
        path = %path.display(),
        frames = frames.len(),
        width,
        height,
        fps = native_fps,
        "decoded animation"
    );
    Ok(LoadedAnimation { frames, native_fps })
}

fn load_still(path: &Path) -> Result<LoadedAnimation> {
    let image = ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed to probe the format of {}", path.display()))?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?
        .to_rgba8();

    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "decoded still image"
    );
    Ok(LoadedAnimation {
        frames: vec![image],
        native_fps: DEFAULT_FPS,
    })
}

fn frame_rate_from_delay(delay: Delay) -> f32 {
    let (numer, denom) = delay.numer_denom_ms();
    if numer == 0 || denom == 0 {
        return DEFAULT_FPS;
    }
    let millis = numer as f32 / denom as f32;
    (1000.0 / millis).clamp(MIN_FPS, MAX_FPS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Frame, Rgba};

    fn solid(rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba(rgba))
    }

    #[test]
    fn round_trips_a_gif_with_its_frame_timing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("anim.gif");

        let file = File::create(&path).expect("create gif");
        let mut encoder = GifEncoder::new(file);
        let delay = Delay::from_numer_denom_ms(200, 1);
        encoder
            .encode_frames(vec![
                Frame::from_parts(solid([255, 0, 0, 255]), 0, 0, delay),
                Frame::from_parts(solid([0, 0, 255, 255]), 0, 0, delay),
            ])
            .expect("encode gif");
        // The encoder writes the GIF trailer on drop; finalise the file
        // before reading it back.
        drop(encoder);

        let animation = load_animation(&path).expect("load gif");
        assert_eq!(animation.frames.len(), 2);
        assert_eq!(animation.frames[0].dimensions(), (4, 4));
        assert_eq!(animation.frames[0].get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(animation.frames[1].get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert!((animation.native_fps - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_delay_falls_back_to_the_default_rate() {
        let delay = Delay::from_numer_denom_ms(0, 1);
        assert!((frame_rate_from_delay(delay) - DEFAULT_FPS).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_files_fail_with_the_path_in_the_error() {
        let err = load_animation(Path::new("/nonexistent/melt.gif")).expect_err("must fail");
        assert!(format!("{err:#}").contains("/nonexistent/melt.gif"));
    }
}
