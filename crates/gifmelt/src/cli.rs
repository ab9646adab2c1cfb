use std::path::{Path, PathBuf};

use clap::Parser;
use image::ImageFormat;
use renderer::{SampleMode, ViewerMode, WrapMode};

#[derive(Parser, Debug)]
#[command(
    name = "gifmelt",
    author,
    version,
    about = "Melt GIF animations into time-blended stills or scanline loops",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Animation to open (a GIF, or any single still image).
    #[arg(value_name = "PATH")]
    pub input: PathBuf,

    /// Viewer widget: `median` (time-blended still) or `scanline` (animating loop).
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_viewer_mode,
        default_value = "median"
    )]
    pub mode: ViewerMode,

    /// Frame the sample walk starts from (may be negative).
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    pub frame: i64,

    /// Step between consecutive samples (negative walks backwards).
    #[arg(long, value_name = "STEP", default_value_t = 1)]
    pub increment: i64,

    /// Number of frames blended into the composite; defaults to the full animation.
    #[arg(long, value_name = "COUNT", value_parser = clap::value_parser!(u32).range(1..))]
    pub samples: Option<u32>,

    /// Walk direction: `forward`, `reverse`, or `bi` (both directions at half weight).
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_sample_mode,
        default_value = "forward"
    )]
    pub sample_mode: SampleMode,

    /// Out-of-range policy: `overflow` (wrap around), `clamp` (repeat the ends), or `stop` (drop).
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_wrap_mode,
        default_value = "overflow"
    )]
    pub wrap: WrapMode,

    /// Scanline playback rate; defaults to the animation's own frame timing.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Render the composite to a PNG at PATH and exit instead of opening a window.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Override the preview window size (e.g. `640x480`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_window_size)]
    pub size: Option<(u32, u32)>,

    /// Flip the output vertically.
    #[arg(long)]
    pub flip: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_viewer_mode(value: &str) -> Result<ViewerMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("viewer mode must not be empty".to_string());
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "median" | "average" | "blend" => Ok(ViewerMode::Median),
        "scanline" | "loop" => Ok(ViewerMode::Scanline),
        other => Err(format!(
            "unknown viewer mode '{other}'; expected median or scanline"
        )),
    }
}

pub fn parse_sample_mode(value: &str) -> Result<SampleMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("sample mode must not be empty".to_string());
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "forward" | "fwd" => Ok(SampleMode::Forward),
        "reverse" | "rev" | "backward" => Ok(SampleMode::Reverse),
        "bi" | "bidirectional" | "both" => Ok(SampleMode::Bidirectional),
        other => Err(format!(
            "unknown sample mode '{other}'; expected forward, reverse, or bi"
        )),
    }
}

pub fn parse_wrap_mode(value: &str) -> Result<WrapMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("wrap mode must not be empty".to_string());
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "overflow" | "wrap" => Ok(WrapMode::Overflow),
        "clamp" => Ok(WrapMode::Clamp),
        "stop" => Ok(WrapMode::Stop),
        other => Err(format!(
            "unknown wrap mode '{other}'; expected overflow, clamp, or stop"
        )),
    }
}

pub fn parse_window_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width in window size".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height in window size".to_string())?;
    if width == 0 || height == 0 {
        return Err("window size must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_export_format(path: &Path) -> Result<ImageFormat, String> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => Ok(ImageFormat::Png),
        None => Err("export path has no extension; expected .png".to_string()),
        Some(other) => Err(format!(
            "unsupported export format '.{other}'; expected .png"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_viewer_mode_aliases() {
        assert_eq!(parse_viewer_mode("median").unwrap(), ViewerMode::Median);
        assert_eq!(parse_viewer_mode("Average").unwrap(), ViewerMode::Median);
        assert_eq!(parse_viewer_mode("scanline").unwrap(), ViewerMode::Scanline);
        assert_eq!(parse_viewer_mode("loop").unwrap(), ViewerMode::Scanline);
        assert!(parse_viewer_mode("melt").is_err());
    }

    #[test]
    fn parses_sample_and_wrap_aliases() {
        assert_eq!(parse_sample_mode("bi").unwrap(), SampleMode::Bidirectional);
        assert_eq!(parse_sample_mode("rev").unwrap(), SampleMode::Reverse);
        assert_eq!(parse_wrap_mode("wrap").unwrap(), WrapMode::Overflow);
        assert_eq!(parse_wrap_mode("stop").unwrap(), WrapMode::Stop);
        assert!(parse_wrap_mode("bounce").is_err());
    }

    #[test]
    fn parses_window_size_dimensions() {
        assert_eq!(parse_window_size("640x480").unwrap(), (640, 480));
        assert_eq!(parse_window_size(" 1920X1080 ").unwrap(), (1920, 1080));
        assert!(parse_window_size("640").is_err());
        assert!(parse_window_size("0x480").is_err());
    }

    #[test]
    fn export_format_accepts_only_png() {
        assert_eq!(
            parse_export_format(Path::new("out.png")).unwrap(),
            ImageFormat::Png
        );
        assert!(parse_export_format(Path::new("out.jpg")).is_err());
        assert!(parse_export_format(Path::new("out")).is_err());
    }
}
