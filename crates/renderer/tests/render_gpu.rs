//! GPU composite tests running against an offscreen device. Every test
//! skips silently when no adapter is available so the suite still passes
//! on headless or GPU-less machines.

use std::time::Duration;

use image::{Rgba, RgbaImage};
use renderer::{
    BlendOptions, MedianRenderer, PhysicalSize, SampleMode, ScanlineViewer, WrapMode,
};

const SIZE: u32 = 16;
const ADAPTER_MISSING: &str = "failed to find a suitable GPU adapter";

fn median_or_skip() -> Option<MedianRenderer> {
    match MedianRenderer::offscreen(PhysicalSize::new(SIZE, SIZE)) {
        Ok(renderer) => Some(renderer),
        Err(err) if format!("{err:#}").contains(ADAPTER_MISSING) => {
            eprintln!("skipping: no GPU adapter available");
            None
        }
        Err(err) => panic!("unexpected GPU setup error: {err:#}"),
    }
}

fn scanline_or_skip() -> Option<ScanlineViewer> {
    match ScanlineViewer::offscreen(PhysicalSize::new(SIZE, SIZE)) {
        Ok(viewer) => Some(viewer),
        Err(err) if format!("{err:#}").contains(ADAPTER_MISSING) => {
            eprintln!("skipping: no GPU adapter available");
            None
        }
        Err(err) => panic!("unexpected GPU setup error: {err:#}"),
    }
}

fn solid_frame(rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(SIZE, SIZE, Rgba(rgba))
}

/// Red, green, blue, white. The uniform average is mid grey at full alpha.
fn primary_frames() -> Vec<RgbaImage> {
    vec![
        solid_frame([255, 0, 0, 255]),
        solid_frame([0, 255, 0, 255]),
        solid_frame([0, 0, 255, 255]),
        solid_frame([255, 255, 255, 255]),
    ]
}

const PRIMARY_MEAN: [u8; 4] = [128, 128, 128, 255];

fn assert_pixels_close(pixels: &[u8], expected: [u8; 4], tolerance: i16) {
    assert_eq!(pixels.len(), (SIZE * SIZE * 4) as usize);
    for (index, pixel) in pixels.chunks_exact(4).enumerate() {
        for lane in 0..4 {
            let got = i16::from(pixel[lane]);
            let want = i16::from(expected[lane]);
            assert!(
                (got - want).abs() <= tolerance,
                "pixel {index} lane {lane}: got {got}, expected {want} ± {tolerance}"
            );
        }
    }
}

#[test]
fn forward_overflow_averages_all_frames() {
    let Some(mut renderer) = median_or_skip() else {
        return;
    };
    let options = BlendOptions {
        sample_count: 4,
        ..BlendOptions::default()
    };
    renderer
        .set_gif(&primary_frames(), Some(options))
        .expect("composite should render");
    let pixels = renderer.render_to_pixels().expect("readback should succeed");
    assert_pixels_close(&pixels, PRIMARY_MEAN, 2);
}

#[test]
fn stop_keeps_reduced_weight_without_renormalising() {
    let Some(mut renderer) = median_or_skip() else {
        return;
    };
    // Frame 3 stays in range, frame 4 does not; the composite is half a
    // white frame, alpha included.
    let options = BlendOptions {
        current_frame: 3,
        sample_count: 2,
        wrap_mode: WrapMode::Stop,
        ..BlendOptions::default()
    };
    renderer
        .set_gif(&primary_frames(), Some(options))
        .expect("composite should render");
    let pixels = renderer.render_to_pixels().expect("readback should succeed");
    assert_pixels_close(&pixels, [128, 128, 128, 128], 2);
}

#[test]
fn clamp_repeats_the_final_frame_past_the_end() {
    let Some(mut renderer) = median_or_skip() else {
        return;
    };
    // Samples walk 2, 3, 4, 5 and clamp to 2, 3, 3, 3: a quarter blue
    // plus three quarters white.
    let options = BlendOptions {
        current_frame: 2,
        sample_count: 4,
        wrap_mode: WrapMode::Clamp,
        ..BlendOptions::default()
    };
    renderer
        .set_gif(&primary_frames(), Some(options))
        .expect("composite should render");
    let pixels = renderer.render_to_pixels().expect("readback should succeed");
    assert_pixels_close(&pixels, [191, 191, 255, 255], 2);
}

#[test]
fn multi_batch_walk_matches_the_single_batch_average() {
    let Some(mut renderer) = median_or_skip() else {
        return;
    };
    // Twenty samples over four frames need three accumulate passes, yet
    // every frame still lands at a quarter of the total weight.
    let options = BlendOptions {
        sample_count: 20,
        ..BlendOptions::default()
    };
    renderer
        .set_gif(&primary_frames(), Some(options))
        .expect("composite should render");
    let pixels = renderer.render_to_pixels().expect("readback should succeed");
    assert_pixels_close(&pixels, PRIMARY_MEAN, 3);
}

#[test]
fn bidirectional_covers_both_directions_at_half_weight() {
    let Some(mut renderer) = median_or_skip() else {
        return;
    };
    // Backward leg samples frames 1, 0 and the forward leg samples 2, 3;
    // all four end up at equal weight.
    let options = BlendOptions {
        current_frame: 2,
        sample_count: 2,
        sample_mode: SampleMode::Bidirectional,
        wrap_mode: WrapMode::Clamp,
        ..BlendOptions::default()
    };
    renderer
        .set_gif(&primary_frames(), Some(options))
        .expect("composite should render");
    let pixels = renderer.render_to_pixels().expect("readback should succeed");
    assert_pixels_close(&pixels, PRIMARY_MEAN, 2);
}

#[test]
fn present_preserves_row_order_and_flips_on_request() {
    let Some(mut renderer) = median_or_skip() else {
        return;
    };
    let mut frame = RgbaImage::from_pixel(SIZE, SIZE, Rgba([0, 255, 0, 255]));
    for y in 0..SIZE / 2 {
        for x in 0..SIZE {
            frame.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        }
    }
    renderer
        .set_gif(&[frame], Some(BlendOptions::default()))
        .expect("composite should render");

    let pixels = renderer.render_to_pixels().expect("readback should succeed");
    let top = &pixels[..4];
    let bottom = &pixels[pixels.len() - 4..];
    assert_pixels_close(top, [255, 0, 0, 255], 2);
    assert_pixels_close(bottom, [0, 255, 0, 255], 2);

    renderer.set_flip(true);
    let flipped = renderer.render_to_pixels().expect("readback should succeed");
    assert_pixels_close(&flipped[..4], [0, 255, 0, 255], 2);
    assert_pixels_close(&flipped[flipped.len() - 4..], [255, 0, 0, 255], 2);
}

#[test]
fn rendering_before_loading_frames_reports_the_gap() {
    let Some(mut renderer) = median_or_skip() else {
        return;
    };
    let err = renderer
        .render_to_pixels()
        .expect_err("rendering without frames should fail");
    assert!(
        format!("{err:#}").contains("no animation loaded"),
        "unexpected error: {err:#}"
    );
}

/// Ten frames with a red ramp; windows shorter than the sequence make the
/// window position visible in the composite.
fn ramp_frames(count: usize) -> Vec<RgbaImage> {
    (0..count)
        .map(|index| solid_frame([(index * 20) as u8, 0, 0, 255]))
        .collect()
}

fn ramp_window_mean(count: usize, start: usize, window: usize) -> [u8; 4] {
    let mut red = 0.0f32;
    let mut alpha = 0.0f32;
    for offset in 0..window {
        let frame = (start + offset) % count;
        red += (frame * 20) as f32 / count as f32;
        alpha += 255.0 / count as f32;
    }
    [red.round() as u8, 0, 0, alpha.round() as u8]
}

#[test]
fn scanline_window_wraps_and_dims_partial_coverage() {
    let Some(mut viewer) = scanline_or_skip() else {
        return;
    };
    let count = 10;
    viewer
        .load_frames(&ramp_frames(count))
        .expect("frames should load");

    let window = renderer::FRAME_BATCH.min(count);
    let pixels = viewer.render_to_pixels().expect("readback should succeed");
    assert_pixels_close(&pixels, ramp_window_mean(count, 0, window), 3);

    viewer.set_frame(5).expect("seek should render");
    let pixels = viewer.render_to_pixels().expect("readback should succeed");
    assert_pixels_close(&pixels, ramp_window_mean(count, 5, window), 3);
}

#[test]
fn scanline_tick_carries_fractional_intervals() {
    let Some(mut viewer) = scanline_or_skip() else {
        return;
    };
    viewer
        .load_frames(&primary_frames())
        .expect("frames should load");
    viewer.set_frame_rate(10.0).expect("rate is positive");

    viewer
        .tick(Duration::from_millis(150))
        .expect("tick should render");
    assert_eq!(viewer.current_frame(), 1);

    viewer
        .tick(Duration::from_millis(50))
        .expect("tick should render");
    assert_eq!(viewer.current_frame(), 2);

    viewer
        .tick(Duration::from_millis(20))
        .expect("tick should render");
    assert_eq!(viewer.current_frame(), 2);
}
